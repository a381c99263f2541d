pub mod document;
pub mod member;
pub mod message;
pub mod rate_limit;
pub mod room;
pub mod session;

pub use document::{Document, DocumentRevision, LockState};
pub use member::{Member, MemberInfo};
pub use message::{Message, MessageView};
pub use rate_limit::RateLimitRecord;
pub use room::Room;
pub use session::Session;

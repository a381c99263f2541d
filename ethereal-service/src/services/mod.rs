pub mod database;
pub mod error;
pub mod locks;
pub mod media;
pub mod membership;
pub mod rate_limit;
pub mod rooms;
pub mod sessions;
pub mod token;

pub use database::{Database, SaveOutcome};
pub use error::GateError;
pub use locks::LockManager;
pub use media::{LocalMediaStore, MediaStore};
pub use membership::{JoinResult, MembershipManager};
pub use rate_limit::{Decision, ProgressiveRateLimiter};
pub use rooms::RoomDirectory;
pub use sessions::SessionStore;
pub use token::{RoomClaims, TokenService};

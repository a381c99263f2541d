pub mod auth;

pub use auth::{access_proxy_middleware, AuthContext, AuthMember};

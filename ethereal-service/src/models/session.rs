//! Session model - a revocable server-side record binding a member to a token.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Session entity. Deleting the row permanently invalidates every token that
/// references it, even if the token's own expiry is still in the future.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub expires_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl Session {
    /// Create a new session with an absolute expiry.
    pub fn new(room_id: Uuid, member_id: Uuid, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            room_id,
            member_id,
            expires_utc: now + Duration::days(ttl_days),
            created_utc: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_utc <= Utc::now()
    }

    /// True when the session covers the claimed room and member exactly.
    /// Guards against a token replayed across rooms or members.
    pub fn matches(&self, room_id: Uuid, member_id: Uuid) -> bool {
        self.room_id == room_id && self.member_id == member_id
    }
}

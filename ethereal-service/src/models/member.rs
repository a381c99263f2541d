//! Member model - one device's membership in a room.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Member entity. `(room_id, device_id)` is unique; re-joining with the same
/// device reuses the row instead of inserting a duplicate.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub member_id: Uuid,
    pub room_id: Uuid,
    pub device_id: String,
    pub display_name: String,
    pub is_owner: bool,
    pub last_seen_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl Member {
    /// Create a new member. The first joiner of a room becomes its owner.
    pub fn new(room_id: Uuid, device_id: String, display_name: String, is_owner: bool) -> Self {
        let now = Utc::now();
        Self {
            member_id: Uuid::new_v4(),
            room_id,
            device_id,
            display_name,
            is_owner,
            last_seen_utc: now,
            created_utc: now,
        }
    }
}

/// Member info for API responses. Device ids stay server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub member_id: Uuid,
    pub display_name: String,
    pub is_owner: bool,
    pub last_seen_utc: DateTime<Utc>,
}

impl From<Member> for MemberInfo {
    fn from(m: Member) -> Self {
        Self {
            member_id: m.member_id,
            display_name: m.display_name,
            is_owner: m.is_owner,
            last_seen_utc: m.last_seen_utc,
        }
    }
}

//! Message model - a room-scoped chat message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: Uuid,
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub content: String,
    pub created_utc: DateTime<Utc>,
}

impl Message {
    pub fn new(room_id: Uuid, member_id: Uuid, content: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            room_id,
            member_id,
            content,
            created_utc: Utc::now(),
        }
    }
}

/// Message joined with its author's display name for listing.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message_id: Uuid,
    pub member_id: Uuid,
    pub display_name: String,
    pub content: String,
    pub created_utc: DateTime<Utc>,
}

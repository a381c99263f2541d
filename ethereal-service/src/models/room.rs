//! Room model - a shared namespace joined via a hashed secret.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Room entity. Stores only the hash of the shared secret, never the secret.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Room {
    pub room_id: Uuid,
    pub secret_hash: String,
    pub created_utc: DateTime<Utc>,
}

impl Room {
    /// Create a new room for a secret hash.
    pub fn new(secret_hash: String) -> Self {
        Self {
            room_id: Uuid::new_v4(),
            secret_hash,
            created_utc: Utc::now(),
        }
    }
}

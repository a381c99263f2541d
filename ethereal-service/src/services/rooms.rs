//! Room directory: hashed-secret lookup and race-safe creation.

use ethereal_core::error::AppError;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Room;
use crate::services::database::{Database, InsertOutcome};
use crate::services::error::GateError;

/// Hash a shared room secret. Only this value is ever stored or compared;
/// the secret itself never reaches the directory.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct RoomDirectory {
    db: Database,
}

impl RoomDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Look up a room by secret hash.
    pub async fn resolve(&self, secret_hash: &str) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .db
            .find_room_by_secret_hash(secret_hash)
            .await?
            .map(|r| r.room_id))
    }

    /// Resolve the room for a secret hash, creating it on first use.
    ///
    /// Retry-once pattern: when the insert loses a creation race to a
    /// concurrent joiner, the unique violation is expected and handled by
    /// re-resolving. Both calls with the same hash land in the same room.
    /// Returns `(room_id, created)`.
    pub async fn get_or_create(&self, secret_hash: &str) -> Result<(Uuid, bool), GateError> {
        if let Some(room_id) = self.resolve(secret_hash).await? {
            return Ok((room_id, false));
        }

        let room = Room::new(secret_hash.to_string());
        match self.db.try_insert_room(&room).await? {
            InsertOutcome::Inserted => Ok((room.room_id, true)),
            InsertOutcome::Conflict => match self.resolve(secret_hash).await? {
                Some(room_id) => Ok((room_id, false)),
                // Insert conflicted but the winner is gone: the store is in a
                // state we cannot reason about, surface a fatal init error.
                None => {
                    tracing::error!("room insert conflicted but re-resolve found nothing");
                    Err(GateError::JoinError)
                }
            },
        }
    }
}

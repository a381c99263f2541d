//! Session store: server-tracked, revocable sessions.
//!
//! Revocation strictly dominates signature validity: once a session row is
//! deleted, every token bound to it is dead no matter how well-formed or
//! unexpired the token itself still is.

use uuid::Uuid;

use crate::models::Session;
use crate::services::database::Database;
use crate::services::error::GateError;
use ethereal_core::error::AppError;

#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a session for a membership.
    pub async fn create(
        &self,
        room_id: Uuid,
        member_id: Uuid,
        ttl_days: i64,
    ) -> Result<Session, AppError> {
        let session = Session::new(room_id, member_id, ttl_days);
        self.db.insert_session(&session).await?;
        Ok(session)
    }

    /// Validate a session against the claims a token carried.
    ///
    /// The row must exist, match the claimed room and member exactly, and be
    /// unexpired. On success the member's last-seen timestamp is refreshed
    /// best-effort; a failure there never fails the validation.
    pub async fn validate(
        &self,
        session_id: Uuid,
        room_id: Uuid,
        member_id: Uuid,
    ) -> Result<Session, GateError> {
        let Some(session) = self.db.find_session(session_id).await? else {
            return Err(GateError::SessionRevoked);
        };

        if session.is_expired() {
            // Lazy cleanup; there is no sweeper process.
            let _ = self.db.delete_session(session_id).await;
            return Err(GateError::SessionExpired);
        }

        if !session.matches(room_id, member_id) {
            return Err(GateError::SessionMismatch);
        }

        if let Err(e) = self.db.touch_member_last_seen(member_id).await {
            tracing::debug!(error = %e, "last-seen refresh failed");
        }

        Ok(session)
    }

    /// Revoke one session (kick / leave).
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), AppError> {
        self.db.delete_session(session_id).await
    }

    /// Revoke every session a member holds.
    pub async fn revoke_member(&self, member_id: Uuid) -> Result<u64, AppError> {
        self.db.delete_sessions_for_member(member_id).await
    }
}

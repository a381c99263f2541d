//! Collaborative edit locks: a TTL lease per document.
//!
//! Devices can vanish without a disconnect signal, so liveness comes from the
//! bounded lease rather than heartbeats: once `lock_expires_utc` passes, the
//! lock is void no matter what the holder column still says.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::LockState;
use crate::services::database::Database;
use crate::services::error::GateError;

/// A granted (or refreshed) lease.
#[derive(Debug, Clone)]
pub struct LockGrant {
    pub expires_utc: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LockManager {
    db: Database,
    lease: Duration,
}

impl LockManager {
    pub fn new(db: Database, lease_seconds: i64) -> Self {
        Self {
            db,
            lease: Duration::seconds(lease_seconds),
        }
    }

    /// Acquire or refresh the edit lock on a document.
    ///
    /// Succeeds when the document is unlocked, the existing lock is stale, or
    /// the caller already holds a fresh lock (lease refresh). The guard lives
    /// in the UPDATE's WHERE clause, so the whole read-modify-write is one
    /// statement and of two concurrent acquirers exactly one wins; the loser
    /// re-reads only to name the holder in the error.
    pub async fn acquire(
        &self,
        room_id: Uuid,
        document_id: Uuid,
        member_id: Uuid,
    ) -> Result<LockGrant, GateError> {
        // The refusal path re-reads the row; in the gap the lease may have
        // been released again, so one more guarded attempt before giving up.
        for _ in 0..2 {
            let now = Utc::now();
            let expires_utc = now + self.lease;

            let result = sqlx::query(
                r#"
                UPDATE documents
                SET lock_holder = ?, lock_expires_utc = ?
                WHERE document_id = ? AND room_id = ?
                  AND (lock_holder IS NULL OR lock_expires_utc <= ? OR lock_holder = ?)
                "#,
            )
            .bind(member_id)
            .bind(expires_utc)
            .bind(document_id)
            .bind(room_id)
            .bind(now)
            .bind(member_id)
            .execute(self.db.pool())
            .await?;

            if result.rows_affected() > 0 {
                tracing::debug!(%document_id, %member_id, %expires_utc, "lock acquired");
                return Ok(LockGrant { expires_utc });
            }

            let doc = self
                .db
                .find_document(room_id, document_id)
                .await?
                .ok_or(GateError::NotFound("document"))?;

            if let LockState::LockedFresh {
                holder,
                expires_utc,
            } = doc.lock_state(Utc::now())
            {
                if holder != member_id {
                    let holder_name = self.holder_name(holder).await;
                    return Err(GateError::LockedByOther {
                        holder_name,
                        expires_utc,
                    });
                }
            }
        }

        // Lost the guard twice to leases that were gone by re-read time.
        Err(GateError::LockedByOther {
            holder_name: "another member".to_string(),
            expires_utc: Utc::now(),
        })
    }

    /// Explicitly release a lock. Allowed for the current holder, or for
    /// anyone once the lock went stale. Same single-statement guard as
    /// `acquire`: a refusal means a live lease held by someone else.
    pub async fn release(
        &self,
        room_id: Uuid,
        document_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), GateError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET lock_holder = NULL, lock_expires_utc = NULL
            WHERE document_id = ? AND room_id = ?
              AND (lock_holder IS NULL OR lock_expires_utc <= ? OR lock_holder = ?)
            "#,
        )
        .bind(document_id)
        .bind(room_id)
        .bind(now)
        .bind(member_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(%document_id, %member_id, "lock released");
            return Ok(());
        }

        self.db
            .find_document(room_id, document_id)
            .await?
            .ok_or(GateError::NotFound("document"))?;
        Err(GateError::UnlockForbidden)
    }

    pub async fn holder_name(&self, holder: Uuid) -> String {
        match self.db.find_member(holder).await {
            Ok(Some(member)) => member.display_name,
            _ => "another member".to_string(),
        }
    }
}

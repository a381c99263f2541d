//! Document model - a room-scoped shared document with a TTL edit lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Lock state derived from the two lock columns at a point in time.
///
/// Expiry is authoritative: a past `lock_expires_utc` voids the lock even
/// though the stale holder id stays in the row until the next acquisition
/// overwrites it (lazy clearing). `LockedStale` exists so diagnostics can
/// still see who abandoned the lock; for acquisition it behaves exactly like
/// `Unlocked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    LockedFresh {
        holder: Uuid,
        expires_utc: DateTime<Utc>,
    },
    LockedStale {
        holder: Uuid,
        expired_utc: DateTime<Utc>,
    },
}

impl LockState {
    pub fn classify(
        lock_holder: Option<Uuid>,
        lock_expires_utc: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (lock_holder, lock_expires_utc) {
            (Some(holder), Some(expires)) if expires > now => LockState::LockedFresh {
                holder,
                expires_utc: expires,
            },
            (Some(holder), Some(expires)) => LockState::LockedStale {
                holder,
                expired_utc: expires,
            },
            // A holder without an expiry never happens through the lock
            // manager; treat it as void rather than as held forever.
            _ => LockState::Unlocked,
        }
    }

    /// Whether `member_id` may take (or refresh) the lock right now.
    pub fn acquirable_by(&self, member_id: Uuid) -> bool {
        match self {
            LockState::Unlocked | LockState::LockedStale { .. } => true,
            LockState::LockedFresh { holder, .. } => *holder == member_id,
        }
    }

    /// Whether `member_id` may explicitly release the lock.
    pub fn releasable_by(&self, member_id: Uuid) -> bool {
        match self {
            LockState::Unlocked | LockState::LockedStale { .. } => true,
            LockState::LockedFresh { holder, .. } => *holder == member_id,
        }
    }
}

/// Document entity. Tags and media are stored as JSON arrays in text columns.
#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub document_id: Uuid,
    pub room_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub tags: String,
    pub pinned: bool,
    pub media: String,
    pub lock_holder: Option<Uuid>,
    pub lock_expires_utc: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Document {
    pub fn new(room_id: Uuid, author_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            document_id: Uuid::new_v4(),
            room_id,
            author_id,
            content,
            tags: "[]".to_string(),
            pinned: false,
            media: "[]".to_string(),
            lock_holder: None,
            lock_expires_utc: None,
            updated_by: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn lock_state(&self, now: DateTime<Utc>) -> LockState {
        LockState::classify(self.lock_holder, self.lock_expires_utc, now)
    }

    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }

    pub fn media_list(&self) -> Vec<String> {
        serde_json::from_str(&self.media).unwrap_or_default()
    }
}

/// Append-only revision snapshot taken just before a content-changing update.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRevision {
    pub revision_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub tags: String,
    pub edited_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

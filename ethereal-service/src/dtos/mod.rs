//! Request/response shapes for the ethereal layer's HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Document, LockState, MemberInfo};
use crate::services::JoinResult;

// ==================== Join ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[validate(length(min = 1, message = "secret is required"))]
    pub secret: String,

    #[validate(length(min = 1, max = 128, message = "deviceId is required"))]
    pub device_id: String,

    #[validate(length(min = 1, max = 64, message = "displayName is required"))]
    pub display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub token: String,
    pub expires_utc: DateTime<Utc>,
    pub is_owner: bool,
    pub is_new_room: bool,
    pub member_count: i64,
}

impl From<JoinResult> for JoinResponse {
    fn from(r: JoinResult) -> Self {
        Self {
            room_id: r.room_id,
            member_id: r.member_id,
            token: r.token,
            expires_utc: r.expires_utc,
            is_owner: r.is_owner,
            is_new_room: r.is_new_room,
            member_count: r.member_count,
        }
    }
}

// ==================== PIN ====================

#[derive(Debug, Deserialize, Validate)]
pub struct PinRequest {
    #[validate(length(min = 1, message = "pin is required"))]
    pub pin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinResponse {
    pub token: String,
    pub expires_utc: DateTime<Utc>,
}

// ==================== Room ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub members: Vec<MemberInfo>,
}

// ==================== Messages ====================

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<i64>,
}

// ==================== Documents ====================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDocumentRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachMediaRequest {
    #[validate(length(min = 1, max = 255, message = "filename is required"))]
    pub filename: String,

    #[validate(length(min = 1, message = "data is required"))]
    pub data_base64: String,
}

/// Lock fields as clients see them: a tagged state, not nullable columns.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum LockView {
    Unlocked,
    Locked {
        holder: Uuid,
        expires_utc: DateTime<Utc>,
    },
}

impl From<LockState> for LockView {
    fn from(state: LockState) -> Self {
        match state {
            // Stale is void for clients; only diagnostics distinguish it.
            LockState::Unlocked | LockState::LockedStale { .. } => LockView::Unlocked,
            LockState::LockedFresh {
                holder,
                expires_utc,
            } => LockView::Locked {
                holder,
                expires_utc,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub room_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub media: Vec<String>,
    pub lock: LockView,
    pub updated_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl DocumentResponse {
    pub fn from_document(doc: Document, now: DateTime<Utc>) -> Self {
        let lock = LockView::from(doc.lock_state(now));
        Self {
            document_id: doc.document_id,
            room_id: doc.room_id,
            author_id: doc.author_id,
            tags: doc.tag_list(),
            media: doc.media_list(),
            lock,
            content: doc.content,
            pinned: doc.pinned,
            updated_by: doc.updated_by,
            created_utc: doc.created_utc,
            updated_utc: doc.updated_utc,
        }
    }
}

// ==================== Locks ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAcquiredResponse {
    pub locked: bool,
    pub expires_utc: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UnlockedResponse {
    pub unlocked: bool,
}

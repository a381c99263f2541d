use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use ethereal_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    AttachMediaRequest, CreateDocumentRequest, DocumentResponse, UpdateDocumentRequest,
};
use crate::middleware::AuthMember;
use crate::models::Document;
use crate::services::media::media_key;
use crate::services::{GateError, SaveOutcome};
use crate::utils::ValidatedJson;
use crate::AppState;

const MAX_MEDIA_BYTES: usize = 5 * 1024 * 1024;

/// Create a shared document in the caller's room.
pub async fn create(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    ValidatedJson(req): ValidatedJson<CreateDocumentRequest>,
) -> Result<impl IntoResponse, GateError> {
    let mut doc = Document::new(ctx.room_id, ctx.member_id, req.content);
    doc.tags = serde_json::to_string(&req.tags).unwrap_or_else(|_| "[]".to_string());
    doc.pinned = req.pinned;

    state.db.insert_document(&doc).await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::from_document(doc, Utc::now())),
    ))
}

/// List the room's documents, pinned first.
pub async fn list(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
) -> Result<impl IntoResponse, GateError> {
    let now = Utc::now();
    let docs = state.db.list_documents(ctx.room_id).await?;
    let body: Vec<DocumentResponse> = docs
        .into_iter()
        .map(|d| DocumentResponse::from_document(d, now))
        .collect();

    Ok((StatusCode::OK, Json(serde_json::json!({ "documents": body }))))
}

pub async fn get_one(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    let doc = state
        .db
        .find_document(ctx.room_id, document_id)
        .await?
        .ok_or(GateError::NotFound("document"))?;

    Ok((
        StatusCode::OK,
        Json(DocumentResponse::from_document(doc, Utc::now())),
    ))
}

/// Update a document's content.
///
/// A fresh lock held by someone else rejects the save; otherwise the update
/// snapshots the previous content into the revision log and clears the lock
/// fields in the same transaction (release-on-write), so a successful save
/// always leaves the document unlocked. The lock check happens inside the
/// save transaction, so a lease acquired mid-flight refuses the write.
pub async fn update(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateDocumentRequest>,
) -> Result<impl IntoResponse, GateError> {
    let tags_json = serde_json::to_string(&req.tags).unwrap_or_else(|_| "[]".to_string());

    match state
        .db
        .save_document(
            ctx.room_id,
            document_id,
            req.content,
            tags_json,
            req.pinned,
            ctx.member_id,
        )
        .await?
    {
        SaveOutcome::Saved(updated) => Ok((
            StatusCode::OK,
            Json(DocumentResponse::from_document(updated, Utc::now())),
        )),
        SaveOutcome::Locked {
            holder,
            expires_utc,
        } => Err(GateError::LockedByOther {
            holder_name: state.locks.holder_name(holder).await,
            expires_utc,
        }),
        SaveOutcome::Missing => Err(GateError::NotFound("document")),
    }
}

/// Delete a document. Its revision log goes with it, and attached media
/// artifacts are removed best-effort.
pub async fn remove(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    let doc = state
        .db
        .find_document(ctx.room_id, document_id)
        .await?
        .ok_or(GateError::NotFound("document"))?;

    if !state.db.delete_document(ctx.room_id, document_id).await? {
        return Err(GateError::NotFound("document"));
    }

    for key in doc.media_list() {
        if let Err(e) = state.media.delete(&key).await {
            tracing::warn!(error = %e, key, "media cleanup failed");
        }
    }

    Ok((StatusCode::OK, Json(serde_json::json!({ "deleted": true }))))
}

pub async fn revisions(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    // Scope check first; revision ids are per-document but the document must
    // be in the caller's room.
    state
        .db
        .find_document(ctx.room_id, document_id)
        .await?
        .ok_or(GateError::NotFound("document"))?;

    let revisions = state.db.list_revisions(document_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "revisions": revisions })),
    ))
}

/// Attach a media artifact to a document.
///
/// The blob is uploaded first; if the row update then fails (or the document
/// vanished), the artifact is deleted again so no orphan is left behind.
pub async fn attach_media(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AttachMediaRequest>,
) -> Result<impl IntoResponse, GateError> {
    let doc = state
        .db
        .find_document(ctx.room_id, document_id)
        .await?
        .ok_or(GateError::NotFound("document"))?;

    let data = BASE64
        .decode(&req.data_base64)
        .map_err(|_| GateError::App(AppError::BadRequest(anyhow::anyhow!("invalid base64"))))?;
    if data.len() > MAX_MEDIA_BYTES {
        return Err(GateError::App(AppError::BadRequest(anyhow::anyhow!(
            "media exceeds {} bytes",
            MAX_MEDIA_BYTES
        ))));
    }

    let key = media_key(ctx.room_id, document_id, &req.filename);
    state.media.upload(&key, data).await?;

    let mut media = doc.media_list();
    media.push(key.clone());
    let media_json = serde_json::to_string(&media).unwrap_or_else(|_| "[]".to_string());

    let updated = state
        .db
        .set_document_media(ctx.room_id, document_id, &media_json)
        .await;

    match updated {
        Ok(true) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "attached": true, "key": key })),
        )),
        Ok(false) => {
            // Document disappeared between read and update; compensate.
            let _ = state.media.delete(&key).await;
            Err(GateError::NotFound("document"))
        }
        Err(e) => {
            let _ = state.media.delete(&key).await;
            Err(e.into())
        }
    }
}

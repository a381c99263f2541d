use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dtos::{LockAcquiredResponse, UnlockedResponse};
use crate::middleware::AuthMember;
use crate::services::GateError;
use crate::AppState;

/// Acquire (or refresh) the edit lock on a document.
pub async fn lock(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    let grant = state
        .locks
        .acquire(ctx.room_id, document_id, ctx.member_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(LockAcquiredResponse {
            locked: true,
            expires_utc: grant.expires_utc,
        }),
    ))
}

/// Release the edit lock on a document.
pub async fn unlock(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    state
        .locks
        .release(ctx.room_id, document_id, ctx.member_id)
        .await?;

    Ok((StatusCode::OK, Json(UnlockedResponse { unlocked: true })))
}

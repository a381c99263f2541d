use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dtos::RoomSnapshot;
use crate::middleware::AuthMember;
use crate::models::MemberInfo;
use crate::services::GateError;
use crate::AppState;

/// Current room snapshot: who is here, who owns it, when they were last seen.
pub async fn me(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
) -> Result<impl IntoResponse, GateError> {
    let members = state.db.list_members(ctx.room_id).await?;

    Ok((
        StatusCode::OK,
        Json(RoomSnapshot {
            room_id: ctx.room_id,
            member_id: ctx.member_id,
            members: members.into_iter().map(MemberInfo::from).collect(),
        }),
    ))
}

/// Leave the room: revoke the calling session. The membership row stays so a
/// re-join with the same device is idempotent.
pub async fn leave(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
) -> Result<impl IntoResponse, GateError> {
    state.sessions.revoke(ctx.session_id).await?;
    tracing::info!(member_id = %ctx.member_id, "member left room");

    Ok((StatusCode::OK, Json(serde_json::json!({ "left": true }))))
}

/// Kick a member (owner only): revoke every session they hold, then drop the
/// membership row along with their messages, so their device must pass the
/// gate again to get back in. Documents they authored stay with the room.
pub async fn kick(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse, GateError> {
    let caller = state
        .db
        .find_member(ctx.member_id)
        .await?
        .ok_or(GateError::SessionMismatch)?;
    if !caller.is_owner {
        return Err(GateError::OwnerOnly);
    }

    let target = state
        .db
        .find_member(member_id)
        .await?
        .filter(|m| m.room_id == ctx.room_id)
        .ok_or(GateError::NotFound("member"))?;

    let revoked = state.sessions.revoke_member(target.member_id).await?;
    state.db.delete_member(target.member_id).await?;

    tracing::info!(
        kicked = %target.member_id,
        by = %ctx.member_id,
        sessions_revoked = revoked,
        "member kicked"
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "kicked": true, "sessionsRevoked": revoked })),
    ))
}

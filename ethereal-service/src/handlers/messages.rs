use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::dtos::{ListMessagesQuery, PostMessageRequest};
use crate::middleware::AuthMember;
use crate::models::Message;
use crate::services::GateError;
use crate::utils::ValidatedJson;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// List recent messages in the caller's room, newest first.
pub async fn list(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    Query(query): Query<ListMessagesQuery>,
) -> Result<impl IntoResponse, GateError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let messages = state.db.list_messages(ctx.room_id, limit).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "messages": messages })),
    ))
}

/// Post a message to the caller's room.
pub async fn post(
    State(state): State<AppState>,
    AuthMember(ctx): AuthMember,
    ValidatedJson(req): ValidatedJson<PostMessageRequest>,
) -> Result<impl IntoResponse, GateError> {
    let message = Message::new(ctx.room_id, ctx.member_id, req.content);
    state.db.insert_message(&message).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

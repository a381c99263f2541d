use axum::{extract::State, http::StatusCode, response::IntoResponse};
use axum::Json;

use crate::dtos::{JoinRequest, JoinResponse};
use crate::services::GateError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Join (or create) a room with a shared secret.
pub async fn join(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<JoinRequest>,
) -> Result<impl IntoResponse, GateError> {
    let result = state
        .membership
        .join(&req.secret, &req.device_id, &req.display_name)
        .await?;

    Ok((StatusCode::OK, Json(JoinResponse::from(result))))
}

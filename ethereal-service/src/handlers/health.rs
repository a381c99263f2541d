use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::services::GateError;
use crate::AppState;

/// Liveness probe with a store ping.
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, GateError> {
    state.db.health_check().await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": state.config.service_name,
        })),
    ))
}

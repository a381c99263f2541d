//! Diary PIN verification: the lower-privilege entry point.

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

use crate::dtos::{PinRequest, PinResponse};
use crate::services::{Decision, GateError};
use crate::utils::ValidatedJson;
use crate::AppState;

const PIN_ENDPOINT: &str = "pin_verify";

/// Verify the diary PIN and issue a short-lived diary token.
///
/// Order matters: the limiter is consulted before the PIN is compared, so a
/// blocked identifier pays nothing but the record lookup.
pub async fn verify_pin(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<PinRequest>,
) -> Result<impl IntoResponse, GateError> {
    let identifier = client_identifier(&headers, connect_info);

    if let Decision::Blocked { retry_after } =
        state.pin_limiter.check(&identifier, PIN_ENDPOINT).await?
    {
        return Err(GateError::RateLimited { retry_after });
    }

    let matches: bool = req
        .pin
        .as_bytes()
        .ct_eq(state.config.pin.diary_pin.as_bytes())
        .into();

    if !matches {
        return match state
            .pin_limiter
            .record_failure(&identifier, PIN_ENDPOINT)
            .await?
        {
            Decision::Blocked { retry_after } => Err(GateError::RateLimited { retry_after }),
            Decision::Allowed => Err(GateError::InvalidPin),
        };
    }

    state.pin_limiter.clear(&identifier, PIN_ENDPOINT).await?;

    let issued = state
        .tokens
        .issue_diary_token(Duration::minutes(state.config.token.diary_token_ttl_minutes))
        .map_err(|e| {
            tracing::error!(error = %e, "diary token mint failed");
            GateError::App(ethereal_core::error::AppError::InternalError(e))
        })?;

    Ok((
        StatusCode::OK,
        Json(PinResponse {
            token: issued.token,
            expires_utc: issued.expires_utc,
        }),
    ))
}

/// Best identifier we have for an anonymous caller: forwarded IP, then peer
/// address, then a shared bucket.
fn client_identifier(headers: &HeaderMap, connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| connect_info.map(|ci| ci.0.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

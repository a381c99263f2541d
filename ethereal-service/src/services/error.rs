//! Gate errors: every failure the ethereal layer can surface to a client,
//! each with a stable machine-readable code so devices can react
//! specifically (re-auth vs "someone else is editing" vs retry-later).

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use ethereal_core::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Missing fields: {0}")]
    MissingFields(String),

    #[error("Shared secret is too short")]
    PinTooShort,

    #[error("Room is full")]
    RoomFull,

    #[error("Could not join room")]
    JoinError,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Session revoked")]
    SessionRevoked,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session mismatch")]
    SessionMismatch,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Rate limited")]
    RateLimited { retry_after: u64 },

    #[error("Document locked by {holder_name}")]
    LockedByOther {
        holder_name: String,
        expires_utc: DateTime<Utc>,
    },

    #[error("Caller is neither the lock holder nor is the lock expired")]
    UnlockForbidden,

    #[error("Only the room owner may do this")]
    OwnerOnly,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct GateErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock_expires_utc: Option<DateTime<Utc>>,
}

impl GateErrorBody {
    fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            retry_after: None,
            locked_by: None,
            lock_expires_utc: None,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            GateError::MissingFields(which) => (
                StatusCode::BAD_REQUEST,
                GateErrorBody::new("missing_fields", format!("Missing fields: {}", which)),
            ),
            GateError::PinTooShort => (
                StatusCode::BAD_REQUEST,
                GateErrorBody::new("pin_too_short", "Shared secret is too short".to_string()),
            ),
            GateError::RoomFull => (
                StatusCode::CONFLICT,
                GateErrorBody::new("room_full", "Room is full".to_string()),
            ),
            GateError::JoinError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GateErrorBody::new("join_error", "Could not join room".to_string()),
            ),
            GateError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("missing_token", "Missing token".to_string()),
            ),
            GateError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("invalid_token", "Invalid token".to_string()),
            ),
            GateError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("token_expired", "Token expired".to_string()),
            ),
            GateError::SessionRevoked => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("session_revoked", "Session revoked".to_string()),
            ),
            GateError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("session_expired", "Session expired".to_string()),
            ),
            GateError::SessionMismatch => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("session_mismatch", "Session mismatch".to_string()),
            ),
            GateError::InvalidPin => (
                StatusCode::UNAUTHORIZED,
                GateErrorBody::new("invalid_pin", "Invalid PIN".to_string()),
            ),
            GateError::RateLimited { retry_after } => {
                let mut body = GateErrorBody::new(
                    "rate_limited",
                    "Too many failed attempts".to_string(),
                );
                body.retry_after = Some(retry_after);
                (StatusCode::TOO_MANY_REQUESTS, body)
            }
            GateError::LockedByOther {
                holder_name,
                expires_utc,
            } => {
                let mut body = GateErrorBody::new(
                    "locked_by_other",
                    format!("{} is currently editing", holder_name),
                );
                body.locked_by = Some(holder_name);
                body.lock_expires_utc = Some(expires_utc);
                (StatusCode::LOCKED, body)
            }
            GateError::UnlockForbidden => (
                StatusCode::FORBIDDEN,
                GateErrorBody::new("forbidden", "Lock is held by another member".to_string()),
            ),
            GateError::OwnerOnly => (
                StatusCode::FORBIDDEN,
                GateErrorBody::new("forbidden", "Only the room owner may do this".to_string()),
            ),
            GateError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                GateErrorBody::new("not_found", format!("{} not found", what)),
            ),
            GateError::App(err) => return err.into_response(),
            GateError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GateErrorBody::new("server_error", "Internal server error".to_string()),
                )
            }
        };

        let retry_after = body.retry_after;
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = header::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

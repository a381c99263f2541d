//! Access proxy: the only path to anything behind the gate.
//!
//! Every protected route runs through here: parse the bearer token, verify
//! its signature and expiry (stateless, no I/O), then re-validate the
//! session row (stateful, catches revocation). The stateless check comes
//! first on purpose so malformed or expired tokens never touch the store.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::services::token::TokenError;
use crate::services::GateError;
use crate::AppState;

/// Identity attached to a request that passed the proxy.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub session_id: Uuid,
}

pub async fn access_proxy_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(GateError::MissingToken)?;

    let claims = state.tokens.verify_room_token(token).map_err(|e| match e {
        TokenError::Expired => GateError::TokenExpired,
        TokenError::Malformed | TokenError::BadSignature => GateError::InvalidToken,
    })?;

    // Signature alone is not enough: the session may have been revoked, and
    // the claims may not match the row they point at.
    state
        .sessions
        .validate(claims.session_id, claims.room_id, claims.member_id)
        .await?;

    req.extensions_mut().insert(AuthContext {
        room_id: claims.room_id,
        member_id: claims.member_id,
        session_id: claims.session_id,
    });

    Ok(next.run(req).await)
}

/// Extractor for handlers behind the proxy.
pub struct AuthMember(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthMember
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<AuthContext>()
            .copied()
            // Reachable only if a route was wired outside the proxy; refuse.
            .ok_or(GateError::MissingToken)?;

        Ok(AuthMember(context))
    }
}

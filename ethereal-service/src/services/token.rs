//! Signed session tokens: `base64url(payload).base64url(signature)`.
//!
//! The payload is JSON claims, the signature HMAC-SHA256 over the raw payload
//! bytes with the service's symmetric key. Verification is a pure function of
//! (secret, token, current time) and does no I/O, so malformed or expired
//! tokens are rejected before the session store is ever touched.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in a room session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClaims {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub session_id: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims for the lower-privilege diary unlock flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryClaims {
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

pub const DIARY_SCOPE: &str = "diary";

/// Coarse verification failures. Handlers map these onto `invalid_token` /
/// `token_expired`; nothing finer ever leaves the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

/// A freshly minted token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_utc: DateTime<Utc>,
}

/// Token signing and verification. Pure; holds only the key material.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Mint a room session token.
    pub fn issue_room_token(
        &self,
        room_id: Uuid,
        member_id: Uuid,
        session_id: Uuid,
        ttl: Duration,
    ) -> Result<IssuedToken, anyhow::Error> {
        let now = Utc::now();
        let expires = now + ttl;
        let claims = RoomClaims {
            room_id,
            member_id,
            session_id,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_utc: expires,
        })
    }

    /// Mint a diary unlock token (no room binding).
    pub fn issue_diary_token(&self, ttl: Duration) -> Result<IssuedToken, anyhow::Error> {
        let now = Utc::now();
        let expires = now + ttl;
        let claims = DiaryClaims {
            scope: DIARY_SCOPE.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_utc: expires,
        })
    }

    /// Verify a room token against the current clock.
    pub fn verify_room_token(&self, token: &str) -> Result<RoomClaims, TokenError> {
        self.verify_room_token_at(token, Utc::now())
    }

    pub fn verify_room_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RoomClaims, TokenError> {
        let claims: RoomClaims = self.verify(token)?;
        Self::check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    /// Verify a diary token; the scope claim must match as well.
    pub fn verify_diary_token(&self, token: &str) -> Result<DiaryClaims, TokenError> {
        self.verify_diary_token_at(token, Utc::now())
    }

    pub fn verify_diary_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DiaryClaims, TokenError> {
        let claims: DiaryClaims = self.verify(token)?;
        if claims.scope != DIARY_SCOPE {
            return Err(TokenError::BadSignature);
        }
        Self::check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String, anyhow::Error> {
        let payload = serde_json::to_vec(claims)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Split, check the signature in constant time, then (and only then)
    /// decode the payload. Fails closed on any shape violation.
    fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        let mut segments = token.split('.');
        let (payload_b64, signature_b64) = match (segments.next(), segments.next(), segments.next())
        {
            (Some(p), Some(s), None) if !p.is_empty() && !s.is_empty() => (p, s),
            _ => return Err(TokenError::Malformed),
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(&payload);
        let expected = mac.finalize().into_bytes();

        if signature.len() != expected.len()
            || signature.ct_eq(expected.as_slice()).unwrap_u8() != 1
        {
            return Err(TokenError::BadSignature);
        }

        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)
    }

    fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), TokenError> {
        let expires = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or(TokenError::Malformed)?;
        if expires <= now {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

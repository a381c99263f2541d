mod common;

use axum::http::StatusCode;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use common::TestApp;
use ethereal_service::services::TokenService;
use serde_json::Value;
use uuid::Uuid;

/// Pull the claims back out of a token's payload segment.
fn claims_of(token: &str) -> Value {
    let (payload, _) = token.split_once('.').unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

#[tokio::test]
async fn protected_route_without_token_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/rooms/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/rooms/me", Some("not-a-token")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn token_signed_with_foreign_key_is_rejected() {
    let app = TestApp::spawn().await;
    app.join("campfire", "dev-1", "Ana").await;

    let forged = TokenService::new("a-different-secret")
        .issue_room_token(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Duration::days(1))
        .unwrap();

    let (status, body) = app.get("/rooms/me", Some(&forged.token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn expired_token_is_rejected_before_session_lookup() {
    let app = TestApp::spawn().await;

    let expired = app
        .state
        .tokens
        .issue_room_token(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Duration::seconds(-10),
        )
        .unwrap();

    let (status, body) = app.get("/rooms/me", Some(&expired.token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn valid_token_passes_the_gate() {
    let app = TestApp::spawn().await;
    let token = app.join_token("campfire", "dev-1", "Ana").await;

    let (status, body) = app.get("/rooms/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);
    assert_eq!(body["members"][0]["displayName"], "Ana");
    assert_eq!(body["members"][0]["isOwner"], true);
}

#[tokio::test]
async fn leaving_revokes_the_session() {
    let app = TestApp::spawn().await;
    let token = app.join_token("campfire", "dev-1", "Ana").await;

    let (status, body) = app
        .post_json("/rooms/leave", serde_json::json!({}), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["left"], true);

    // A well-signed token for a revoked session no longer passes.
    let (status, body) = app.get("/rooms/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_revoked");
}

#[tokio::test]
async fn token_claims_must_match_the_session_row() {
    let app = TestApp::spawn().await;
    let token = app.join_token("campfire", "dev-1", "Ana").await;
    let claims = claims_of(&token);

    let room_id: Uuid = claims["room_id"].as_str().unwrap().parse().unwrap();
    let session_id: Uuid = claims["session_id"].as_str().unwrap().parse().unwrap();

    // Same signing key, real session id, but a member the session was never
    // issued to.
    let forged = app
        .state
        .tokens
        .issue_room_token(room_id, Uuid::new_v4(), session_id, Duration::days(1))
        .unwrap();

    let (status, body) = app.get("/rooms/me", Some(&forged.token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_mismatch");
}

#[tokio::test]
async fn unknown_session_reads_as_revoked() {
    let app = TestApp::spawn().await;
    app.join("campfire", "dev-1", "Ana").await;

    let forged = app
        .state
        .tokens
        .issue_room_token(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Duration::days(1))
        .unwrap();

    let (status, body) = app.get("/rooms/me", Some(&forged.token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_revoked");
}

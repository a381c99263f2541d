mod common;

use axum::http::StatusCode;
use common::{TestApp, TEST_PIN};
use serde_json::json;

#[tokio::test]
async fn correct_pin_issues_a_diary_token() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json_from("/auth/pin", json!({ "pin": TEST_PIN }), "10.0.0.1")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().contains('.'));
    assert!(body["expiresUtc"].as_str().is_some());

    // A diary token does not open room routes.
    let token = body["token"].as_str().unwrap();
    let (status, body) = app.get("/rooms/me", Some(token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn wrong_pin_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.1")
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_pin");
}

#[tokio::test]
async fn fifth_failure_trips_the_block() {
    let app = TestApp::spawn().await;

    for _ in 0..4 {
        let (status, body) = app
            .post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.2")
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_pin");
    }

    let (status, body) = app
        .post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.2")
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
    let retry_after = body["retry_after"].as_u64().unwrap();
    assert!(retry_after > 0 && retry_after <= 900);
}

#[tokio::test]
async fn blocked_identifier_is_refused_even_with_the_right_pin() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        app.post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.3")
            .await;
    }

    let (status, body) = app
        .post_json_from("/auth/pin", json!({ "pin": TEST_PIN }), "10.0.0.3")
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn block_sets_retry_after_header() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        app.post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.4")
            .await;
    }

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/pin")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "10.0.0.4")
        .body(axum::body::Body::from(json!({ "pin": "9999" }).to_string()))
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!(retry_after > 0);
}

#[tokio::test]
async fn failures_are_tracked_per_identifier() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        app.post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.5")
            .await;
    }

    // A different caller is unaffected.
    let (status, _) = app
        .post_json_from("/auth/pin", json!({ "pin": TEST_PIN }), "10.0.0.6")
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn success_resets_the_failure_count() {
    let app = TestApp::spawn().await;

    for _ in 0..3 {
        app.post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.7")
            .await;
    }

    let (status, _) = app
        .post_json_from("/auth/pin", json!({ "pin": TEST_PIN }), "10.0.0.7")
        .await;
    assert_eq!(status, StatusCode::OK);

    // The slate is clean: four more failures still come back as invalid_pin.
    for _ in 0..4 {
        let (status, body) = app
            .post_json_from("/auth/pin", json!({ "pin": "9999" }), "10.0.0.7")
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_pin");
    }
}

#[tokio::test]
async fn missing_pin_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json_from("/auth/pin", json!({}), "10.0.0.8")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
}

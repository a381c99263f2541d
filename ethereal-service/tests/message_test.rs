mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn post_and_list_messages() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let ben = app.join_token("campfire", "dev-2", "Ben").await;

    let (status, _) = app
        .post_json("/rooms/messages", json!({ "content": "hello" }), Some(&ana))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post_json("/rooms/messages", json!({ "content": "hi back" }), Some(&ben))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/rooms/messages", Some(&ana)).await;
    assert_eq!(status, StatusCode::OK);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    // Newest first, joined with the author's display name.
    assert_eq!(messages[0]["content"], "hi back");
    assert_eq!(messages[0]["displayName"], "Ben");
    assert_eq!(messages[1]["content"], "hello");
    assert_eq!(messages[1]["displayName"], "Ana");
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;

    let (status, body) = app
        .post_json("/rooms/messages", json!({ "content": "" }), Some(&ana))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
}

#[tokio::test]
async fn messages_are_room_scoped() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let zoe = app.join_token("lighthouse", "dev-9", "Zoe").await;

    app.post_json("/rooms/messages", json!({ "content": "campfire only" }), Some(&ana))
        .await;

    let (status, body) = app.get("/rooms/messages", Some(&zoe)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn message_listing_honors_the_limit() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;

    for i in 0..5 {
        app.post_json(
            "/rooms/messages",
            json!({ "content": format!("msg {}", i) }),
            Some(&ana),
        )
        .await;
    }

    let (status, body) = app.get("/rooms/messages?limit=3", Some(&ana)).await;
    assert_eq!(status, StatusCode::OK);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"], "msg 4");
}

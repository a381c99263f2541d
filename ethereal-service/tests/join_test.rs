mod common;

use axum::http::StatusCode;
use common::{test_config, TestApp};
use serde_json::json;

#[tokio::test]
async fn join_with_missing_fields_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json("/rooms/join", json!({ "secret": "campfire" }), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
}

#[tokio::test]
async fn join_with_empty_display_name_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/rooms/join",
            json!({ "secret": "campfire", "deviceId": "dev-1", "displayName": "" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
}

#[tokio::test]
async fn join_with_short_secret_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/rooms/join",
            json!({ "secret": "abc", "deviceId": "dev-1", "displayName": "Ana" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "pin_too_short");
}

#[tokio::test]
async fn first_joiner_creates_room_and_becomes_owner() {
    let app = TestApp::spawn().await;

    let body = app.join("campfire", "dev-1", "Ana").await;

    assert_eq!(body["isNewRoom"], true);
    assert_eq!(body["isOwner"], true);
    assert_eq!(body["memberCount"], 1);
    assert!(body["token"].as_str().unwrap().contains('.'));
    assert!(body["roomId"].as_str().is_some());
    assert!(body["memberId"].as_str().is_some());
}

#[tokio::test]
async fn same_secret_lands_in_same_room() {
    let app = TestApp::spawn().await;

    let first = app.join("campfire", "dev-1", "Ana").await;
    let second = app.join("campfire", "dev-2", "Ben").await;

    assert_eq!(second["roomId"], first["roomId"]);
    assert_eq!(second["isNewRoom"], false);
    assert_eq!(second["isOwner"], false);
    assert_eq!(second["memberCount"], 2);
}

#[tokio::test]
async fn different_secrets_land_in_different_rooms() {
    let app = TestApp::spawn().await;

    let first = app.join("campfire", "dev-1", "Ana").await;
    let second = app.join("lighthouse", "dev-1", "Ana").await;

    assert_ne!(second["roomId"], first["roomId"]);
    assert_eq!(second["isNewRoom"], true);
}

#[tokio::test]
async fn rejoin_with_same_device_reuses_membership() {
    let app = TestApp::spawn().await;

    let first = app.join("campfire", "dev-1", "Ana").await;
    let again = app.join("campfire", "dev-1", "Ana again").await;

    assert_eq!(again["roomId"], first["roomId"]);
    assert_eq!(again["memberId"], first["memberId"]);
    // A rejoin does not grow the room.
    assert_eq!(again["memberCount"], 1);
    assert_eq!(again["isOwner"], true);
    // Each join gets its own token though.
    assert_ne!(again["token"], first["token"]);
}

#[tokio::test]
async fn join_over_capacity_is_rejected() {
    let mut config = test_config();
    config.room.capacity = 2;
    let app = TestApp::spawn_with(config).await;

    app.join("campfire", "dev-1", "Ana").await;
    app.join("campfire", "dev-2", "Ben").await;

    let (status, body) = app
        .post_json(
            "/rooms/join",
            json!({ "secret": "campfire", "deviceId": "dev-3", "displayName": "Cleo" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "room_full");
}

#[tokio::test]
async fn rejoin_still_works_when_room_is_full() {
    let mut config = test_config();
    config.room.capacity = 2;
    let app = TestApp::spawn_with(config).await;

    app.join("campfire", "dev-1", "Ana").await;
    app.join("campfire", "dev-2", "Ben").await;

    // An existing device gets back in even at capacity.
    let again = app.join("campfire", "dev-2", "Ben").await;
    assert_eq!(again["memberCount"], 2);
}

#[tokio::test]
async fn concurrent_joins_with_same_secret_share_one_room() {
    let app = TestApp::spawn().await;

    let (a, b) = tokio::join!(
        app.join("campfire", "dev-1", "Ana"),
        app.join("campfire", "dev-2", "Ben"),
    );

    assert_eq!(a["roomId"], b["roomId"]);
    // Exactly one of the two saw the room come into existence.
    let created = [a["isNewRoom"].as_bool().unwrap(), b["isNewRoom"].as_bool().unwrap()];
    assert_eq!(created.iter().filter(|c| **c).count(), 1);
}

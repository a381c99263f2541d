mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn room_snapshot_lists_every_member() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    app.join("campfire", "dev-2", "Ben").await;

    let (status, body) = app.get("/rooms/me", Some(&ana)).await;
    assert_eq!(status, StatusCode::OK);

    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);

    let names: Vec<&str> = members
        .iter()
        .map(|m| m["displayName"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Ana"));
    assert!(names.contains(&"Ben"));

    // Device ids never leave the server.
    assert!(members[0].get("deviceId").is_none());
    assert!(members[0].get("device_id").is_none());
}

#[tokio::test]
async fn leave_then_rejoin_keeps_the_member_row() {
    let app = TestApp::spawn().await;
    let first = app.join("campfire", "dev-1", "Ana").await;
    let token = first["token"].as_str().unwrap();

    app.post_json("/rooms/leave", json!({}), Some(token)).await;

    let again = app.join("campfire", "dev-1", "Ana").await;
    assert_eq!(again["memberId"], first["memberId"]);
    assert_eq!(again["memberCount"], 1);
}

#[tokio::test]
async fn owner_can_kick_a_member() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let ben = app.join("campfire", "dev-2", "Ben").await;
    let ben_token = ben["token"].as_str().unwrap();
    let ben_id = ben["memberId"].as_str().unwrap();

    let (status, body) = app
        .post_json(&format!("/rooms/members/{}/kick", ben_id), json!({}), Some(&ana))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kicked"], true);

    // Ben's session is dead and his membership row is gone.
    let (status, body) = app.get("/rooms/me", Some(ben_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_revoked");

    let (_, body) = app.get("/rooms/me", Some(&ana)).await;
    assert_eq!(body["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_owner_cannot_kick() {
    let app = TestApp::spawn().await;
    let ana = app.join("campfire", "dev-1", "Ana").await;
    let ben = app.join_token("campfire", "dev-2", "Ben").await;
    let ana_id = ana["memberId"].as_str().unwrap();

    let (status, body) = app
        .post_json(&format!("/rooms/members/{}/kick", ana_id), json!({}), Some(&ben))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn kick_only_reaches_members_of_the_same_room() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let zoe = app.join("lighthouse", "dev-9", "Zoe").await;
    let zoe_id = zoe["memberId"].as_str().unwrap();

    let (status, body) = app
        .post_json(&format!("/rooms/members/{}/kick", zoe_id), json!({}), Some(&ana))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn kick_works_for_a_member_with_messages_and_documents() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let ben = app.join("campfire", "dev-2", "Ben").await;
    let ben_token = ben["token"].as_str().unwrap();
    let ben_id = ben["memberId"].as_str().unwrap();

    app.post_json("/rooms/messages", json!({ "content": "ben was here" }), Some(ben_token))
        .await;
    let (status, doc) = app
        .post_json("/rooms/documents", json!({ "content": "ben's notes" }), Some(ben_token))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let doc_id = doc["documentId"].as_str().unwrap();

    let (status, body) = app
        .post_json(&format!("/rooms/members/{}/kick", ben_id), json!({}), Some(&ana))
        .await;
    assert_eq!(status, StatusCode::OK, "kick failed: {}", body);
    assert_eq!(body["kicked"], true);

    // Ben's messages go with him; the shared document stays.
    let (_, body) = app.get("/rooms/messages", Some(&ana)).await;
    assert!(body["messages"].as_array().unwrap().is_empty());

    let (status, body) = app
        .get(&format!("/rooms/documents/{}", doc_id), Some(&ana))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "ben's notes");
}

#[tokio::test]
async fn kicked_member_can_join_again() {
    let app = TestApp::spawn().await;
    let ana = app.join_token("campfire", "dev-1", "Ana").await;
    let ben = app.join("campfire", "dev-2", "Ben").await;
    let ben_id = ben["memberId"].as_str().unwrap();

    app.post_json(&format!("/rooms/members/{}/kick", ben_id), json!({}), Some(&ana))
        .await;

    // The membership row was deleted, so this is a brand new member.
    let rejoined = app.join("campfire", "dev-2", "Ben").await;
    assert_ne!(rejoined["memberId"], ben["memberId"]);
    assert_eq!(rejoined["memberCount"], 2);
}

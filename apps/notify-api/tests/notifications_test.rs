mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;

// ===========================================================================
// Helpers
// ===========================================================================

fn message_request(target: &str, target_id: &str, tenant_id: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "kind": "message",
        "alert": "info",
        "target": target,
        "target_id": target_id,
        "tenant_id": tenant_id,
        "payload": {
            "kind": "message",
            "subject": "Group membership changed",
            "summary": "You were added to Admins",
            "body": "An administrator added you to the Admins group."
        }
    })
}

// ===========================================================================
// POST /api/v1/notifications
// ===========================================================================

#[tokio::test]
async fn send_notification_requires_auth() {
    let (app, _state, _keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/notifications")
        .json(&message_request("user", "user1", Some("acme")))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_notification_rejects_expired_token() {
    let (app, _state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let token = common::mint_expired_token(&keys, "admin1");
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&message_request("user", "user1", Some("acme")))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_notification_rejects_empty_target_id() {
    let (app, _state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&message_request("user", "   ", Some("acme")))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn send_to_offline_user_persists_and_reports_no_recipients() {
    let (app, _state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let admin_token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {admin_token}"))
        .json(&message_request("user", "user1", Some("acme")))
        .await;
    resp.assert_status_ok();

    let body: serde_json::Value = resp.json();
    assert_eq!(body["outcome"], "no_recipients");
    assert!(body["notification_id"].as_str().unwrap().starts_with("ntf_"));

    // The recipient sees the durable record on their next catch-up read.
    let user_token = common::mint_access_token(&keys, "user1", Some("acme"));
    let count: serde_json::Value = server
        .get("/api/v1/notifications/unread-count")
        .add_header(AUTHORIZATION, format!("Bearer {user_token}"))
        .await
        .json();
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn send_to_live_user_delivers_frame() {
    let (app, state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let (_session, mut rx) = common::connect_hub(&state, "acme", "user1", "c1").await;

    let token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&message_request("user", "user1", Some("acme")))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["outcome"], "delivered");

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.command, "notification");
    assert_eq!(frame.payload["id"], body["notification_id"]);
    assert_eq!(frame.payload["payload"]["subject"], "Group membership changed");
}

#[tokio::test]
async fn broadcast_excluding_sender_skips_own_connections() {
    let (app, state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let (_s1, mut sender_rx) = common::connect_hub(&state, "acme", "admin1", "c1").await;
    let (_s2, mut other_rx) = common::connect_hub(&state, "acme", "user2", "c2").await;

    let token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "kind": "message",
            "alert": "warning",
            "target": "all",
            "target_id": "acme",
            "payload": {
                "kind": "message",
                "subject": "Maintenance window",
                "summary": "Scheduled maintenance tonight",
                "body": "The directory will be read-only from 02:00 to 03:00 UTC."
            },
            "exclude_sender": true
        }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["outcome"], "delivered");

    assert!(other_rx.recv().await.is_some());
    assert!(sender_rx.try_recv().is_err());
}

#[tokio::test]
async fn system_payload_is_delivered_but_not_persisted() {
    let (app, state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let (_session, mut rx) = common::connect_hub(&state, "acme", "user1", "c1").await;

    let token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({
            "kind": "system",
            "alert": "error",
            "target": "user",
            "target_id": "user1",
            "tenant_id": "acme",
            "payload": { "kind": "system", "code": "session_revoked" }
        }))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["outcome"], "delivered");

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.payload["payload"]["code"], "session_revoked");

    let user_token = common::mint_access_token(&keys, "user1", Some("acme"));
    let count: serde_json::Value = server
        .get("/api/v1/notifications/unread-count")
        .add_header(AUTHORIZATION, format!("Bearer {user_token}"))
        .await
        .json();
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn tenant_claim_fills_missing_tenant_id() {
    let (app, state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let (_session, mut rx) = common::connect_hub(&state, "acme", "user1", "c1").await;

    // No tenant_id in the request body; the caller's claim supplies it.
    let token = common::mint_access_token(&keys, "admin1", Some("acme"));
    let resp = server
        .post("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&message_request("user", "user1", None))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["outcome"], "delivered");
    assert!(rx.recv().await.is_some());
}

// ===========================================================================
// GET /api/v1/notifications
// ===========================================================================

#[tokio::test]
async fn list_notifications_returns_callers_records_newest_first() {
    let (app, _state, keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let admin_token = common::mint_access_token(&keys, "admin1", Some("acme"));
    for i in 0..3 {
        let resp = server
            .post("/api/v1/notifications")
            .add_header(AUTHORIZATION, format!("Bearer {admin_token}"))
            .json(&serde_json::json!({
                "kind": "message",
                "alert": "info",
                "target": "user",
                "target_id": "user1",
                "tenant_id": "acme",
                "payload": {
                    "kind": "message",
                    "subject": format!("Subject {i}"),
                    "summary": format!("Summary {i}"),
                    "body": format!("Body {i}")
                }
            }))
            .await;
        resp.assert_status_ok();
    }

    let user_token = common::mint_access_token(&keys, "user1", Some("acme"));
    let body: serde_json::Value = server
        .get("/api/v1/notifications?limit=2")
        .add_header(AUTHORIZATION, format!("Bearer {user_token}"))
        .await
        .json();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["subject"], "Subject 2");
    assert_eq!(data[1]["subject"], "Subject 1");
    assert_eq!(data[0]["state"], "unread");
    assert_eq!(data[0]["user_id"], "user1");
}

#[tokio::test]
async fn unread_count_requires_auth() {
    let (app, _state, _keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    server
        .get("/api/v1/notifications/unread-count")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

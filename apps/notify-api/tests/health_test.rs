mod common;

use axum_test::TestServer;

#[tokio::test]
async fn health_is_public() {
    let (app, _state, _keys) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["status"], "ok");
}

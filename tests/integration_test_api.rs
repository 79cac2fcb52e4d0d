mod common;

use axum::http::StatusCode;
use common::TestApp;
use court_booking::domain::models::account::AccountRole;
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_requests_need_a_valid_token() {
    let app = TestApp::new().await;

    let (status, _) = app.send("GET", "/api/v1/courts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/v1/courts", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token("player", AccountRole::Customer);
    let (status, _) = app.send("GET", "/api/v1/courts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_account_sync_and_status() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;

    let token = app.token("player", AccountRole::Customer);
    let (status, _) = app.send("GET", "/api/v1/accounts/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, account) = app.send("POST", "/api/v1/accounts/sync", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["id"], "player");
    assert_eq!(account["role"], "customer");
    assert_eq!(account["email"], "player@courts.test");
    assert_eq!(account["credit_balance_cents"], 0);

    let (status, _) = app.send("GET", "/api/v1/accounts", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, accounts) = app.send("GET", "/api/v1/accounts", Some(&manager), None).await;
    assert_eq!(accounts.as_array().unwrap().len(), 2);

    let (status, updated) = app.send("PUT", "/api/v1/accounts/player/status", Some(&manager), Some(json!({
        "status": "inactive"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");

    // Syncing again keeps the manager's decision.
    let (_, account) = app.send("POST", "/api/v1/accounts/sync", Some(&token), None).await;
    assert_eq!(account["status"], "inactive");

    let (status, _) = app.send("POST", "/api/v1/referrals/code", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("PUT", "/api/v1/accounts/ghost/status", Some(&manager), Some(json!({
        "status": "inactive"
    }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inactive_account_cannot_book() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = common::days_ahead(5);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    app.send("PUT", "/api/v1/accounts/player/status", Some(&manager), Some(json!({ "status": "inactive" }))).await;

    let (status, _) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_court_detail_and_updates() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = common::days_ahead(5);
    let (court_id, slot_id) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (status, detail) = app.send("GET", &format!("/api/v1/courts/{}", court_id), Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["court"]["name"], "Society 1");
    assert_eq!(detail["slots"].as_array().unwrap().len(), 1);

    let (status, slot) = app.send("PUT", &format!("/api/v1/slots/{}", slot_id), Some(&manager), Some(json!({
        "casual_price_cents": 18000
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slot["casual_price_cents"], 18000);

    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(reservation["total_cents"], 18000);

    let (status, _) = app.send("PUT", &format!("/api/v1/slots/{}", slot_id), Some(&manager), Some(json!({
        "end_time": "18:00:00"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/v1/courts/missing", Some(&player), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_past_dates_cannot_be_booked() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = common::days_ahead(-7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (status, _) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

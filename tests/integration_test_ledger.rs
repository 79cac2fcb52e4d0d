mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

#[tokio::test]
async fn test_balance_chain_links_every_entry() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    for amount in [5000, 2500, -3000] {
        let (status, tx) = app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({
            "amount_cents": amount, "description": "Goodwill"
        }))).await;
        assert_eq!(status, StatusCode::CREATED, "{}", tx);
        assert_eq!(tx["kind"], "manual_adjustment");
        assert_eq!(tx["created_by"], "mgr");
    }

    let (status, expired) = app.send("POST", "/api/v1/accounts/player/credits/expire", Some(&manager), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expired["amount_cents"], -4500);
    assert_eq!(expired["kind"], "expiry");

    let (_, history) = app.send("GET", "/api/v1/credits/me/transactions", Some(&player), None).await;
    let mut entries = history.as_array().unwrap().clone();
    entries.reverse();
    assert_eq!(entries.len(), 4);

    let mut previous = 0;
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["sequence"], i as i64 + 1);
        assert_eq!(entry["previous_balance_cents"], previous);
        let new_balance = entry["new_balance_cents"].as_i64().unwrap();
        assert_eq!(new_balance, previous + entry["amount_cents"].as_i64().unwrap());
        previous = new_balance;
    }
    assert_eq!(previous, 0);

    let (status, audit) = app.send("GET", "/api/v1/accounts/player/credits/audit", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["consistent"], true);
    assert_eq!(audit["transactions"], 4);
    assert!(audit["breaks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_debit_beyond_balance_is_refused() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let (status, body) = app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({
        "amount_cents": -10
    }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["available_cents"], 0);
    assert_eq!(body["requested_cents"], 10);

    assert_eq!(app.balance(&player).await, 0);
    let (_, history) = app.send("GET", "/api/v1/credits/me/transactions", Some(&player), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_credits_are_serialized() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let mut set = JoinSet::new();
    for _ in 0..10 {
        let router = app.router.clone();
        let request = TestApp::request("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({
            "amount_cents": 100
        })));
        set.spawn(async move { router.oneshot(request).await.unwrap().status() });
    }
    while let Some(status) = set.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(app.balance(&player).await, 1000);
    let (_, audit) = app.send("GET", "/api/v1/accounts/player/credits/audit", Some(&manager), None).await;
    assert_eq!(audit["consistent"], true);
    assert_eq!(audit["transactions"], 10);
}

#[tokio::test]
async fn test_adjustments_are_manager_only_and_non_zero() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let (status, _) = app.send("POST", "/api/v1/accounts/player/credits", Some(&player), Some(json!({
        "amount_cents": 100000
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({
        "amount_cents": 0
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("POST", "/api/v1/accounts/nobody/credits", Some(&manager), Some(json!({
        "amount_cents": 100
    }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send("POST", "/api/v1/accounts/player/credits/expire", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "nothing_to_expire");
}

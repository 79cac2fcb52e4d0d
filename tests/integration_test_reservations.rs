mod common;

use axum::http::StatusCode;
use common::{days_ahead, TestApp, PROCESSOR_TOKEN};
use court_booking::config::BookingPolicy;
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

#[tokio::test]
async fn test_concurrent_creates_yield_one_reservation() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;

    let date = days_ahead(6);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let mut players = Vec::new();
    for i in 0..6 {
        players.push(app.customer(&format!("player-{}", i)).await);
    }

    let mut set = JoinSet::new();
    for token in players {
        let router = app.router.clone();
        let request = TestApp::request("POST", "/api/v1/reservations", Some(&token), Some(json!({
            "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00", "participants": 8
        })));
        set.spawn(async move { router.oneshot(request).await.unwrap().status() });
    }

    let mut created = 0;
    let mut conflicts = 0;
    while let Some(status) = set.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 5);

    let uri = format!("/api/v1/courts/{}/reservations?from={}&to={}", court_id, date, date);
    let (status, list) = app.send("GET", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_booking_names_existing_reservation() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let alice = app.customer("alice").await;
    let bob = app.customer("bob").await;

    let date = days_ahead(6);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (status, first) = app.book(&alice, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "pending");
    assert_eq!(first["total_cents"], 15000);

    let (status, body) = app.book(&bob, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["rule"], "reservation");
    assert_eq!(body["reservation_id"], first["id"]);
}

#[tokio::test]
async fn test_settlement_confirms_and_early_cancel_refunds_everything() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let charges = app.processor.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount_cents, 15000);

    let (status, receipt) = app.settle(&id, "settled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "applied");

    let (_, confirmed) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["paid_cents"], 15000);

    let (status, quote) = app.send("GET", &format!("/api/v1/reservations/{}/cancellation-quote", id), Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["band"], "full");
    assert_eq!(quote["refund_cents"], 15000);

    let (status, outcome) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["reservation"]["status"], "cancelled");
    assert_eq!(outcome["refund"]["refund_cents"], 15000);
    assert_eq!(outcome["already_cancelled"], false);

    assert_eq!(app.balance(&player).await, 15000);
}

#[tokio::test]
async fn test_cancel_inside_zero_refund_window_issues_nothing() {
    let policy = BookingPolicy { full_refund_hours: 24 * 30, zero_refund_hours: 24 * 20, ..BookingPolicy::default() };
    let app = TestApp::with_policy(policy).await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();
    app.settle(&id, "settled").await;

    let (status, outcome) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["refund"]["band"], "none");
    assert_eq!(outcome["refund"]["refund_cents"], 0);

    assert_eq!(app.balance(&player).await, 0);
    let (_, history) = app.send("GET", "/api/v1/credits/me/transactions", Some(&player), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_late_cancel_forfeits_penalty_unless_waived() {
    let policy = BookingPolicy { full_refund_hours: 24 * 30, zero_refund_hours: 24 * 3, ..BookingPolicy::default() };
    let app = TestApp::with_policy(policy).await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(10);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, first) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let first_id = first["id"].as_str().unwrap().to_string();
    app.settle(&first_id, "settled").await;

    let (_, outcome) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", first_id), Some(&player), None).await;
    assert_eq!(outcome["refund"]["band"], "partial");
    assert_eq!(outcome["refund"]["refund_cents"], 7500);
    assert_eq!(outcome["refund"]["penalty_cents"], 7500);

    // Only managers may waive.
    let (_, second) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let second_id = second["id"].as_str().unwrap().to_string();
    app.settle(&second_id, "settled").await;

    let waive = format!("/api/v1/reservations/{}/cancel?waive_penalty=true", second_id);
    let (status, _) = app.send("POST", &waive, Some(&player), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = app.send("POST", &waive, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["refund"]["band"], "waived");
    assert_eq!(outcome["refund"]["refund_cents"], 15000);

    assert_eq!(app.balance(&player).await, 22500);
}

#[tokio::test]
async fn test_recancel_is_a_noop() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();
    app.settle(&id, "settled").await;

    let cancel = format!("/api/v1/reservations/{}/cancel", id);
    let (_, first) = app.send("POST", &cancel, Some(&player), None).await;
    let (status, second) = app.send("POST", &cancel, Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_cancelled"], true);
    assert!(second["refund"].is_null());
    assert_eq!(second["reservation"]["cancelled_at"], first["reservation"]["cancelled_at"]);

    assert_eq!(app.balance(&player).await, 15000);
    let (_, history) = app.send("GET", "/api/v1/credits/me/transactions", Some(&player), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // The slot is free again.
    let other = app.customer("other").await;
    let (status, _) = app.book(&other, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_settlement_event_changes_nothing() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let (_, first) = app.settle(&id, "settled").await;
    assert_eq!(first["status"], "applied");
    let (status, second) = app.settle(&id, "settled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "duplicate");
    assert_eq!(second["payment"]["status"], "settled");

    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["paid_cents"], 15000);

    // A failure report for a settled payment is out of order and ignored too.
    let (_, late_failure) = app.settle(&id, "failed").await;
    assert_eq!(late_failure["status"], "duplicate");
}

#[tokio::test]
async fn test_payment_events_require_processor_token() {
    let app = TestApp::new().await;
    let player = app.customer("player").await;

    let event = json!({ "request_id": "whatever", "outcome": "settled" });
    let (status, _) = app.send("POST", "/api/v1/payments/events", Some(&player), Some(event.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("POST", "/api/v1/payments/events", Some(PROCESSOR_TOKEN), Some(event)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settlement_after_cancellation_is_credited_back() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let (_, outcome) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;
    assert_eq!(outcome["refund"]["refund_cents"], 0);

    let (_, receipt) = app.settle(&id, "settled").await;
    assert_eq!(receipt["status"], "applied");

    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["status"], "cancelled");
    assert_eq!(current["refunded_cents"], 15000);
    assert_eq!(app.balance(&player).await, 15000);
}

#[tokio::test]
async fn test_processor_refund_after_cancellation_reverses_the_credit() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();
    app.settle(&id, "settled").await;

    let (_, outcome) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;
    assert_eq!(outcome["refund"]["refund_cents"], 15000);
    assert_eq!(app.balance(&player).await, 15000);

    let (status, receipt) = app.settle(&id, "refunded").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "applied");
    assert_eq!(app.balance(&player).await, 0);

    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["paid_cents"], 0);
    assert_eq!(current["refunded_cents"], 0);

    let (_, log) = app.send("GET", "/api/v1/credits/me/transactions", Some(&player), None).await;
    let kinds: Vec<&str> = log.as_array().unwrap().iter().map(|t| t["kind"].as_str().unwrap()).collect();
    assert!(kinds.contains(&"refund_reversal"), "{:?}", kinds);

    let (_, audit) = app.send("GET", "/api/v1/accounts/player/credits/audit", Some(&manager), None).await;
    assert_eq!(audit["consistent"], true);

    // A repeated refund event is a duplicate and takes nothing more.
    let (_, receipt) = app.settle(&id, "refunded").await;
    assert_eq!(receipt["status"], "duplicate");
    assert_eq!(app.balance(&player).await, 0);
}

#[tokio::test]
async fn test_refund_reversal_is_capped_by_spent_credit() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();
    app.settle(&id, "settled").await;
    app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;

    // Part of the refund credit goes into another booking before the processor refund lands.
    let (status, _) = app.send("POST", "/api/v1/reservations", Some(&player), Some(json!({
        "court_id": court_id, "date": date + chrono::Duration::days(7), "start_time": "19:00:00", "end_time": "20:00:00",
        "participants": 10, "credit_offset_cents": 10000
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.balance(&player).await, 5000);

    let (_, receipt) = app.settle(&id, "refunded").await;
    assert_eq!(receipt["status"], "applied");
    assert_eq!(app.balance(&player).await, 0);

    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["refunded_cents"], 10000);
}

#[tokio::test]
async fn test_credit_offset_beyond_balance_rolls_back_booking() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (status, body) = app.send("POST", "/api/v1/reservations", Some(&player), Some(json!({
        "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00",
        "participants": 10, "credit_offset_cents": 5000
    }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["available_cents"], 0);

    let (_, mine) = app.send("GET", "/api/v1/reservations/me", Some(&player), None).await;
    assert!(mine.as_array().unwrap().is_empty());

    // With enough credit the offset lowers the charge.
    app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({ "amount_cents": 5000 }))).await;
    let (status, reservation) = app.send("POST", "/api/v1/reservations", Some(&player), Some(json!({
        "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00",
        "participants": 10, "credit_offset_cents": 5000
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["credit_applied_cents"], 5000);
    assert_eq!(app.processor.charges().last().unwrap().amount_cents, 10000);
    assert_eq!(app.balance(&player).await, 0);
}

#[tokio::test]
async fn test_fully_covered_booking_confirms_immediately() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({ "amount_cents": 20000 }))).await;

    let (status, reservation) = app.send("POST", "/api/v1/reservations", Some(&player), Some(json!({
        "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00",
        "participants": 10, "credit_offset_cents": 20000
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["status"], "confirmed");
    assert_eq!(reservation["credit_applied_cents"], 15000);
    assert!(app.processor.charges().is_empty());
    assert_eq!(app.balance(&player).await, 5000);
}

#[tokio::test]
async fn test_delete_pending_and_refuse_delete_once_paid() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (_, pending) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let pending_id = pending["id"].as_str().unwrap().to_string();
    let (status, _) = app.send("DELETE", &format!("/api/v1/reservations/{}", pending_id), Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("GET", &format!("/api/v1/reservations/{}", pending_id), Some(&player), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, paid) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let paid_id = paid["id"].as_str().unwrap().to_string();
    app.settle(&paid_id, "settled").await;
    let (status, _) = app.send("DELETE", &format!("/api/v1/reservations/{}", paid_id), Some(&player), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_manager_confirmation_and_illegal_transitions() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let confirm = format!("/api/v1/reservations/{}/confirm", id);
    let (status, _) = app.send("POST", &confirm, Some(&player), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, confirmed) = app.send("POST", &confirm, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, _) = app.send("POST", &confirm, Some(&manager), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send("POST", &format!("/api/v1/reservations/{}/pay", id), Some(&player), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&player), None).await;
    let (status, _) = app.send("POST", &confirm, Some(&manager), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_payment_can_be_retried() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&player, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let (_, failed) = app.settle(&id, "failed").await;
    assert_eq!(failed["payment"]["status"], "failed");

    let (status, payment) = app.send("POST", &format!("/api/v1/reservations/{}/pay", id), Some(&player), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(payment["status"], "requested");
    assert_eq!(app.processor.charges().len(), 2);

    app.settle(&id, "settled").await;
    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["status"], "confirmed");
}

#[tokio::test]
async fn test_other_customers_cannot_see_reservation() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let alice = app.customer("alice").await;
    let bob = app.customer("bob").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    let (_, reservation) = app.book(&alice, &court_id, date, "19:00:00", "20:00:00").await;
    let id = reservation["id"].as_str().unwrap().to_string();

    let (status, _) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("POST", &format!("/api/v1/reservations/{}/cancel", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stale_pending_hold_is_released_by_worker() {
    let policy = BookingPolicy { pending_hold_minutes: Some(30), ..BookingPolicy::default() };
    let app = TestApp::with_policy(policy).await;
    let manager = app.manager("mgr").await;
    let player = app.customer("player").await;
    let rival = app.customer("rival").await;

    let date = days_ahead(7);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;
    app.send("POST", "/api/v1/accounts/player/credits", Some(&manager), Some(json!({ "amount_cents": 5000 }))).await;

    let (status, reservation) = app.send("POST", "/api/v1/reservations", Some(&player), Some(json!({
        "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00",
        "participants": 10, "credit_offset_cents": 5000
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["status"], "pending");
    let id = reservation["id"].as_str().unwrap().to_string();
    assert_eq!(app.balance(&player).await, 0);

    // A fresh hold survives the sweep.
    court_booking::background::run_once(&app.state).await;
    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["status"], "pending");

    sqlx::query("UPDATE reservations SET created_at = ? WHERE id = ?")
        .bind(chrono::Utc::now() - chrono::Duration::hours(1))
        .bind(&id)
        .execute(&app.pool)
        .await
        .unwrap();

    court_booking::background::run_once(&app.state).await;

    let (_, current) = app.send("GET", &format!("/api/v1/reservations/{}", id), Some(&player), None).await;
    assert_eq!(current["status"], "cancelled");
    assert_eq!(current["refunded_cents"], 5000);
    assert_eq!(app.balance(&player).await, 5000);

    let (status, body) = app.book(&rival, &court_id, date, "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

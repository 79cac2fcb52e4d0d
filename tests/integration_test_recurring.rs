mod common;

use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{days_ahead, next_weekday, weekday, TestApp};
use serde_json::{json, Value};

const TUESDAY: i32 = 2;

fn tuesdays_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).filter(|d| weekday(*d) == TUESDAY).collect()
}

async fn weekly_template(app: &TestApp, token: &str, court_id: &str, starts_on: NaiveDate) -> Value {
    let (status, template) = app.send("POST", "/api/v1/recurring", Some(token), Some(json!({
        "court_id": court_id,
        "recurrence": "weekly",
        "weekdays": [TUESDAY],
        "start_time": "19:00:00",
        "end_time": "20:00:00",
        "participants": 10,
        "starts_on": starts_on
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", template);
    template
}

#[tokio::test]
async fn test_expansion_skips_blackout_tuesday_and_is_idempotent() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let club = app.customer("club").await;

    let starts_on = days_ahead(1);
    let tuesdays = tuesdays_between(starts_on, days_ahead(30));
    let (court_id, _) = app.court_with_slot(&manager, tuesdays[0], "19:00:00", "20:00:00").await;
    app.blackout(&manager, &court_id, tuesdays[1], "Regional final").await;

    let template = weekly_template(&app, &club, &court_id, starts_on).await;
    assert_eq!(template["price_cents"], 12000);
    assert_eq!(template["discount_percent"], 10);
    let id = template["id"].as_str().unwrap().to_string();

    let expand = format!("/api/v1/recurring/{}/expand", id);
    let (status, report) = app.send("POST", &expand, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["created"].as_array().unwrap().len(), tuesdays.len() - 1);
    assert_eq!(report["gaps"], json!([[tuesdays[1], "blackout"]]));

    let (_, mine) = app.send("GET", "/api/v1/reservations/me", Some(&club), None).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), tuesdays.len() - 1);
    for reservation in mine {
        assert_eq!(reservation["status"], "confirmed");
        assert_eq!(reservation["kind"], "recurring_instance");
        assert_eq!(reservation["total_cents"], 10800);
        assert_eq!(reservation["template_id"], id.as_str());
    }

    // Same horizon again: nothing new.
    let (status, again) = app.send("POST", &expand, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(again["created"].as_array().unwrap().is_empty());
    let (_, mine) = app.send("GET", "/api/v1/reservations/me", Some(&club), None).await;
    assert_eq!(mine.as_array().unwrap().len(), tuesdays.len() - 1);

    let (status, gaps) = app.send("GET", &format!("/api/v1/recurring/{}/gaps", id), Some(&club), None).await;
    assert_eq!(status, StatusCode::OK);
    let gaps = gaps.as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["reason"], "blackout");

    let (_, current) = app.send("GET", &format!("/api/v1/recurring/{}", id), Some(&club), None).await;
    assert_eq!(current["instances_generated"], (tuesdays.len() - 1) as i64);
}

#[tokio::test]
async fn test_taken_date_becomes_gap() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let club = app.customer("club").await;
    let walk_in = app.customer("walk-in").await;

    let starts_on = days_ahead(1);
    let tuesdays = tuesdays_between(starts_on, days_ahead(30));
    let (court_id, _) = app.court_with_slot(&manager, tuesdays[0], "19:00:00", "20:00:00").await;

    let (status, _) = app.book(&walk_in, &court_id, tuesdays[0], "19:00:00", "20:00:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let template = weekly_template(&app, &club, &court_id, starts_on).await;
    let id = template["id"].as_str().unwrap();

    let (_, report) = app.send("POST", &format!("/api/v1/recurring/{}/expand", id), Some(&manager), None).await;
    assert_eq!(report["gaps"], json!([[tuesdays[0], "taken"]]));
    assert_eq!(report["created"].as_array().unwrap().len(), tuesdays.len() - 1);
}

#[tokio::test]
async fn test_background_pass_expands_due_templates() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let club = app.customer("club").await;

    let starts_on = days_ahead(1);
    let tuesdays = tuesdays_between(starts_on, days_ahead(30));
    let (court_id, _) = app.court_with_slot(&manager, tuesdays[0], "19:00:00", "20:00:00").await;
    let template = weekly_template(&app, &club, &court_id, starts_on).await;
    let id = template["id"].as_str().unwrap();

    court_booking::background::run_once(&app.state).await;

    let (_, current) = app.send("GET", &format!("/api/v1/recurring/{}", id), Some(&club), None).await;
    assert_eq!(current["instances_generated"], tuesdays.len() as i64);
    assert!(!current["generated_through"].is_null());

    // Not due again until the next checkpoint.
    court_booking::background::run_once(&app.state).await;
    let (_, mine) = app.send("GET", "/api/v1/reservations/me", Some(&club), None).await;
    assert_eq!(mine.as_array().unwrap().len(), tuesdays.len());
}

#[tokio::test]
async fn test_template_lifecycle() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let club = app.customer("club").await;
    let stranger = app.customer("stranger").await;

    let starts_on = next_weekday(days_ahead(1), TUESDAY);
    let (court_id, _) = app.court_with_slot(&manager, starts_on, "19:00:00", "20:00:00").await;
    let template = weekly_template(&app, &club, &court_id, starts_on).await;
    let id = template["id"].as_str().unwrap();

    let (status, _) = app.send("GET", &format!("/api/v1/recurring/{}", id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, paused) = app.send("POST", &format!("/api/v1/recurring/{}/pause", id), Some(&club), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["status"], "paused");

    let (status, _) = app.send("POST", &format!("/api/v1/recurring/{}/expand", id), Some(&manager), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, resumed) = app.send("POST", &format!("/api/v1/recurring/{}/resume", id), Some(&club), None).await;
    assert_eq!(resumed["status"], "active");

    let (_, ended) = app.send("POST", &format!("/api/v1/recurring/{}/end", id), Some(&club), None).await;
    assert_eq!(ended["status"], "ended");

    let (status, _) = app.send("POST", &format!("/api/v1/recurring/{}/resume", id), Some(&club), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = app.send("GET", "/api/v1/recurring/me", Some(&club), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_template_validation() {
    let app = TestApp::new().await;
    let manager = app.manager("mgr").await;
    let club = app.customer("club").await;

    let date = days_ahead(3);
    let (court_id, _) = app.court_with_slot(&manager, date, "19:00:00", "20:00:00").await;

    let (status, _) = app.send("POST", "/api/v1/recurring", Some(&club), Some(json!({
        "court_id": court_id, "recurrence": "weekly", "weekdays": [],
        "start_time": "19:00:00", "end_time": "20:00:00", "participants": 10, "starts_on": date
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("POST", "/api/v1/recurring", Some(&club), Some(json!({
        "court_id": court_id, "recurrence": "monthly", "day_of_month": 40,
        "start_time": "19:00:00", "end_time": "20:00:00", "participants": 10, "starts_on": date
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No slot at this hour and no explicit price.
    let (status, _) = app.send("POST", "/api/v1/recurring", Some(&club), Some(json!({
        "court_id": court_id, "recurrence": "weekly", "weekdays": [weekday(date)],
        "start_time": "07:00:00", "end_time": "08:00:00", "participants": 10, "starts_on": date
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

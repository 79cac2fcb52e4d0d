use court_booking::{
    api::router::create_router,
    config::{BookingPolicy, Config},
    domain::models::{account::AccountRole, auth::Claims, payment::ChargeRequest},
    domain::ports::PaymentProcessor,
    error::AppError,
    infra::factory::connect_repositories,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const PROCESSOR_TOKEN: &str = "test-processor-token";
const ISSUER: &str = "test-issuer";
const AUDIENCE: &str = "court-booking-tests";

/// Records charge requests instead of calling a real processor.
#[derive(Default)]
pub struct MockPaymentProcessor {
    charges: Mutex<Vec<ChargeRequest>>,
}

impl MockPaymentProcessor {
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<(), AppError> {
        self.charges.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub db_filename: String,
    pub pool: Pool<Sqlite>,
    pub state: Arc<AppState>,
    pub processor: Arc<MockPaymentProcessor>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(BookingPolicy::default()).await
    }

    pub async fn with_policy(policy: BookingPolicy) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            payment_service_url: "http://localhost".to_string(),
            payment_service_token: PROCESSOR_TOKEN.to_string(),
            jwt_public_key: include_str!("../tests/keys/test_public.pem").to_string(),
            auth_issuer: ISSUER.to_string(),
            auth_audience: AUDIENCE.to_string(),
            policy,
        };

        let repos = connect_repositories(&db_url).await;

        // Side door for backdating rows; the app's own pool has already migrated the file.
        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        let processor = Arc::new(MockPaymentProcessor::default());
        let state = Arc::new(AppState::assemble(config, repos, processor.clone()));
        let router = create_router(state.clone());

        Self { router, db_filename, pool, state, processor }
    }

    pub fn token(&self, account_id: &str, role: AccountRole) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: account_id.to_string(),
            aud: AUDIENCE.to_string(),
            exp: now + 3600,
            iat: now,
            role,
            name: Some(format!("Player {}", account_id)),
            email: Some(format!("{}@courts.test", account_id)),
        };
        let key = EncodingKey::from_ed_pem(include_bytes!("../tests/keys/test_private.pem")).unwrap();
        encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap()
    }

    /// Token for an account that has already been synced.
    pub async fn account(&self, account_id: &str, role: AccountRole) -> String {
        let token = self.token(account_id, role);
        let (status, _) = self.send("POST", "/api/v1/accounts/sync", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "account sync failed for {}", account_id);
        token
    }

    pub async fn customer(&self, account_id: &str) -> String {
        self.account(account_id, AccountRole::Customer).await
    }

    pub async fn manager(&self, account_id: &str) -> String {
        self.account(account_id, AccountRole::Manager).await
    }

    pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.router.clone()
            .oneshot(Self::request(method, uri, token, body))
            .await
            .unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    /// Court "Society 1" with one slot on the weekday of `date`.
    pub async fn court_with_slot(&self, manager: &str, date: NaiveDate, start: &str, end: &str) -> (String, String) {
        let (status, court) = self.send("POST", "/api/v1/courts", Some(manager), Some(json!({
            "name": "Society 1", "modality": "society", "max_occupancy": 14
        }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let court_id = court["id"].as_str().unwrap().to_string();

        let slot_id = self.add_slot(manager, &court_id, weekday(date), start, end).await;
        (court_id, slot_id)
    }

    pub async fn add_slot(&self, manager: &str, court_id: &str, weekday: i32, start: &str, end: &str) -> String {
        let (status, slot) = self.send("POST", &format!("/api/v1/courts/{}/slots", court_id), Some(manager), Some(json!({
            "weekday": weekday, "start_time": start, "end_time": end,
            "casual_price_cents": 15000, "subscriber_price_cents": 12000
        }))).await;
        assert_eq!(status, StatusCode::CREATED, "slot creation failed: {}", slot);
        slot["id"].as_str().unwrap().to_string()
    }

    pub async fn blackout(&self, manager: &str, court_id: &str, date: NaiveDate, reason: &str) -> String {
        let (status, blackout) = self.send("POST", &format!("/api/v1/courts/{}/blackouts", court_id), Some(manager), Some(json!({
            "start_date": date, "end_date": date, "reason": reason
        }))).await;
        assert_eq!(status, StatusCode::CREATED, "blackout creation failed: {}", blackout);
        blackout["id"].as_str().unwrap().to_string()
    }

    pub async fn book(&self, token: &str, court_id: &str, date: NaiveDate, start: &str, end: &str) -> (StatusCode, Value) {
        self.send("POST", "/api/v1/reservations", Some(token), Some(json!({
            "court_id": court_id, "date": date, "start_time": start, "end_time": end, "participants": 10
        }))).await
    }

    /// Delivers a processor event for the latest charge of `reservation_id`.
    pub async fn settle(&self, reservation_id: &str, outcome: &str) -> (StatusCode, Value) {
        let charge = self.processor.charges().into_iter()
            .rev()
            .find(|c| c.reservation_id == reservation_id)
            .expect("no charge requested for reservation");
        self.send("POST", "/api/v1/payments/events", Some(PROCESSOR_TOKEN), Some(json!({
            "request_id": charge.request_id, "outcome": outcome, "provider_reference": "psp-1"
        }))).await
    }

    pub async fn balance(&self, token: &str) -> i64 {
        let (status, body) = self.send("GET", "/api/v1/credits/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body["balance_cents"].as_i64().unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.db_filename, suffix));
        }
    }
}

pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Venue-local date `days` from today.
#[allow(dead_code)]
pub fn days_ahead(days: i64) -> NaiveDate {
    Utc::now().with_timezone(&chrono_tz::America::Sao_Paulo).date_naive() + Duration::days(days)
}

#[allow(dead_code)]
pub fn weekday(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

/// First date on or after `from` falling on `weekday` (0 = Sunday).
#[allow(dead_code)]
pub fn next_weekday(from: NaiveDate, weekday_index: i32) -> NaiveDate {
    let mut date = from;
    while weekday(date) != weekday_index {
        date += Duration::days(1);
    }
    date
}

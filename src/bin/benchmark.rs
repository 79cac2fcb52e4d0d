use chrono::{Datelike, Duration as ChronoDuration, Utc};
use colored::*;
use court_booking::domain::models::{account::AccountRole, auth::Claims};
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;
const CONTENDERS: usize = 50;

struct Target {
    name: &'static str,
    url: String,
    token: Option<String>,
}

struct Signer {
    key: EncodingKey,
    issuer: String,
    audience: String,
}

impl Signer {
    fn from_env() -> Self {
        let path = env::var("BENCH_PRIVATE_KEY").unwrap_or_else(|_| "tests/keys/test_private.pem".to_string());
        let pem = std::fs::read(&path).unwrap_or_else(|e| panic!("Cannot read signing key {}: {}", path, e));
        Self {
            key: EncodingKey::from_ed_pem(&pem).expect("Signing key must be an Ed25519 PEM"),
            issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://auth.courts.local".to_string()),
            audience: env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "court-booking".to_string()),
        }
    }

    fn token(&self, account_id: &str, role: AccountRole) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: account_id.to_string(),
            aud: self.audience.clone(),
            exp: now + 3600,
            iat: now,
            role,
            name: Some(account_id.to_string()),
            email: Some(format!("{}@bench.local", account_id)),
        };
        encode(&Header::new(Algorithm::EdDSA), &claims, &self.key).expect("Failed to sign token")
    }
}

#[tokio::main]
async fn main() {
    let base_url = env::var("BENCH_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    println!("{}", "🚀 Starting Benchmark Suite".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("❌ Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    let signer = Signer::from_env();
    let run_id = Uuid::new_v4().simple().to_string();
    let manager = sync_account(&client, &base_url, &signer, &format!("bench-mgr-{}", run_id), AccountRole::Manager).await;
    let player = sync_account(&client, &base_url, &signer, &format!("bench-player-{}", run_id), AccountRole::Customer).await;

    println!("\n{}", "⚙️  Setting up benchmark data...".yellow());
    let court_id = setup_court(&client, &base_url, &manager).await;
    println!("{}", "✅ Court with a full week of slots created.".green());
    println!("   Court ID: {}", court_id);

    let week_start = Utc::now().date_naive() + ChronoDuration::days(1);
    let targets = vec![
        Target {
            name: "Health Check (Public)",
            url: format!("{}/health", base_url),
            token: None,
        },
        Target {
            name: "Weekly Availability Grid",
            url: format!("{}/api/v1/courts/{}/availability/week?start={}", base_url, court_id, week_start),
            token: Some(player.clone()),
        },
        Target {
            name: "Credit Balance",
            url: format!("{}/api/v1/credits/me", base_url),
            token: Some(player.clone()),
        },
    ];

    let rps_stages = vec![10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(60));

        println!("{:<10} | {:<15} | {:<15} | {:<15}", "RPS", "Mean (ms)", "P99 (ms)", "Success Rate");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<15}", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }

    contention_stage(&client, &base_url, &signer, &manager, &court_id, &run_id).await;
}

async fn sync_account(client: &Client, base_url: &str, signer: &Signer, account_id: &str, role: AccountRole) -> String {
    let token = signer.token(account_id, role);
    let res = client.post(format!("{}/api/v1/accounts/sync", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send account sync request");

    if !res.status().is_success() {
        panic!("Account sync failed for {}: status {}", account_id, res.status());
    }
    token
}

async fn setup_court(client: &Client, base_url: &str, manager: &str) -> String {
    let res = client.post(format!("{}/api/v1/courts", base_url))
        .bearer_auth(manager)
        .json(&json!({ "name": "Benchmark Arena", "modality": "society", "max_occupancy": 14 }))
        .send()
        .await
        .expect("Failed to create court");

    if !res.status().is_success() {
        panic!("Failed to create court: status {}", res.status());
    }
    let body: Value = res.json().await.expect("Failed to parse court response");
    let court_id = body["id"].as_str().expect("No court id").to_string();

    for weekday in 0..7 {
        for hour in 8..22 {
            let res = client.post(format!("{}/api/v1/courts/{}/slots", base_url, court_id))
                .bearer_auth(manager)
                .json(&json!({
                    "weekday": weekday,
                    "start_time": format!("{:02}:00:00", hour),
                    "end_time": format!("{:02}:00:00", hour + 1),
                    "casual_price_cents": 15000,
                    "subscriber_price_cents": 12000
                }))
                .send()
                .await
                .expect("Failed to create slot");

            if !res.status().is_success() {
                let status = res.status();
                let txt = res.text().await.unwrap_or_default();
                panic!("Failed to create slot. Status: {}. Body: {}", status, txt);
            }
        }
    }
    court_id
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    loop {
        if start_time.elapsed() > duration {
            break;
        }

        if limiter.check().is_ok() {
            let mut req = client.get(&target.url);
            if let Some(token) = &target.token {
                req = req.bearer_auth(token);
            }
            let tx = tx.clone();

            tokio::spawn(async move {
                let req_start = Instant::now();
                let res = req.send().await;
                let latency = req_start.elapsed();

                let success = match res {
                    Ok(r) => r.status().is_success(),
                    Err(_) => false,
                };

                let _ = tx.send((latency, success)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut successes = 0;
    let mut total = 0;

    while let Some((latency, success)) = rx.recv().await {
        total += 1;
        if success { successes += 1; }
        histogram.record(latency.as_micros() as u64).unwrap();
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    println!(
        "{:<10} | {:<15.2} | {:<15.2} | {:<14.1}%",
        rps,
        mean_ms,
        p99_ms,
        success_rate
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}

/// Many players race for one slot. Exactly one booking may win.
async fn contention_stage(client: &Client, base_url: &str, signer: &Signer, manager: &str, court_id: &str, run_id: &str) {
    println!("\n{}", "=".repeat(60));
    println!("Contention: {} players racing for one slot", CONTENDERS.to_string().cyan().bold());
    println!("{}", "=".repeat(60));

    let mut tokens = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        tokens.push(sync_account(client, base_url, signer, &format!("bench-racer-{}-{}", run_id, i), AccountRole::Customer).await);
    }

    let date = Utc::now().date_naive() + ChronoDuration::days(14);
    let (tx, mut rx) = mpsc::channel(CONTENDERS);
    for token in tokens {
        let client = client.clone();
        let url = format!("{}/api/v1/reservations", base_url);
        let body = json!({
            "court_id": court_id, "date": date, "start_time": "19:00:00", "end_time": "20:00:00", "participants": 10
        });
        let tx = tx.clone();

        tokio::spawn(async move {
            let req_start = Instant::now();
            let status = client.post(&url).bearer_auth(&token).json(&body).send().await
                .map(|r| r.status())
                .ok();
            let _ = tx.send((req_start.elapsed(), status)).await;
        });
    }
    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let (mut created, mut conflicts, mut failed) = (0, 0, 0);
    while let Some((latency, status)) = rx.recv().await {
        histogram.record(latency.as_micros() as u64).unwrap();
        match status {
            Some(StatusCode::CREATED) => created += 1,
            Some(StatusCode::CONFLICT) => conflicts += 1,
            _ => failed += 1,
        }
    }

    println!("Date: {} ({:?})", date, date.weekday());
    println!("Created: {}  Conflicts: {}  Errors: {}", created, conflicts, failed);
    println!("Mean: {:.2} ms  P99: {:.2} ms", histogram.mean() / 1000.0, histogram.value_at_quantile(0.99) as f64 / 1000.0);

    if created == 1 && failed == 0 {
        println!("{}", "✅ Exactly one booking won the slot.".green().bold());
    } else {
        println!("{}", format!("❌ Expected exactly one winner, got {} ({} errors)", created, failed).red().bold());
    }

    let uri = format!("{}/api/v1/courts/{}/reservations?from={}&to={}", base_url, court_id, date, date);
    if let Ok(res) = client.get(uri).bearer_auth(manager).send().await {
        let list: Value = res.json().await.unwrap_or_default();
        println!("Reservations stored for that date: {}", list.as_array().map(|l| l.len()).unwrap_or(0));
    }
}

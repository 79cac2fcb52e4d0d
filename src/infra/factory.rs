use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::PaymentProcessor;
use crate::state::{AppState, Repositories};
use crate::infra::payment::http_payment_processor::HttpPaymentProcessor;
use crate::infra::repositories::{
    postgres_account_repo::PostgresAccountRepo, postgres_blackout_repo::PostgresBlackoutRepo,
    postgres_court_repo::PostgresCourtRepo, postgres_credit_repo::PostgresCreditRepo,
    postgres_payment_repo::PostgresPaymentRepo, postgres_recurring_repo::PostgresRecurringRepo,
    postgres_referral_repo::PostgresReferralRepo, postgres_reservation_repo::PostgresReservationRepo,
    sqlite_account_repo::SqliteAccountRepo, sqlite_blackout_repo::SqliteBlackoutRepo,
    sqlite_court_repo::SqliteCourtRepo, sqlite_credit_repo::SqliteCreditRepo,
    sqlite_payment_repo::SqlitePaymentRepo, sqlite_recurring_repo::SqliteRecurringRepo,
    sqlite_referral_repo::SqliteReferralRepo, sqlite_reservation_repo::SqliteReservationRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let payment_processor: Arc<dyn PaymentProcessor> = Arc::new(HttpPaymentProcessor::new(
        config.payment_service_url.clone(),
        config.payment_service_token.clone(),
    ));

    let repos = connect_repositories(&config.database_url).await;
    AppState::assemble(config.clone(), repos, payment_processor)
}

pub async fn connect_repositories(database_url: &str) -> Repositories {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;
        postgres_repositories(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;
        sqlite_repositories(pool)
    }
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        account_repo: Arc::new(SqliteAccountRepo::new(pool.clone())),
        court_repo: Arc::new(SqliteCourtRepo::new(pool.clone())),
        blackout_repo: Arc::new(SqliteBlackoutRepo::new(pool.clone())),
        reservation_repo: Arc::new(SqliteReservationRepo::new(pool.clone())),
        payment_repo: Arc::new(SqlitePaymentRepo::new(pool.clone())),
        recurring_repo: Arc::new(SqliteRecurringRepo::new(pool.clone())),
        credit_repo: Arc::new(SqliteCreditRepo::new(pool.clone())),
        referral_repo: Arc::new(SqliteReferralRepo::new(pool)),
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        account_repo: Arc::new(PostgresAccountRepo::new(pool.clone())),
        court_repo: Arc::new(PostgresCourtRepo::new(pool.clone())),
        blackout_repo: Arc::new(PostgresBlackoutRepo::new(pool.clone())),
        reservation_repo: Arc::new(PostgresReservationRepo::new(pool.clone())),
        payment_repo: Arc::new(PostgresPaymentRepo::new(pool.clone())),
        recurring_repo: Arc::new(PostgresRecurringRepo::new(pool.clone())),
        credit_repo: Arc::new(PostgresCreditRepo::new(pool.clone())),
        referral_repo: Arc::new(PostgresReferralRepo::new(pool)),
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

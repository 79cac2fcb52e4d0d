pub mod sqlite_account_repo;
pub mod sqlite_court_repo;
pub mod sqlite_blackout_repo;
pub mod sqlite_reservation_repo;
pub mod sqlite_payment_repo;
pub mod sqlite_recurring_repo;
pub mod sqlite_credit_repo;
pub mod sqlite_referral_repo;

pub mod postgres_account_repo;
pub mod postgres_court_repo;
pub mod postgres_blackout_repo;
pub mod postgres_reservation_repo;
pub mod postgres_payment_repo;
pub mod postgres_recurring_repo;
pub mod postgres_credit_repo;
pub mod postgres_referral_repo;

pub mod account;
pub mod availability;
pub mod blackout;
pub mod court;
pub mod credit;
pub mod health;
pub mod payment;
pub mod recurring;
pub mod referral;
pub mod reservation;

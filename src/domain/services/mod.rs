pub mod availability;
pub mod cancellation;
pub mod catalog_cache;
pub mod catalog_service;
pub mod ledger;
pub mod payment_service;
pub mod recurrence;
pub mod referral_service;
pub mod reservation_service;

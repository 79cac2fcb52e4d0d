use std::sync::Arc;
use crate::domain::ports::{
    AccountRepository, BlackoutRepository, CourtRepository, CreditRepository, PaymentProcessor,
    PaymentRepository, RecurringRepository, ReferralRepository, ReservationRepository,
};
use crate::domain::services::{
    availability::AvailabilityService, catalog_cache::CatalogCache, catalog_service::CatalogService, ledger::LedgerService,
    payment_service::PaymentService, recurrence::RecurringService, referral_service::ReferralService,
    reservation_service::ReservationService,
};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub account_repo: Arc<dyn AccountRepository>,
    pub court_repo: Arc<dyn CourtRepository>,
    pub blackout_repo: Arc<dyn BlackoutRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub recurring_repo: Arc<dyn RecurringRepository>,
    pub credit_repo: Arc<dyn CreditRepository>,
    pub referral_repo: Arc<dyn ReferralRepository>,
    pub payment_processor: Arc<dyn PaymentProcessor>,
    pub catalog: Arc<CatalogCache>,
    pub catalog_service: Arc<CatalogService>,
    pub availability_service: Arc<AvailabilityService>,
    pub reservation_service: Arc<ReservationService>,
    pub recurring_service: Arc<RecurringService>,
    pub ledger_service: Arc<LedgerService>,
    pub referral_service: Arc<ReferralService>,
    pub payment_service: Arc<PaymentService>,
}

/// Storage handles for one backend; the services on top are wired the same way for both.
pub struct Repositories {
    pub account_repo: Arc<dyn AccountRepository>,
    pub court_repo: Arc<dyn CourtRepository>,
    pub blackout_repo: Arc<dyn BlackoutRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub recurring_repo: Arc<dyn RecurringRepository>,
    pub credit_repo: Arc<dyn CreditRepository>,
    pub referral_repo: Arc<dyn ReferralRepository>,
}

impl AppState {
    pub fn assemble(config: Config, repos: Repositories, payment_processor: Arc<dyn PaymentProcessor>) -> Self {
        let policy = config.policy.clone();

        let catalog = Arc::new(CatalogCache::new(
            repos.court_repo.clone(),
            repos.blackout_repo.clone(),
            std::time::Duration::from_secs(policy.catalog_cache_ttl_secs),
        ));
        let catalog_service = Arc::new(CatalogService::new(
            repos.court_repo.clone(),
            repos.blackout_repo.clone(),
            repos.reservation_repo.clone(),
            catalog.clone(),
            policy.venue_timezone,
        ));
        let availability_service = Arc::new(AvailabilityService::new(catalog.clone(), repos.reservation_repo.clone()));
        let referral_service = Arc::new(ReferralService::new(
            repos.referral_repo.clone(),
            repos.account_repo.clone(),
            repos.reservation_repo.clone(),
            policy.clone(),
        ));
        let reservation_service = Arc::new(ReservationService::new(
            catalog.clone(),
            repos.reservation_repo.clone(),
            repos.payment_repo.clone(),
            repos.account_repo.clone(),
            payment_processor.clone(),
            referral_service.clone(),
            policy.clone(),
        ));
        let recurring_service = Arc::new(RecurringService::new(
            repos.recurring_repo.clone(),
            repos.reservation_repo.clone(),
            reservation_service.clone(),
            catalog.clone(),
            policy,
        ));
        let ledger_service = Arc::new(LedgerService::new(repos.credit_repo.clone(), repos.account_repo.clone()));
        let payment_service = Arc::new(PaymentService::new(repos.payment_repo.clone(), reservation_service.clone()));

        Self {
            config,
            account_repo: repos.account_repo,
            court_repo: repos.court_repo,
            blackout_repo: repos.blackout_repo,
            reservation_repo: repos.reservation_repo,
            payment_repo: repos.payment_repo,
            recurring_repo: repos.recurring_repo,
            credit_repo: repos.credit_repo,
            referral_repo: repos.referral_repo,
            payment_processor,
            catalog,
            catalog_service,
            availability_service,
            reservation_service,
            recurring_service,
            ledger_service,
            referral_service,
            payment_service,
        }
    }
}

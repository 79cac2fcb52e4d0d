use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::BookingPolicy;
use crate::domain::models::credit::{CreditKind, NewCreditEntry, ReferenceType};
use crate::domain::models::referral::{
    normalize_code, AccountReferralSummary, NewReferralParams, Referral, ReferralAction, ReferralCode,
    ReferralStats, ReferralStatus,
};
use crate::domain::ports::{AccountRepository, ReferralRepository, ReservationRepository};
use crate::error::AppError;

const CODE_ATTEMPTS: usize = 5;
const RECONCILE_BATCH: i64 = 100;

pub struct ReferralService {
    referral_repo: Arc<dyn ReferralRepository>,
    account_repo: Arc<dyn AccountRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    policy: BookingPolicy,
}

impl ReferralService {
    pub fn new(
        referral_repo: Arc<dyn ReferralRepository>,
        account_repo: Arc<dyn AccountRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        policy: BookingPolicy,
    ) -> Self {
        Self { referral_repo, account_repo, reservation_repo, policy }
    }

    /// Returns the account's code, creating one on first call.
    pub async fn issue_code(&self, account_id: &str) -> Result<ReferralCode, AppError> {
        let account = self.account_repo.find_by_id(account_id).await?
            .ok_or(AppError::NotFound("Account not found".into()))?;
        if !account.is_active() {
            return Err(AppError::Forbidden("Inactive accounts cannot issue referral codes".into()));
        }

        if let Some(existing) = self.referral_repo.find_code_by_account(account_id).await? {
            return Ok(existing);
        }

        for attempt in 1..=CODE_ATTEMPTS {
            let code = ReferralCode::new(account_id);
            match self.referral_repo.create_code(&code).await {
                Ok(created) => {
                    info!(account_id = %account_id, "Issued referral code {}", created.code);
                    return Ok(created);
                }
                Err(e) if e.is_conflict() => {
                    // Lost a race for this account's first code, or the random code collided.
                    if let Some(existing) = self.referral_repo.find_code_by_account(account_id).await? {
                        return Ok(existing);
                    }
                    warn!("Referral code collision on attempt {}", attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::InternalWithMsg("Could not generate a unique referral code".into()))
    }

    pub async fn set_code_active(&self, account_id: &str, active: bool) -> Result<ReferralCode, AppError> {
        let code = self.referral_repo.set_code_active(account_id, active).await?
            .ok_or(AppError::NotFound("Referral code not found".into()))?;
        info!(account_id = %account_id, "Referral code {} active={}", code.code, active);
        Ok(code)
    }

    pub async fn redeem(&self, code: &str, account_id: &str) -> Result<Referral, AppError> {
        let code = self.referral_repo.find_code(&normalize_code(code)).await?
            .filter(|c| c.active)
            .ok_or(AppError::NotFound("Referral code not found".into()))?;

        if code.account_id == account_id {
            return Err(AppError::Validation("Cannot redeem your own referral code".into()));
        }

        if self.referral_repo.find_open_for_referred(account_id).await?.is_some() {
            return Err(AppError::AlreadyRedeemed);
        }

        if self.reservation_repo.has_confirmed_for_organizer(account_id).await? {
            return Err(AppError::Validation("Referral codes are for new players only".into()));
        }

        let referral = Referral::new(NewReferralParams {
            code: &code,
            referred_id: account_id,
            referrer_credit_cents: self.policy.referrer_bonus_cents,
            referred_credit_cents: self.policy.referred_bonus_cents,
            expiry_days: self.policy.referral_expiry_days,
        });

        let created = match self.referral_repo.redeem(&referral).await {
            Ok(created) => created,
            Err(e) if e.is_conflict() => return Err(AppError::AlreadyRedeemed),
            Err(e) => return Err(e),
        };

        info!(referral_id = %created.id, referrer_id = %created.referrer_id, "Referral code {} redeemed by {}", code.code, account_id);
        Ok(created)
    }

    /// Qualifying event: the account had a reservation confirmed. Accepts its
    /// pending referral, if any, granting both bonuses.
    pub async fn on_confirmed(&self, account_id: &str) -> Result<Option<Referral>, AppError> {
        let Some(referral) = self.referral_repo.find_open_for_referred(account_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if referral.status != ReferralStatus::Pending || referral.is_expired_at(now) {
            return Ok(None);
        }
        referral.status.apply(ReferralAction::Accept)?;

        let bonuses: Vec<NewCreditEntry> = [
            (referral.referrer_id.as_str(), referral.referrer_credit_cents, "Referral bonus"),
            (account_id, referral.referred_credit_cents, "Welcome bonus"),
        ]
        .into_iter()
        .filter(|(_, amount, _)| *amount > 0)
        .map(|(owner, amount, label)| {
            NewCreditEntry::new(owner, amount, CreditKind::ReferralBonus, label)
                .referencing(ReferenceType::Referral, &referral.id)
        })
        .collect();

        let accepted = self.referral_repo.accept(&referral.id, &bonuses, now).await?;
        if let Some(accepted) = &accepted {
            info!(
                referral_id = %accepted.id,
                referrer_id = %accepted.referrer_id,
                "Referral accepted on first confirmation of {}", account_id
            );
        }
        Ok(accepted)
    }

    /// Accepts pending referrals whose qualifying confirmation happened without
    /// the hook landing. Returns how many were accepted.
    pub async fn reconcile_qualified(&self) -> Result<usize, AppError> {
        let qualified = self.referral_repo.list_pending_qualified(Utc::now(), RECONCILE_BATCH).await?;
        let mut accepted = 0;
        for referral in qualified {
            match self.on_confirmed(referral.referred_id.as_deref().unwrap_or_default()).await {
                Ok(Some(_)) => accepted += 1,
                Ok(None) => {}
                Err(e) => warn!(referral_id = %referral.id, "Referral reconciliation failed: {}", e),
            }
        }
        if accepted > 0 {
            info!("Reconciled {} qualified referrals", accepted);
        }
        Ok(accepted)
    }

    pub async fn expire_stale(&self) -> Result<u64, AppError> {
        let expired = self.referral_repo.expire_stale(Utc::now()).await?;
        if expired > 0 {
            info!("Expired {} stale referrals", expired);
        }
        Ok(expired)
    }

    pub async fn summary(&self, account_id: &str) -> Result<AccountReferralSummary, AppError> {
        Ok(AccountReferralSummary {
            code: self.referral_repo.find_code_by_account(account_id).await?,
            referrals: self.referral_repo.list_by_referrer(account_id).await?,
            redeemed: self.referral_repo.find_open_for_referred(account_id).await?,
        })
    }

    pub async fn stats_for(&self, account_id: &str) -> Result<ReferralStats, AppError> {
        self.referral_repo.stats_for_referrer(account_id).await
    }

    pub async fn stats(&self) -> Result<ReferralStats, AppError> {
        self.referral_repo.stats().await
    }
}

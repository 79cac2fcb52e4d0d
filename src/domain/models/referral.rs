use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Uniform, Rng};
use sqlx::FromRow;

use super::text_enum;
use crate::error::AppError;

pub const CODE_LENGTH: usize = 8;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

text_enum!(ReferralStatus {
    Pending => "pending",
    Accepted => "accepted",
    Expired => "expired",
});

text_enum!(ReferralAction {
    Accept => "accept",
    Expire => "expire",
});

impl ReferralStatus {
    pub fn apply(self, action: ReferralAction) -> Result<ReferralStatus, AppError> {
        match (self, action) {
            (ReferralStatus::Pending, ReferralAction::Accept) => Ok(ReferralStatus::Accepted),
            (ReferralStatus::Pending, ReferralAction::Expire) => Ok(ReferralStatus::Expired),
            (from, action) => Err(AppError::InvalidTransition {
                entity: "referral",
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }
}

pub fn generate_code() -> String {
    let dist = Uniform::from(0..CODE_ALPHABET.len());
    rand::thread_rng()
        .sample_iter(dist)
        .take(CODE_LENGTH)
        .map(|i| CODE_ALPHABET[i] as char)
        .collect()
}

/// Codes are matched case-insensitively; stored upper case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ReferralCode {
    pub id: String,
    pub account_id: String,
    pub code: String,
    pub active: bool,
    pub times_redeemed: i64,
    pub credits_issued_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl ReferralCode {
    pub fn new(account_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            code: generate_code(),
            active: true,
            times_redeemed: 0,
            credits_issued_cents: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Referral {
    pub id: String,
    pub code_id: String,
    pub referrer_id: String,
    pub referred_id: Option<String>,
    pub status: ReferralStatus,
    pub referrer_credit_cents: i64,
    pub referred_credit_cents: i64,
    pub created_at: DateTime<Utc>,
    pub first_used_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

pub struct NewReferralParams<'a> {
    pub code: &'a ReferralCode,
    pub referred_id: &'a str,
    pub referrer_credit_cents: i64,
    pub referred_credit_cents: i64,
    pub expiry_days: i64,
}

impl Referral {
    pub fn new(params: NewReferralParams<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            code_id: params.code.id.clone(),
            referrer_id: params.code.account_id.clone(),
            referred_id: Some(params.referred_id.to_string()),
            status: ReferralStatus::Pending,
            referrer_credit_cents: params.referrer_credit_cents,
            referred_credit_cents: params.referred_credit_cents,
            created_at: now,
            first_used_at: Some(now),
            accepted_at: None,
            expires_at: now + Duration::days(params.expiry_days),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReferralStatus::Pending && self.expires_at <= now
    }
}

#[derive(Debug, Default, Serialize, FromRow)]
pub struct ReferralStats {
    pub codes_issued: i64,
    pub active_codes: i64,
    pub redemptions: i64,
    pub pending: i64,
    pub accepted: i64,
    pub expired: i64,
    pub credits_issued_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct AccountReferralSummary {
    pub code: Option<ReferralCode>,
    pub referrals: Vec<Referral>,
    pub redeemed: Option<Referral>,
}

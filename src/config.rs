use std::env;
use std::str::FromStr;
use chrono_tz::Tz;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub payment_service_url: String,
    pub payment_service_token: String,
    pub jwt_public_key: String, // Identity provider public key (Ed25519 PEM)
    pub auth_issuer: String,
    pub auth_audience: String,
    pub policy: BookingPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let policy = BookingPolicy::from_env();
        if let Err(msg) = policy.validate() {
            panic!("Invalid booking policy: {}", msg);
        }

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            payment_service_url: env::var("PAYMENT_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8100/api/v1/charges".to_string()),
            payment_service_token: env::var("PAYMENT_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            jwt_public_key: env::var("JWT_PUBLIC_KEY").expect("JWT_PUBLIC_KEY must be set (Ed25519 Public Key)"),
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://auth.courts.local".to_string()),
            auth_audience: env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "court-booking".to_string()),
            policy,
        }
    }
}

/// Business knobs handed to the services. Tests build their own instead of touching the environment.
#[derive(Clone, Debug)]
pub struct BookingPolicy {
    pub venue_timezone: Tz,
    pub full_refund_hours: i64,
    pub zero_refund_hours: i64,
    pub late_cancellation_penalty_percent: i64,
    pub recurring_horizon_days: i64,
    pub recurring_checkpoint_hours: i64,
    pub default_recurring_discount_percent: i64,
    pub referrer_bonus_cents: i64,
    pub referred_bonus_cents: i64,
    pub referral_expiry_days: i64,
    pub pending_hold_minutes: Option<i64>,
    pub catalog_cache_ttl_secs: u64,
    pub worker_interval_secs: u64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            venue_timezone: chrono_tz::America::Sao_Paulo,
            full_refund_hours: 24,
            zero_refund_hours: 2,
            late_cancellation_penalty_percent: 50,
            recurring_horizon_days: 30,
            recurring_checkpoint_hours: 24,
            default_recurring_discount_percent: 10,
            referrer_bonus_cents: 2000,
            referred_bonus_cents: 1000,
            referral_expiry_days: 30,
            pending_hold_minutes: None,
            catalog_cache_ttl_secs: 30,
            worker_interval_secs: 60,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| panic!("{} has an invalid value: {}", key, raw)),
        Err(_) => default,
    }
}

impl BookingPolicy {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            venue_timezone: env_or("VENUE_TIMEZONE", d.venue_timezone),
            full_refund_hours: env_or("FULL_REFUND_HOURS", d.full_refund_hours),
            zero_refund_hours: env_or("ZERO_REFUND_HOURS", d.zero_refund_hours),
            late_cancellation_penalty_percent: env_or("LATE_CANCELLATION_PENALTY_PERCENT", d.late_cancellation_penalty_percent),
            recurring_horizon_days: env_or("RECURRING_HORIZON_DAYS", d.recurring_horizon_days),
            recurring_checkpoint_hours: env_or("RECURRING_CHECKPOINT_HOURS", d.recurring_checkpoint_hours),
            default_recurring_discount_percent: env_or("DEFAULT_RECURRING_DISCOUNT_PERCENT", d.default_recurring_discount_percent),
            referrer_bonus_cents: env_or("REFERRER_BONUS_CENTS", d.referrer_bonus_cents),
            referred_bonus_cents: env_or("REFERRED_BONUS_CENTS", d.referred_bonus_cents),
            referral_expiry_days: env_or("REFERRAL_EXPIRY_DAYS", d.referral_expiry_days),
            pending_hold_minutes: env::var("PENDING_HOLD_MINUTES").ok().map(|raw| {
                raw.parse().unwrap_or_else(|_| panic!("PENDING_HOLD_MINUTES has an invalid value: {}", raw))
            }),
            catalog_cache_ttl_secs: env_or("CATALOG_CACHE_TTL_SECS", d.catalog_cache_ttl_secs),
            worker_interval_secs: env_or("WORKER_INTERVAL_SECS", d.worker_interval_secs),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.zero_refund_hours < 0 || self.full_refund_hours < 0 {
            return Err("refund thresholds must not be negative".into());
        }
        if self.zero_refund_hours > self.full_refund_hours {
            return Err("ZERO_REFUND_HOURS must not exceed FULL_REFUND_HOURS".into());
        }
        for (name, value) in [
            ("LATE_CANCELLATION_PENALTY_PERCENT", self.late_cancellation_penalty_percent),
            ("DEFAULT_RECURRING_DISCOUNT_PERCENT", self.default_recurring_discount_percent),
        ] {
            if !(0..=100).contains(&value) {
                return Err(format!("{} must be between 0 and 100", name));
            }
        }
        if self.recurring_horizon_days < 1 || self.recurring_checkpoint_hours < 1 {
            return Err("recurring horizon and checkpoint must be positive".into());
        }
        if self.referrer_bonus_cents < 0 || self.referred_bonus_cents < 0 {
            return Err("referral bonuses must not be negative".into());
        }
        if self.pending_hold_minutes.is_some_and(|m| m < 1) {
            return Err("PENDING_HOLD_MINUTES must be positive when set".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(BookingPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_refund_windows() {
        let policy = BookingPolicy { zero_refund_hours: 48, ..BookingPolicy::default() };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_percentages() {
        let policy = BookingPolicy { late_cancellation_penalty_percent: 120, ..BookingPolicy::default() };
        assert!(policy.validate().is_err());
        let policy = BookingPolicy { default_recurring_discount_percent: -1, ..BookingPolicy::default() };
        assert!(policy.validate().is_err());
    }
}

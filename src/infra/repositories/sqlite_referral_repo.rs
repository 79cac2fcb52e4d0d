use crate::domain::models::{
    credit::NewCreditEntry,
    referral::{Referral, ReferralCode, ReferralStats},
};
use crate::domain::ports::ReferralRepository;
use crate::error::AppError;
use crate::infra::repositories::sqlite_credit_repo::append_entry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteReferralRepo {
    pool: SqlitePool,
}

impl SqliteReferralRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const STATS_COLUMNS: &str =
    "COUNT(r.id) AS redemptions,
     COALESCE(SUM(CASE WHEN r.status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
     COALESCE(SUM(CASE WHEN r.status = 'accepted' THEN 1 ELSE 0 END), 0) AS accepted,
     COALESCE(SUM(CASE WHEN r.status = 'expired' THEN 1 ELSE 0 END), 0) AS expired";

#[async_trait]
impl ReferralRepository for SqliteReferralRepo {
    async fn create_code(&self, code: &ReferralCode) -> Result<ReferralCode, AppError> {
        sqlx::query_as::<_, ReferralCode>(
            "INSERT INTO referral_codes (id, account_id, code, active, times_redeemed, credits_issued_cents, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&code.id).bind(&code.account_id).bind(&code.code).bind(code.active)
            .bind(code.times_redeemed).bind(code.credits_issued_cents).bind(code.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_code_by_account(&self, account_id: &str) -> Result<Option<ReferralCode>, AppError> {
        sqlx::query_as::<_, ReferralCode>("SELECT * FROM referral_codes WHERE account_id = ?").bind(account_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>, AppError> {
        sqlx::query_as::<_, ReferralCode>("SELECT * FROM referral_codes WHERE code = ?").bind(code).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn set_code_active(&self, account_id: &str, active: bool) -> Result<Option<ReferralCode>, AppError> {
        sqlx::query_as::<_, ReferralCode>("UPDATE referral_codes SET active = ? WHERE account_id = ? RETURNING *")
            .bind(active).bind(account_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn redeem(&self, referral: &Referral) -> Result<Referral, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, Referral>(
            "INSERT INTO referrals (id, code_id, referrer_id, referred_id, status, referrer_credit_cents, referred_credit_cents, created_at, first_used_at, accepted_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&referral.id).bind(&referral.code_id).bind(&referral.referrer_id).bind(&referral.referred_id)
            .bind(referral.status.as_str()).bind(referral.referrer_credit_cents).bind(referral.referred_credit_cents)
            .bind(referral.created_at).bind(referral.first_used_at).bind(referral.accepted_at).bind(referral.expires_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        sqlx::query("UPDATE referral_codes SET times_redeemed = times_redeemed + 1 WHERE id = ?")
            .bind(&referral.code_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_open_for_referred(&self, referred_id: &str) -> Result<Option<Referral>, AppError> {
        sqlx::query_as::<_, Referral>("SELECT * FROM referrals WHERE referred_id = ? AND status <> 'expired'")
            .bind(referred_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>, AppError> {
        sqlx::query_as::<_, Referral>("SELECT * FROM referrals WHERE referrer_id = ? ORDER BY created_at DESC")
            .bind(referrer_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn accept(&self, referral_id: &str, bonuses: &[NewCreditEntry], at: DateTime<Utc>) -> Result<Option<Referral>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let accepted = sqlx::query_as::<_, Referral>(
            "UPDATE referrals SET status = 'accepted', accepted_at = ?
             WHERE id = ? AND status = 'pending' AND expires_at > ?
             RETURNING *"
        )
            .bind(at).bind(referral_id).bind(at)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;

        let Some(accepted) = accepted else {
            return Ok(None);
        };

        let mut issued = 0;
        for bonus in bonuses {
            append_entry(&mut *tx, bonus).await?;
            issued += bonus.amount_cents;
        }

        sqlx::query("UPDATE referral_codes SET credits_issued_cents = credits_issued_cents + ? WHERE id = ?")
            .bind(issued).bind(&accepted.code_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(accepted))
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE referrals SET status = 'expired' WHERE status = 'pending' AND expires_at <= ?")
            .bind(now)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    async fn list_pending_qualified(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Referral>, AppError> {
        sqlx::query_as::<_, Referral>(
            "SELECT f.* FROM referrals f
             WHERE f.status = 'pending' AND f.expires_at > ?
             AND EXISTS (SELECT 1 FROM reservations r WHERE r.organizer_id = f.referred_id AND r.confirmed_at >= f.created_at)
             ORDER BY f.created_at ASC LIMIT ?"
        )
            .bind(now).bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn stats_for_referrer(&self, referrer_id: &str) -> Result<ReferralStats, AppError> {
        let sql = format!(
            "SELECT
                (SELECT COUNT(*) FROM referral_codes WHERE account_id = ?) AS codes_issued,
                (SELECT COUNT(*) FROM referral_codes WHERE account_id = ? AND active = 1) AS active_codes,
                (SELECT COALESCE(SUM(credits_issued_cents), 0) FROM referral_codes WHERE account_id = ?) AS credits_issued_cents,
                {}
             FROM referrals r WHERE r.referrer_id = ?",
            STATS_COLUMNS
        );
        sqlx::query_as::<_, ReferralStats>(&sql)
            .bind(referrer_id).bind(referrer_id).bind(referrer_id).bind(referrer_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn stats(&self) -> Result<ReferralStats, AppError> {
        let sql = format!(
            "SELECT
                (SELECT COUNT(*) FROM referral_codes) AS codes_issued,
                (SELECT COUNT(*) FROM referral_codes WHERE active = 1) AS active_codes,
                (SELECT COALESCE(SUM(credits_issued_cents), 0) FROM referral_codes) AS credits_issued_cents,
                {}
             FROM referrals r",
            STATS_COLUMNS
        );
        sqlx::query_as::<_, ReferralStats>(&sql)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}

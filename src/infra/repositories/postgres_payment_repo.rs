use crate::domain::models::{
    credit::{CreditKind, NewCreditEntry, ReferenceType},
    payment::Payment,
    reservation::{Reservation, ReservationStatus},
};
use crate::domain::ports::{PaymentRepository, SettlementResult};
use crate::error::AppError;
use crate::infra::repositories::postgres_credit_repo::append_entry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

pub struct PostgresPaymentRepo {
    pool: PgPool,
}

impl PostgresPaymentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepo {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>("INSERT INTO payments (id, reservation_id, request_id, amount_cents, status, provider_reference, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *")
            .bind(&payment.id).bind(&payment.reservation_id).bind(&payment.request_id).bind(payment.amount_cents).bind(payment.status.as_str()).bind(&payment.provider_reference).bind(payment.created_at).bind(payment.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE request_id = $1").bind(request_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_reservation(&self, reservation_id: &str) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reservation_id = $1 ORDER BY created_at ASC").bind(reservation_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn settle(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<SettlementResult>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let payment = sqlx::query_as::<_, Payment>("UPDATE payments SET status = 'settled', provider_reference = COALESCE($1, provider_reference), updated_at = $2 WHERE request_id = $3 AND status = 'requested' RETURNING *")
            .bind(provider_reference).bind(at).bind(request_id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        let Some(payment) = payment else {
            return Ok(None);
        };

        let mut reservation = sqlx::query_as::<_, Reservation>("UPDATE reservations SET paid_cents = paid_cents + $1 WHERE id = $2 RETURNING *")
            .bind(payment.amount_cents).bind(&payment.reservation_id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        let mut confirmed = false;
        let mut refunded_late = false;

        match reservation.status {
            ReservationStatus::Pending if reservation.paid_cents >= reservation.payable_cents() => {
                reservation = sqlx::query_as::<_, Reservation>("UPDATE reservations SET status = 'confirmed', confirmed_at = $1 WHERE id = $2 AND status = 'pending' RETURNING *")
                    .bind(at).bind(&reservation.id)
                    .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
                confirmed = true;
            }
            ReservationStatus::Cancelled => {
                let entry = NewCreditEntry::new(&reservation.organizer_id, payment.amount_cents, CreditKind::Refund, "Payment settled after cancellation")
                    .referencing(ReferenceType::Payment, &payment.id);
                append_entry(&mut *tx, &entry).await?;
                reservation = sqlx::query_as::<_, Reservation>("UPDATE reservations SET refunded_cents = refunded_cents + $1 WHERE id = $2 RETURNING *")
                    .bind(payment.amount_cents).bind(&reservation.id)
                    .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
                refunded_late = true;
            }
            _ => {}
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(SettlementResult { payment, reservation, confirmed, refunded_late }))
    }
    async fn fail(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("UPDATE payments SET status = 'failed', provider_reference = COALESCE($1, provider_reference), updated_at = $2 WHERE request_id = $3 AND status = 'requested' RETURNING *")
            .bind(provider_reference).bind(at).bind(request_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn refund(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<Payment>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let payment = sqlx::query_as::<_, Payment>("UPDATE payments SET status = 'refunded', provider_reference = COALESCE($1, provider_reference), updated_at = $2 WHERE request_id = $3 AND status = 'settled' RETURNING *")
            .bind(provider_reference).bind(at).bind(request_id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        let Some(payment) = payment else {
            return Ok(None);
        };
        let reservation = sqlx::query_as::<_, Reservation>("UPDATE reservations SET paid_cents = paid_cents - $1 WHERE id = $2 RETURNING *").bind(payment.amount_cents).bind(&payment.reservation_id).fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if reservation.status == ReservationStatus::Cancelled && reservation.refunded_cents > 0 {
            let owed = payment.amount_cents.min(reservation.refunded_cents);
            let balance = sqlx::query_scalar::<_, i64>("SELECT credit_balance_cents FROM accounts WHERE id = $1 FOR UPDATE").bind(&reservation.organizer_id).fetch_one(&mut *tx).await.map_err(AppError::Database)?;
            let clawback = owed.min(balance.max(0));
            if clawback < owed {
                warn!(reservation_id = %reservation.id, payment_id = %payment.id, shortfall_cents = owed - clawback, "Refund credit already spent; reversal capped at the remaining balance");
            }
            if clawback > 0 {
                let entry = NewCreditEntry::new(&reservation.organizer_id, -clawback, CreditKind::RefundReversal, "Payment refunded by processor").referencing(ReferenceType::Payment, &payment.id);
                append_entry(&mut *tx, &entry).await?;
                sqlx::query("UPDATE reservations SET refunded_cents = refunded_cents - $1 WHERE id = $2").bind(clawback).bind(&reservation.id).execute(&mut *tx).await.map_err(AppError::Database)?;
            }
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(payment))
    }
}

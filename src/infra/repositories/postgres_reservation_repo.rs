use crate::domain::models::{
    availability::Unavailability, blackout::Blackout, credit::NewCreditEntry, reservation::Reservation,
};
use crate::domain::ports::ReservationRepository;
use crate::domain::services::availability::blackout_rule;
use crate::error::{is_unique_violation, AppError};
use crate::infra::repositories::postgres_credit_repo::append_entry;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

pub struct PostgresReservationRepo {
    pool: PgPool,
}

impl PostgresReservationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conflict_for(&self, reservation: &Reservation) -> Result<AppError, AppError> {
        let existing = self
            .find_active_in_window(&reservation.court_id, reservation.date, reservation.start_time, reservation.end_time)
            .await?;
        Ok(match existing {
            Some(taken) => AppError::SlotUnavailable(Unavailability::TakenByReservation { reservation_id: taken.id }),
            None => AppError::Conflict("Reservation already exists for this template date".into()),
        })
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepo {
    async fn create(&self, reservation: &Reservation, offset: Option<&NewCreditEntry>) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // A second writer on the same slot blocks on the partial unique index until the first one commits.
        let inserted = sqlx::query_as::<_, Reservation>("INSERT INTO reservations (id, court_id, slot_id, date, start_time, end_time, organizer_id, participants, total_cents, credit_applied_cents, paid_cents, refunded_cents, status, kind, template_id, confirmed_at, cancelled_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING *")
            .bind(&reservation.id).bind(&reservation.court_id).bind(&reservation.slot_id).bind(reservation.date).bind(reservation.start_time).bind(reservation.end_time)
            .bind(&reservation.organizer_id).bind(reservation.participants).bind(reservation.total_cents).bind(reservation.credit_applied_cents).bind(reservation.paid_cents)
            .bind(reservation.refunded_cents).bind(reservation.status.as_str()).bind(reservation.kind.as_str()).bind(&reservation.template_id)
            .bind(reservation.confirmed_at).bind(reservation.cancelled_at).bind(reservation.created_at)
            .fetch_one(&mut *tx).await;

        let created = match inserted {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.map_err(AppError::Database)?;
                return Err(self.conflict_for(reservation).await?);
            }
            Err(e) => return Err(AppError::Database(e)),
        };

        let overlapping = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE court_id = $1 AND date = $2 AND id <> $3 AND status <> 'cancelled' AND start_time < $4 AND end_time > $5 LIMIT 1")
            .bind(&created.court_id).bind(created.date).bind(&created.id).bind(created.end_time).bind(created.start_time)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        if let Some(taken) = overlapping {
            return Err(AppError::SlotUnavailable(Unavailability::TakenByReservation { reservation_id: taken.id }));
        }

        // Blackout creation takes this row FOR UPDATE, so the re-read below cannot miss a committed blackout.
        sqlx::query("SELECT id FROM courts WHERE id = $1 FOR SHARE")
            .bind(&created.court_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let blackouts = sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE court_id = $1 AND start_date <= $2 AND end_date >= $2")
            .bind(&created.court_id).bind(created.date)
            .fetch_all(&mut *tx).await.map_err(AppError::Database)?;
        if let Some(blocked) = blackout_rule(&blackouts, created.date, created.start_time, created.end_time) {
            return Err(AppError::SlotUnavailable(blocked));
        }

        if let Some(entry) = offset {
            append_entry(&mut *tx, entry).await?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_active_in_window(&self, court_id: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE court_id = $1 AND date = $2 AND status <> 'cancelled' AND start_time < $3 AND end_time > $4 ORDER BY created_at ASC LIMIT 1").bind(court_id).bind(date).bind(end).bind(start).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn has_live_for_slot_from(&self, slot_id: &str, from: NaiveDate) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM reservations WHERE slot_id = $1 AND date >= $2 AND status <> 'cancelled')").bind(slot_id).bind(from).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn has_confirmed_for_organizer(&self, organizer_id: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM reservations WHERE organizer_id = $1 AND confirmed_at IS NOT NULL)").bind(organizer_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_active_in_range(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE court_id = $1 AND date >= $2 AND date <= $3 AND status <> 'cancelled'").bind(court_id).bind(from).bind(to).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_court(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE court_id = $1 AND date >= $2 AND date <= $3 ORDER BY date ASC, start_time ASC").bind(court_id).bind(from).bind(to).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE organizer_id = $1 ORDER BY date DESC, start_time DESC").bind(organizer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_template_dates(&self, template_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, AppError> {
        sqlx::query_scalar::<_, NaiveDate>("SELECT date FROM reservations WHERE template_id = $1 AND date >= $2 AND date <= $3").bind(template_id).bind(from).bind(to).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_stale_pending(&self, created_before: DateTime<Utc>, limit: i64) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE status = 'pending' AND paid_cents = 0 AND created_at <= $1 ORDER BY created_at ASC LIMIT $2").bind(created_before).bind(limit).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn confirm(&self, id: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("UPDATE reservations SET status = 'confirmed', confirmed_at = $1 WHERE id = $2 AND status = 'pending' RETURNING *").bind(at).bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn cancel(&self, snapshot: &Reservation, refunded_cents: i64, refund: Option<&NewCreditEntry>, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let cancelled = sqlx::query_as::<_, Reservation>("UPDATE reservations SET status = 'cancelled', cancelled_at = $1, refunded_cents = refunded_cents + $2 WHERE id = $3 AND status = $4 AND paid_cents = $5 RETURNING *")
            .bind(at).bind(refunded_cents).bind(&snapshot.id).bind(snapshot.status.as_str()).bind(snapshot.paid_cents)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        let Some(cancelled) = cancelled else {
            return Ok(None);
        };
        if let Some(entry) = refund {
            append_entry(&mut *tx, entry).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(cancelled))
    }
    async fn delete_unpaid_pending(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        sqlx::query("DELETE FROM payments WHERE reservation_id = $1 AND status IN ('requested', 'failed') AND NOT EXISTS (SELECT 1 FROM payments p WHERE p.reservation_id = $1 AND p.status IN ('settled', 'refunded'))")
            .bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1 AND status = 'pending' AND paid_cents = 0 AND credit_applied_cents = 0 AND NOT EXISTS (SELECT 1 FROM payments WHERE reservation_id = $1)")
            .bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Ok(false); }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }
}

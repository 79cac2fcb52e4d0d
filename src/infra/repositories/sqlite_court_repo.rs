use crate::domain::{models::{court::Court, schedule::ScheduleSlot}, ports::CourtRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteCourtRepo {
    pool: SqlitePool,
}

impl SqliteCourtRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourtRepository for SqliteCourtRepo {
    async fn create(&self, court: &Court) -> Result<Court, AppError> {
        sqlx::query_as::<_, Court>(
            "INSERT INTO courts (id, name, modality, max_occupancy, status, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&court.id).bind(&court.name).bind(&court.modality).bind(court.max_occupancy)
            .bind(court.status.as_str()).bind(&court.description).bind(court.created_at).bind(court.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Court>, AppError> {
        sqlx::query_as::<_, Court>("SELECT * FROM courts WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Court>, AppError> {
        sqlx::query_as::<_, Court>("SELECT * FROM courts ORDER BY name ASC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, court: &Court) -> Result<Court, AppError> {
        sqlx::query_as::<_, Court>(
            "UPDATE courts SET name = ?, modality = ?, max_occupancy = ?, status = ?, description = ?, updated_at = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(&court.name).bind(&court.modality).bind(court.max_occupancy).bind(court.status.as_str())
            .bind(&court.description).bind(court.updated_at).bind(&court.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Court not found".into()))
    }

    async fn create_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError> {
        sqlx::query_as::<_, ScheduleSlot>(
            "INSERT INTO schedule_slots (id, court_id, weekday, start_time, end_time, casual_price_cents, subscriber_price_cents, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&slot.id).bind(&slot.court_id).bind(slot.weekday).bind(slot.start_time).bind(slot.end_time)
            .bind(slot.casual_price_cents).bind(slot.subscriber_price_cents).bind(slot.active).bind(slot.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_slot(&self, id: &str) -> Result<Option<ScheduleSlot>, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("SELECT * FROM schedule_slots WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_slots(&self, court_id: &str) -> Result<Vec<ScheduleSlot>, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("SELECT * FROM schedule_slots WHERE court_id = ? ORDER BY weekday ASC, start_time ASC")
            .bind(court_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError> {
        sqlx::query_as::<_, ScheduleSlot>(
            "UPDATE schedule_slots SET weekday = ?, start_time = ?, end_time = ?, casual_price_cents = ?, subscriber_price_cents = ?, active = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(slot.weekday).bind(slot.start_time).bind(slot.end_time).bind(slot.casual_price_cents)
            .bind(slot.subscriber_price_cents).bind(slot.active).bind(&slot.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Schedule slot not found".into()))
    }
}

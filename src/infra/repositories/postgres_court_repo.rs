use crate::domain::{models::{court::Court, schedule::ScheduleSlot}, ports::CourtRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCourtRepo {
    pool: PgPool,
}

impl PostgresCourtRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourtRepository for PostgresCourtRepo {
    async fn create(&self, court: &Court) -> Result<Court, AppError> {
        sqlx::query_as::<_, Court>("INSERT INTO courts (id, name, modality, max_occupancy, status, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *")
            .bind(&court.id).bind(&court.name).bind(&court.modality).bind(court.max_occupancy).bind(court.status.as_str()).bind(&court.description).bind(court.created_at).bind(court.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Court>, AppError> {
        sqlx::query_as::<_, Court>("SELECT * FROM courts WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list(&self) -> Result<Vec<Court>, AppError> {
        sqlx::query_as::<_, Court>("SELECT * FROM courts ORDER BY name ASC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn update(&self, court: &Court) -> Result<Court, AppError> {
        sqlx::query_as::<_, Court>("UPDATE courts SET name = $1, modality = $2, max_occupancy = $3, status = $4, description = $5, updated_at = $6 WHERE id = $7 RETURNING *")
            .bind(&court.name).bind(&court.modality).bind(court.max_occupancy).bind(court.status.as_str()).bind(&court.description).bind(court.updated_at).bind(&court.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Court not found".into()))
    }
    async fn create_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("INSERT INTO schedule_slots (id, court_id, weekday, start_time, end_time, casual_price_cents, subscriber_price_cents, active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *")
            .bind(&slot.id).bind(&slot.court_id).bind(slot.weekday).bind(slot.start_time).bind(slot.end_time).bind(slot.casual_price_cents).bind(slot.subscriber_price_cents).bind(slot.active).bind(slot.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_slot(&self, id: &str) -> Result<Option<ScheduleSlot>, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("SELECT * FROM schedule_slots WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_slots(&self, court_id: &str) -> Result<Vec<ScheduleSlot>, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("SELECT * FROM schedule_slots WHERE court_id = $1 ORDER BY weekday ASC, start_time ASC").bind(court_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn update_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError> {
        sqlx::query_as::<_, ScheduleSlot>("UPDATE schedule_slots SET weekday = $1, start_time = $2, end_time = $3, casual_price_cents = $4, subscriber_price_cents = $5, active = $6 WHERE id = $7 RETURNING *")
            .bind(slot.weekday).bind(slot.start_time).bind(slot.end_time).bind(slot.casual_price_cents).bind(slot.subscriber_price_cents).bind(slot.active).bind(&slot.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Schedule slot not found".into()))
    }
}

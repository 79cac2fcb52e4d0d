use crate::domain::{models::blackout::Blackout, ports::BlackoutRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

pub struct SqliteBlackoutRepo {
    pool: SqlitePool,
}

impl SqliteBlackoutRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlackoutRepository for SqliteBlackoutRepo {
    async fn create(&self, blackout: &Blackout) -> Result<Blackout, AppError> {
        sqlx::query_as::<_, Blackout>(
            "INSERT INTO blackouts (id, court_id, start_date, end_date, start_time, end_time, reason, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&blackout.id).bind(&blackout.court_id).bind(blackout.start_date).bind(blackout.end_date)
            .bind(blackout.start_time).bind(blackout.end_time).bind(&blackout.reason).bind(&blackout.created_by)
            .bind(blackout.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_court(&self, court_id: &str) -> Result<Vec<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE court_id = ? ORDER BY start_date ASC")
            .bind(court_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_overlapping(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE court_id = ? AND start_date <= ? AND end_date >= ? ORDER BY start_date ASC")
            .bind(court_id).bind(to).bind(from)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blackouts WHERE id = ?").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Blackout not found".into())); }
        Ok(())
    }
}

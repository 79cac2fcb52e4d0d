use crate::domain::{models::blackout::Blackout, ports::BlackoutRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

pub struct PostgresBlackoutRepo {
    pool: PgPool,
}

impl PostgresBlackoutRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlackoutRepository for PostgresBlackoutRepo {
    async fn create(&self, blackout: &Blackout) -> Result<Blackout, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Waits for in-flight reservation inserts on the court, which hold it FOR SHARE.
        sqlx::query("SELECT id FROM courts WHERE id = $1 FOR UPDATE")
            .bind(&blackout.court_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, Blackout>("INSERT INTO blackouts (id, court_id, start_date, end_date, start_time, end_time, reason, created_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *")
            .bind(&blackout.id).bind(&blackout.court_id).bind(blackout.start_date).bind(blackout.end_date).bind(blackout.start_time).bind(blackout.end_time).bind(&blackout.reason).bind(&blackout.created_by).bind(blackout.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_court(&self, court_id: &str) -> Result<Vec<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE court_id = $1 ORDER BY start_date ASC").bind(court_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_overlapping(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Blackout>, AppError> {
        sqlx::query_as::<_, Blackout>("SELECT * FROM blackouts WHERE court_id = $1 AND start_date <= $2 AND end_date >= $3 ORDER BY start_date ASC").bind(court_id).bind(to).bind(from).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blackouts WHERE id = $1").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Blackout not found".into())); }
        Ok(())
    }
}

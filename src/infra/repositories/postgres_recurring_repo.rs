use crate::domain::models::recurring::{CheckpointUpdate, RecurringGap, RecurringTemplate, TemplateStatus};
use crate::domain::ports::RecurringRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresRecurringRepo {
    pool: PgPool,
}

impl PostgresRecurringRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecurringRepository for PostgresRecurringRepo {
    async fn create(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("INSERT INTO recurring_templates (id, court_id, organizer_id, recurrence, weekdays, day_of_month, start_time, end_time, participants, price_cents, discount_percent, starts_on, ends_on, generated_through, instances_generated, next_generation_at, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING *")
            .bind(&template.id).bind(&template.court_id).bind(&template.organizer_id).bind(template.recurrence.as_str()).bind(template.weekdays).bind(template.day_of_month)
            .bind(template.start_time).bind(template.end_time).bind(template.participants).bind(template.price_cents).bind(template.discount_percent)
            .bind(template.starts_on).bind(template.ends_on).bind(template.generated_through).bind(template.instances_generated).bind(template.next_generation_at)
            .bind(template.status.as_str()).bind(template.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates WHERE organizer_id = $1 ORDER BY created_at DESC").bind(organizer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("SELECT * FROM recurring_templates WHERE status = 'active' AND next_generation_at <= $1 ORDER BY next_generation_at ASC LIMIT $2").bind(now).bind(limit).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn set_status(&self, id: &str, status: TemplateStatus) -> Result<Option<RecurringTemplate>, AppError> {
        sqlx::query_as::<_, RecurringTemplate>("UPDATE recurring_templates SET status = $1 WHERE id = $2 RETURNING *").bind(status.as_str()).bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn advance_checkpoint(&self, update: &CheckpointUpdate) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE recurring_templates SET generated_through = $1, instances_generated = instances_generated + $2, next_generation_at = $3, status = $4 WHERE id = $5 AND status = 'active' AND next_generation_at = $6")
            .bind(update.generated_through).bind(update.created_count).bind(update.next_generation_at).bind(update.status.as_str()).bind(&update.template_id).bind(update.expected_next_generation_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }
    async fn record_gap(&self, gap: &RecurringGap) -> Result<(), AppError> {
        sqlx::query("INSERT INTO recurring_gaps (id, template_id, date, reason, created_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (template_id, date) DO UPDATE SET reason = EXCLUDED.reason")
            .bind(&gap.id).bind(&gap.template_id).bind(gap.date).bind(gap.reason.as_str()).bind(gap.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
    async fn list_gaps(&self, template_id: &str) -> Result<Vec<RecurringGap>, AppError> {
        sqlx::query_as::<_, RecurringGap>("SELECT * FROM recurring_gaps WHERE template_id = $1 ORDER BY date ASC").bind(template_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}

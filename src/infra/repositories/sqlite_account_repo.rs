use crate::domain::{models::account::{Account, AccountStatus}, ports::AccountRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAccountRepo {
    pool: SqlitePool,
}

impl SqliteAccountRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepo {
    async fn upsert(&self, account: &Account) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, name, email, role, status, credit_balance_cents, credit_sequence, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, email = excluded.email, role = excluded.role
             RETURNING *"
        )
            .bind(&account.id).bind(&account.name).bind(&account.email).bind(account.role.as_str())
            .bind(account.status.as_str()).bind(account.credit_balance_cents).bind(account.credit_sequence)
            .bind(account.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Account>, AppError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY name ASC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn set_status(&self, id: &str, status: AccountStatus) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>("UPDATE accounts SET status = ? WHERE id = ? RETURNING *")
            .bind(status.as_str()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
}

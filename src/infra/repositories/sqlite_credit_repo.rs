use crate::domain::{models::credit::{CreditTransaction, NewCreditEntry}, ports::CreditRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

pub struct SqliteCreditRepo {
    pool: SqlitePool,
}

impl SqliteCreditRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Moves the account balance and appends the log line on the caller's
/// transaction. The conditional update is the serialization point: it holds the
/// write lock and refuses to take the balance below zero.
pub(crate) async fn append_entry(conn: &mut SqliteConnection, entry: &NewCreditEntry) -> Result<CreditTransaction, AppError> {
    let row = sqlx::query(
        "UPDATE accounts
         SET credit_balance_cents = credit_balance_cents + ?, credit_sequence = credit_sequence + 1
         WHERE id = ? AND credit_balance_cents + ? >= 0
         RETURNING credit_balance_cents, credit_sequence"
    )
        .bind(entry.amount_cents).bind(&entry.account_id).bind(entry.amount_cents)
        .fetch_optional(&mut *conn).await.map_err(AppError::Database)?;

    let Some(row) = row else {
        let balance: Option<i64> = sqlx::query_scalar("SELECT credit_balance_cents FROM accounts WHERE id = ?")
            .bind(&entry.account_id)
            .fetch_optional(&mut *conn).await.map_err(AppError::Database)?;
        return Err(match balance {
            Some(available) => AppError::InsufficientBalance {
                available_cents: available,
                requested_cents: -entry.amount_cents,
            },
            None => AppError::NotFound("Account not found".into()),
        });
    };

    let tx = entry.clone().into_transaction(row.get("credit_balance_cents"), row.get("credit_sequence"));

    sqlx::query_as::<_, CreditTransaction>(
        "INSERT INTO credit_transactions (id, account_id, sequence, amount_cents, previous_balance_cents, new_balance_cents, kind, reference_type, reference_id, description, created_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *"
    )
        .bind(&tx.id).bind(&tx.account_id).bind(tx.sequence).bind(tx.amount_cents)
        .bind(tx.previous_balance_cents).bind(tx.new_balance_cents).bind(tx.kind.as_str())
        .bind(tx.reference_type.map(|r| r.as_str())).bind(&tx.reference_id)
        .bind(&tx.description).bind(&tx.created_by).bind(tx.created_at)
        .fetch_one(&mut *conn).await.map_err(AppError::Database)
}

#[async_trait]
impl CreditRepository for SqliteCreditRepo {
    async fn apply(&self, entry: &NewCreditEntry) -> Result<CreditTransaction, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let created = append_entry(&mut *tx, entry).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn list_recent(&self, account_id: &str, limit: i64) -> Result<Vec<CreditTransaction>, AppError> {
        sqlx::query_as::<_, CreditTransaction>("SELECT * FROM credit_transactions WHERE account_id = ? ORDER BY sequence DESC LIMIT ?")
            .bind(account_id).bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_chain(&self, account_id: &str) -> Result<Vec<CreditTransaction>, AppError> {
        sqlx::query_as::<_, CreditTransaction>("SELECT * FROM credit_transactions WHERE account_id = ? ORDER BY sequence ASC")
            .bind(account_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}

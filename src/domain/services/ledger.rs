use std::sync::Arc;
use tracing::info;

use crate::domain::models::credit::{CreditKind, CreditTransaction, LedgerAudit, NewCreditEntry};
use crate::domain::ports::{AccountRepository, CreditRepository};
use crate::error::AppError;

pub const MAX_HISTORY: i64 = 200;

/// The only writer of account balances.
pub struct LedgerService {
    credit_repo: Arc<dyn CreditRepository>,
    account_repo: Arc<dyn AccountRepository>,
}

impl LedgerService {
    pub fn new(credit_repo: Arc<dyn CreditRepository>, account_repo: Arc<dyn AccountRepository>) -> Self {
        Self { credit_repo, account_repo }
    }

    pub async fn apply(&self, entry: &NewCreditEntry) -> Result<CreditTransaction, AppError> {
        if entry.amount_cents == 0 {
            return Err(AppError::Validation("Credit amount must not be zero".into()));
        }

        let tx = self.credit_repo.apply(entry).await?;
        info!(
            account_id = %tx.account_id,
            sequence = tx.sequence,
            amount_cents = tx.amount_cents,
            kind = %tx.kind,
            "Ledger entry applied, balance now {}", tx.new_balance_cents
        );
        Ok(tx)
    }

    pub async fn adjust(&self, manager_id: &str, account_id: &str, amount_cents: i64, description: Option<String>) -> Result<CreditTransaction, AppError> {
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "Manual adjustment".to_string());

        let entry = NewCreditEntry::new(account_id, amount_cents, CreditKind::ManualAdjustment, description)
            .created_by(manager_id);
        self.apply(&entry).await
    }

    /// Debits whatever is left. `None` when there is nothing to expire.
    pub async fn expire(&self, manager_id: &str, account_id: &str) -> Result<Option<CreditTransaction>, AppError> {
        let balance = self.balance(account_id).await?;
        if balance == 0 {
            return Ok(None);
        }

        let entry = NewCreditEntry::new(account_id, -balance, CreditKind::Expiry, "Credit expiry")
            .created_by(manager_id);
        self.apply(&entry).await.map(Some)
    }

    pub async fn balance(&self, account_id: &str) -> Result<i64, AppError> {
        let account = self.account_repo.find_by_id(account_id).await?
            .ok_or(AppError::NotFound("Account not found".into()))?;
        Ok(account.credit_balance_cents)
    }

    pub async fn history(&self, account_id: &str, limit: Option<i64>) -> Result<Vec<CreditTransaction>, AppError> {
        let limit = limit.unwrap_or(50).clamp(1, MAX_HISTORY);
        self.credit_repo.list_recent(account_id, limit).await
    }

    pub async fn audit(&self, account_id: &str) -> Result<LedgerAudit, AppError> {
        let balance = self.balance(account_id).await?;
        let chain = self.credit_repo.list_chain(account_id).await?;
        Ok(LedgerAudit::verify(account_id, balance, &chain))
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::text_enum;

text_enum!(CreditKind {
    ReferralBonus => "referral_bonus",
    ManualAdjustment => "manual_adjustment",
    ReservationOffset => "reservation_offset",
    Refund => "refund",
    RefundReversal => "refund_reversal",
    Expiry => "expiry",
});

text_enum!(ReferenceType {
    Reservation => "reservation",
    Referral => "referral",
    Payment => "payment",
});

/// One immutable line of an account's credit log.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CreditTransaction {
    pub id: String,
    pub account_id: String,
    pub sequence: i64,
    pub amount_cents: i64,
    pub previous_balance_cents: i64,
    pub new_balance_cents: i64,
    pub kind: CreditKind,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger mutation waiting to be applied. Balance snapshots are filled in by
/// the store at write time.
#[derive(Debug, Clone)]
pub struct NewCreditEntry {
    pub account_id: String,
    pub amount_cents: i64,
    pub kind: CreditKind,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    pub description: String,
    pub created_by: Option<String>,
}

impl NewCreditEntry {
    pub fn new(account_id: &str, amount_cents: i64, kind: CreditKind, description: impl Into<String>) -> Self {
        Self {
            account_id: account_id.to_string(),
            amount_cents,
            kind,
            reference_type: None,
            reference_id: None,
            description: description.into(),
            created_by: None,
        }
    }

    pub fn referencing(mut self, reference_type: ReferenceType, reference_id: &str) -> Self {
        self.reference_type = Some(reference_type);
        self.reference_id = Some(reference_id.to_string());
        self
    }

    pub fn created_by(mut self, account_id: &str) -> Self {
        self.created_by = Some(account_id.to_string());
        self
    }

    /// Builds the stored row once the account update has returned the new balance and sequence.
    pub fn into_transaction(self, new_balance_cents: i64, sequence: i64) -> CreditTransaction {
        CreditTransaction {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id,
            sequence,
            amount_cents: self.amount_cents,
            previous_balance_cents: new_balance_cents - self.amount_cents,
            new_balance_cents,
            kind: self.kind,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            description: self.description,
            created_by: self.created_by,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChainBreak {
    pub sequence: i64,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerAudit {
    pub account_id: String,
    pub transactions: usize,
    pub stored_balance_cents: i64,
    pub ledger_balance_cents: i64,
    pub consistent: bool,
    pub breaks: Vec<ChainBreak>,
}

impl LedgerAudit {
    /// Walks the log oldest first and checks every link of the balance chain.
    pub fn verify(account_id: &str, stored_balance_cents: i64, log: &[CreditTransaction]) -> Self {
        let mut breaks = Vec::new();
        let mut running = 0;

        for (i, tx) in log.iter().enumerate() {
            let expected_sequence = i as i64 + 1;
            if tx.sequence != expected_sequence {
                breaks.push(ChainBreak {
                    sequence: tx.sequence,
                    detail: format!("expected sequence {}", expected_sequence),
                });
            }
            if tx.previous_balance_cents != running {
                breaks.push(ChainBreak {
                    sequence: tx.sequence,
                    detail: format!("previous balance {} does not follow {}", tx.previous_balance_cents, running),
                });
            }
            if tx.new_balance_cents != tx.previous_balance_cents + tx.amount_cents {
                breaks.push(ChainBreak {
                    sequence: tx.sequence,
                    detail: "new balance is not previous balance plus amount".into(),
                });
            }
            running = tx.new_balance_cents;
        }

        if running != stored_balance_cents {
            breaks.push(ChainBreak {
                sequence: log.last().map(|t| t.sequence).unwrap_or(0),
                detail: format!("account balance {} differs from ledger {}", stored_balance_cents, running),
            });
        }

        Self {
            account_id: account_id.to_string(),
            transactions: log.len(),
            stored_balance_cents,
            ledger_balance_cents: running,
            consistent: breaks.is_empty(),
            breaks,
        }
    }
}

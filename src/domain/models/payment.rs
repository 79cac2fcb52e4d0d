use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::text_enum;

text_enum!(PaymentStatus {
    Requested => "requested",
    Settled => "settled",
    Failed => "failed",
    Refunded => "refunded",
});

text_enum!(PaymentOutcome {
    Settled => "settled",
    Failed => "failed",
    Refunded => "refunded",
});

impl PaymentOutcome {
    /// Status a payment must be in for this outcome to apply.
    pub fn expected_status(self) -> PaymentStatus {
        match self {
            PaymentOutcome::Settled | PaymentOutcome::Failed => PaymentStatus::Requested,
            PaymentOutcome::Refunded => PaymentStatus::Settled,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Payment {
    pub id: String,
    pub reservation_id: String,
    pub request_id: String,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(reservation_id: &str, amount_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            reservation_id: reservation_id.to_string(),
            request_id: Uuid::new_v4().to_string(),
            amount_cents,
            status: PaymentStatus::Requested,
            provider_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outbound charge handed to the payment processor.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub request_id: String,
    pub reservation_id: String,
    pub amount_cents: i64,
    pub description: String,
}

/// Settlement report from the processor, delivered at least once.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub request_id: String,
    pub outcome: PaymentOutcome,
    pub provider_reference: Option<String>,
}

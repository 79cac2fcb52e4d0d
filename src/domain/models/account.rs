use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::text_enum;

text_enum!(AccountRole {
    Customer => "customer",
    Manager => "manager",
});

text_enum!(AccountStatus {
    Active => "active",
    Inactive => "inactive",
});

/// Local projection of an identity issued by the external provider.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub credit_balance_cents: i64,
    pub credit_sequence: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: String, name: String, email: String, role: AccountRole) -> Self {
        Self {
            id,
            name,
            email,
            role,
            status: AccountStatus::Active,
            credit_balance_cents: 0,
            credit_sequence: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

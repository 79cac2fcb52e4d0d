use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::text_enum;

text_enum!(CourtStatus {
    Active => "active",
    Maintenance => "maintenance",
    Inactive => "inactive",
});

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Court {
    pub id: String,
    pub name: String,
    pub modality: String,
    pub max_occupancy: i32,
    pub status: CourtStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Court {
    pub fn new(name: String, modality: String, max_occupancy: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            modality,
            max_occupancy,
            status: CourtStatus::Active,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_bookable(&self) -> bool {
        self.status == CourtStatus::Active
    }
}

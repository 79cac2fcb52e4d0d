use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

/// 0 = Sunday ... 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ScheduleSlot {
    pub id: String,
    pub court_id: String,
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub casual_price_cents: i64,
    pub subscriber_price_cents: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewSlotParams {
    pub court_id: String,
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub casual_price_cents: i64,
    pub subscriber_price_cents: i64,
}

impl ScheduleSlot {
    pub fn new(params: NewSlotParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            court_id: params.court_id,
            weekday: params.weekday,
            start_time: params.start_time,
            end_time: params.end_time,
            casual_price_cents: params.casual_price_cents,
            subscriber_price_cents: params.subscriber_price_cents,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn overlaps(&self, other: &ScheduleSlot) -> bool {
        self.court_id == other.court_id
            && self.weekday == other.weekday
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Bookings must match a slot's bounds exactly.
    pub fn matches_window(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time == start && self.end_time == end
    }

    pub fn is_offered_on(&self, date: NaiveDate) -> bool {
        self.active && self.weekday == weekday_index(date)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use super::text_enum;
use super::availability::Unavailability;

text_enum!(Recurrence {
    Weekly => "weekly",
    Monthly => "monthly",
});

text_enum!(TemplateStatus {
    Active => "active",
    Paused => "paused",
    Ended => "ended",
});

text_enum!(GapReason {
    Blackout => "blackout",
    Taken => "taken",
    OutsideSchedule => "outside_schedule",
    CourtUnavailable => "court_unavailable",
});

impl From<&Unavailability> for GapReason {
    fn from(value: &Unavailability) -> Self {
        match value {
            Unavailability::OutsideSchedule => GapReason::OutsideSchedule,
            Unavailability::CourtUnavailable { .. } => GapReason::CourtUnavailable,
            Unavailability::BlockedByBlackout { .. } => GapReason::Blackout,
            Unavailability::TakenByReservation { .. } => GapReason::Taken,
        }
    }
}

/// Weekday set as a bitmask, bit n = weekday n (0 = Sunday).
pub fn weekday_mask(days: &[i32]) -> i32 {
    days.iter()
        .filter(|d| (0..7).contains(*d))
        .fold(0, |mask, d| mask | (1 << d))
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct RecurringTemplate {
    pub id: String,
    pub court_id: String,
    pub organizer_id: String,
    pub recurrence: Recurrence,
    pub weekdays: i32,
    pub day_of_month: Option<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    pub price_cents: i64,
    pub discount_percent: i64,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub generated_through: Option<NaiveDate>,
    pub instances_generated: i64,
    pub next_generation_at: DateTime<Utc>,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
}

pub struct NewTemplateParams {
    pub court_id: String,
    pub organizer_id: String,
    pub recurrence: Recurrence,
    pub weekdays: Vec<i32>,
    pub day_of_month: Option<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    pub price_cents: i64,
    pub discount_percent: i64,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

impl RecurringTemplate {
    pub fn new(params: NewTemplateParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            court_id: params.court_id,
            organizer_id: params.organizer_id,
            recurrence: params.recurrence,
            weekdays: weekday_mask(&params.weekdays),
            day_of_month: params.day_of_month,
            start_time: params.start_time,
            end_time: params.end_time,
            participants: params.participants,
            price_cents: params.price_cents,
            discount_percent: params.discount_percent,
            starts_on: params.starts_on,
            ends_on: params.ends_on,
            generated_through: None,
            instances_generated: 0,
            next_generation_at: now,
            status: TemplateStatus::Active,
            created_at: now,
        }
    }

    pub fn includes_weekday(&self, weekday: i32) -> bool {
        (0..7).contains(&weekday) && self.weekdays & (1 << weekday) != 0
    }

    /// Per-occurrence price after the template discount, rounded down to the cent.
    pub fn occurrence_price_cents(&self) -> i64 {
        self.price_cents * (100 - self.discount_percent.clamp(0, 100)) / 100
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TemplateStatus::Active && self.next_generation_at <= now
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct RecurringGap {
    pub id: String,
    pub template_id: String,
    pub date: NaiveDate,
    pub reason: GapReason,
    pub created_at: DateTime<Utc>,
}

impl RecurringGap {
    pub fn new(template_id: String, date: NaiveDate, reason: GapReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            template_id,
            date,
            reason,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one expansion run over a template.
#[derive(Debug, Default, Serialize)]
pub struct ExpansionReport {
    pub template_id: String,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub created: Vec<String>,
    pub gaps: Vec<(NaiveDate, GapReason)>,
    pub already_generated: Vec<NaiveDate>,
    pub ended: bool,
}

/// Checkpoint written after a fully processed batch.
pub struct CheckpointUpdate {
    pub template_id: String,
    pub expected_next_generation_at: DateTime<Utc>,
    pub generated_through: Option<NaiveDate>,
    pub created_count: i64,
    pub next_generation_at: DateTime<Utc>,
    pub status: TemplateStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_mask_ignores_out_of_range_days() {
        assert_eq!(weekday_mask(&[2]), 0b100);
        assert_eq!(weekday_mask(&[0, 6, 9, -1]), 0b1000001);
    }

    #[test]
    fn test_occurrence_price_applies_discount() {
        let tpl = RecurringTemplate::new(NewTemplateParams {
            court_id: "c".into(),
            organizer_id: "o".into(),
            recurrence: Recurrence::Weekly,
            weekdays: vec![2],
            day_of_month: None,
            start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            participants: 10,
            price_cents: 15099,
            discount_percent: 10,
            starts_on: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            ends_on: None,
        });
        assert_eq!(tpl.occurrence_price_cents(), 13589);
        assert!(tpl.includes_weekday(2));
        assert!(!tpl.includes_weekday(3));
    }
}

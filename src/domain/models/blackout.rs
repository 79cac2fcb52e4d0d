use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use crate::error::AppError;

/// Period during which a court cannot be booked. Missing time bounds block whole days.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Blackout {
    pub id: String,
    pub court_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewBlackoutParams {
    pub court_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
    pub created_by: String,
}

impl Blackout {
    pub fn new(params: NewBlackoutParams) -> Result<Self, AppError> {
        if params.end_date < params.start_date {
            return Err(AppError::Validation("Blackout end date is before its start date".into()));
        }

        match (params.start_time, params.end_time) {
            (Some(start), Some(end)) if end <= start => {
                return Err(AppError::Validation("Blackout end time must be after its start time".into()));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::Validation("Blackout time bounds must be given together".into()));
            }
            _ => {}
        }

        if params.reason.trim().is_empty() {
            return Err(AppError::Validation("Blackout reason is required".into()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            court_id: params.court_id,
            start_date: params.start_date,
            end_date: params.end_date,
            start_time: params.start_time,
            end_time: params.end_time,
            reason: params.reason,
            created_by: params.created_by,
            created_at: Utc::now(),
        })
    }

    pub fn is_full_day(&self) -> bool {
        self.start_time.is_none() || self.end_time.is_none()
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Time bounds apply to every date of the range.
    pub fn blocks(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        if !self.covers_date(date) {
            return false;
        }
        match (self.start_time, self.end_time) {
            (Some(b_start), Some(b_end)) => b_start < end && start < b_end,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn params(start_time: Option<NaiveTime>, end_time: Option<NaiveTime>) -> NewBlackoutParams {
        NewBlackoutParams {
            court_id: "c1".into(),
            start_date: d("2025-06-07"),
            end_date: d("2025-06-08"),
            start_time,
            end_time,
            reason: "Resurfacing".into(),
            created_by: "m1".into(),
        }
    }

    #[test]
    fn test_full_day_blackout_blocks_every_window_in_range() {
        let b = Blackout::new(params(None, None)).unwrap();
        assert!(b.blocks(d("2025-06-07"), t("06:00"), t("07:00")));
        assert!(b.blocks(d("2025-06-08"), t("22:00"), t("23:00")));
        assert!(!b.blocks(d("2025-06-09"), t("22:00"), t("23:00")));
    }

    #[test]
    fn test_timed_blackout_only_blocks_overlapping_windows() {
        let b = Blackout::new(params(Some(t("18:00")), Some(t("20:00")))).unwrap();
        assert!(b.blocks(d("2025-06-07"), t("19:00"), t("20:00")));
        assert!(!b.blocks(d("2025-06-07"), t("20:00"), t("21:00")));
        assert!(!b.blocks(d("2025-06-07"), t("17:00"), t("18:00")));
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let mut p = params(None, None);
        p.end_date = d("2025-06-01");
        assert!(matches!(Blackout::new(p), Err(AppError::Validation(_))));
        assert!(Blackout::new(params(Some(t("20:00")), Some(t("18:00")))).is_err());
        assert!(Blackout::new(params(Some(t("20:00")), None)).is_err());
    }
}

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::court::CourtStatus;

/// Why a court/date/window cannot be booked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Unavailability {
    OutsideSchedule,
    CourtUnavailable { court_status: CourtStatus },
    #[serde(rename = "blackout")]
    BlockedByBlackout { blackout_id: String, reason: String },
    #[serde(rename = "reservation")]
    TakenByReservation { reservation_id: String },
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailability::OutsideSchedule => write!(f, "requested window is outside the court's operating hours"),
            Unavailability::CourtUnavailable { court_status } => write!(f, "court is {}", court_status),
            Unavailability::BlockedByBlackout { reason, .. } => write!(f, "court is blocked: {}", reason),
            Unavailability::TakenByReservation { reservation_id } => write!(f, "slot already reserved ({})", reservation_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available {
        slot_id: String,
        casual_price_cents: i64,
        subscriber_price_cents: i64,
    },
    Unavailable(Unavailability),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub slot_id: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub casual_price_cents: i64,
    pub subscriber_price_cents: i64,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridDay {
    pub date: NaiveDate,
    pub weekday: i32,
    pub slots: Vec<GridCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyGrid {
    pub court_id: String,
    pub start: NaiveDate,
    pub days: Vec<GridDay>,
}

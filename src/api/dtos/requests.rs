use crate::domain::models::account::AccountStatus;
use crate::domain::models::court::CourtStatus;
use crate::domain::models::recurring::Recurrence;
use crate::domain::models::reservation::ReservationKind;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SetAccountStatusRequest {
    pub status: AccountStatus,
}

#[derive(Deserialize)]
pub struct CreateCourtRequest {
    pub name: String,
    pub modality: String,
    pub max_occupancy: i32,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCourtRequest {
    pub name: Option<String>,
    pub modality: Option<String>,
    pub max_occupancy: Option<i32>,
    pub status: Option<CourtStatus>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateSlotRequest {
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub casual_price_cents: i64,
    pub subscriber_price_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateSlotRequest {
    pub weekday: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub casual_price_cents: Option<i64>,
    pub subscriber_price_cents: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateBlackoutRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Deserialize)]
pub struct WeekQuery {
    pub start: NaiveDate,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    #[serde(default = "default_kind")]
    pub kind: ReservationKind,
    pub credit_offset_cents: Option<i64>,
    pub organizer_id: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

fn default_kind() -> ReservationKind {
    ReservationKind::Casual
}

#[derive(Deserialize, Default)]
pub struct CancelQuery {
    #[serde(default)]
    pub waive_penalty: bool,
}

#[derive(Deserialize)]
pub struct CreateRecurringRequest {
    pub court_id: String,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub weekdays: Vec<i32>,
    pub day_of_month: Option<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    pub price_cents: Option<i64>,
    pub discount_percent: Option<i64>,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct AdjustCreditsRequest {
    pub amount_cents: i64,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetCodeActiveRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct RedeemReferralRequest {
    pub code: String,
}

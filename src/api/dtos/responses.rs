use crate::domain::models::{court::Court, reservation::Reservation, schedule::ScheduleSlot};
use crate::domain::services::cancellation::RefundQuote;
use serde::Serialize;

#[derive(Serialize)]
pub struct CourtDetailResponse {
    pub court: Court,
    pub slots: Vec<ScheduleSlot>,
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub reservation: Reservation,
    pub refund: Option<RefundQuote>,
    pub already_cancelled: bool,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance_cents: i64,
}

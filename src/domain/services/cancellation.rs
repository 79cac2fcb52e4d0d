use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::BookingPolicy;

/// Which band of the refund policy a cancellation falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundBand {
    Full,
    Partial,
    None,
    Waived,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundQuote {
    pub reservation_id: String,
    pub base_cents: i64,
    pub refund_percent: i64,
    pub refund_cents: i64,
    pub penalty_cents: i64,
    pub band: RefundBand,
    pub minutes_before_start: i64,
}

/// Penalty is forfeited from what the organizer put in (payments plus credits);
/// nothing beyond that is ever charged.
pub fn quote_refund(
    policy: &BookingPolicy,
    reservation_id: &str,
    base_cents: i64,
    slot_start: DateTime<Utc>,
    now: DateTime<Utc>,
    waive_penalty: bool,
) -> RefundQuote {
    let minutes_before = (slot_start - now).num_minutes();
    let full = policy.full_refund_hours * 60;
    let zero = policy.zero_refund_hours * 60;

    let (band, percent) = if waive_penalty {
        (RefundBand::Waived, 100)
    } else if minutes_before >= full {
        (RefundBand::Full, 100)
    } else if minutes_before >= zero {
        (RefundBand::Partial, 100 - policy.late_cancellation_penalty_percent)
    } else {
        (RefundBand::None, 0)
    };

    let base = base_cents.max(0);
    let refund_cents = base * percent / 100;

    RefundQuote {
        reservation_id: reservation_id.to_string(),
        base_cents: base,
        refund_percent: percent,
        refund_cents,
        penalty_cents: base - refund_cents,
        band,
        minutes_before_start: minutes_before,
    }
}

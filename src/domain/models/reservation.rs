use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use super::text_enum;
use crate::error::AppError;

text_enum!(ReservationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

text_enum!(ReservationKind {
    Casual => "casual",
    Subscriber => "subscriber",
    RecurringInstance => "recurring_instance",
});

text_enum!(ReservationAction {
    Confirm => "confirm",
    Cancel => "cancel",
    ExpireHold => "expire_hold",
});

impl ReservationStatus {
    /// The full transition table. Anything not listed is rejected.
    pub fn apply(self, action: ReservationAction) -> Result<ReservationStatus, AppError> {
        use ReservationAction::*;
        use ReservationStatus::*;

        match (self, action) {
            (Pending, Confirm) => Ok(Confirmed),
            (Pending, Cancel) => Ok(Cancelled),
            (Confirmed, Cancel) => Ok(Cancelled),
            (Pending, ExpireHold) => Ok(Cancelled),
            (from, action) => Err(AppError::InvalidTransition {
                entity: "reservation",
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }

    pub fn is_active(self) -> bool {
        self != ReservationStatus::Cancelled
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Reservation {
    pub id: String,
    pub court_id: String,
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub organizer_id: String,
    pub participants: i32,
    pub total_cents: i64,
    pub credit_applied_cents: i64,
    pub paid_cents: i64,
    pub refunded_cents: i64,
    pub status: ReservationStatus,
    pub kind: ReservationKind,
    pub template_id: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewReservationParams {
    pub court_id: String,
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub organizer_id: String,
    pub participants: i32,
    pub total_cents: i64,
    pub credit_applied_cents: i64,
    pub kind: ReservationKind,
    pub template_id: Option<String>,
    pub confirmed: bool,
}

impl Reservation {
    pub fn new(params: NewReservationParams) -> Self {
        let now = Utc::now();
        let status = if params.confirmed {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Pending
        };

        Self {
            id: Uuid::new_v4().to_string(),
            court_id: params.court_id,
            slot_id: params.slot_id,
            date: params.date,
            start_time: params.start_time,
            end_time: params.end_time,
            organizer_id: params.organizer_id,
            participants: params.participants,
            total_cents: params.total_cents,
            credit_applied_cents: params.credit_applied_cents,
            paid_cents: 0,
            refunded_cents: 0,
            status,
            kind: params.kind,
            template_id: params.template_id,
            confirmed_at: params.confirmed.then_some(now),
            cancelled_at: None,
            created_at: now,
        }
    }

    /// What the payment processor is asked to charge.
    pub fn payable_cents(&self) -> i64 {
        (self.total_cents - self.credit_applied_cents).max(0)
    }

    /// Money the organizer actually put in: settled payments plus credits spent.
    pub fn refundable_base_cents(&self) -> i64 {
        self.paid_cents + self.credit_applied_cents
    }

    pub fn has_payment(&self) -> bool {
        self.paid_cents > 0 || self.credit_applied_cents > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationAction::*;
    use ReservationStatus::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(Pending.apply(Confirm).unwrap(), Confirmed);
        assert_eq!(Pending.apply(Cancel).unwrap(), Cancelled);
        assert_eq!(Confirmed.apply(Cancel).unwrap(), Cancelled);
        assert_eq!(Pending.apply(ExpireHold).unwrap(), Cancelled);
    }

    #[test]
    fn test_rejects_moves_out_of_cancelled() {
        for action in [Confirm, Cancel, ExpireHold] {
            assert!(matches!(Cancelled.apply(action), Err(AppError::InvalidTransition { .. })));
        }
        assert!(Confirmed.apply(Confirm).is_err());
        assert!(Confirmed.apply(ExpireHold).is_err());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("recurring_instance".parse::<ReservationKind>().unwrap(), ReservationKind::RecurringInstance);
        assert!("CONFIRMED".parse::<ReservationStatus>().is_err());
    }
}

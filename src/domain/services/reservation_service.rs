use std::sync::Arc;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tracing::{error, info, warn};

use crate::config::BookingPolicy;
use crate::domain::models::account::AccountRole;
use crate::domain::models::auth::Identity;
use crate::domain::models::availability::Availability;
use crate::domain::models::credit::{CreditKind, NewCreditEntry, ReferenceType};
use crate::domain::models::payment::{ChargeRequest, Payment, PaymentStatus};
use crate::domain::models::reservation::{
    NewReservationParams, Reservation, ReservationAction, ReservationKind, ReservationStatus,
};
use crate::domain::ports::{AccountRepository, PaymentProcessor, PaymentRepository, ReservationRepository};
use crate::domain::services::availability::{evaluate, slot_instant};
use crate::domain::services::cancellation::{quote_refund, RefundQuote};
use crate::domain::services::catalog_cache::CatalogCache;
use crate::domain::services::referral_service::ReferralService;
use crate::error::AppError;

/// Interactive booking request, already authenticated.
pub struct CreateReservation {
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    pub kind: ReservationKind,
    pub credit_offset_cents: Option<i64>,
    pub organizer_id: Option<String>,
    pub confirm: bool,
}

/// Input to the single conflict-checked creation path shared by interactive
/// bookings and the recurring expander.
pub struct BookingRequest {
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub organizer_id: String,
    pub participants: i32,
    pub kind: ReservationKind,
    pub price_override_cents: Option<i64>,
    pub credit_offset_cents: i64,
    pub template_id: Option<String>,
    pub confirm: bool,
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub reservation: Reservation,
    pub quote: Option<RefundQuote>,
    pub already_cancelled: bool,
}

pub struct ReservationService {
    catalog: Arc<CatalogCache>,
    reservation_repo: Arc<dyn ReservationRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    account_repo: Arc<dyn AccountRepository>,
    processor: Arc<dyn PaymentProcessor>,
    referrals: Arc<ReferralService>,
    policy: BookingPolicy,
}

impl ReservationService {
    pub fn new(
        catalog: Arc<CatalogCache>,
        reservation_repo: Arc<dyn ReservationRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        account_repo: Arc<dyn AccountRepository>,
        processor: Arc<dyn PaymentProcessor>,
        referrals: Arc<ReferralService>,
        policy: BookingPolicy,
    ) -> Self {
        Self { catalog, reservation_repo, payment_repo, account_repo, processor, referrals, policy }
    }

    pub async fn create(&self, actor: &Identity, req: CreateReservation) -> Result<Reservation, AppError> {
        if req.kind == ReservationKind::RecurringInstance {
            return Err(AppError::Validation("Recurring instances are created from templates".into()));
        }
        if (req.confirm || req.organizer_id.is_some()) && !actor.is_manager() {
            return Err(AppError::Forbidden("Only managers can confirm or book on behalf of others".into()));
        }

        let organizer_id = req.organizer_id.unwrap_or_else(|| actor.account_id.clone());
        let organizer = self.account_repo.find_by_id(&organizer_id).await?
            .ok_or(AppError::NotFound("Organizer account not found".into()))?;
        if !organizer.is_active() {
            return Err(AppError::Forbidden("Organizer account is inactive".into()));
        }

        let offset = req.credit_offset_cents.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Validation("Credit offset must not be negative".into()));
        }

        let reservation = self.book(BookingRequest {
            court_id: req.court_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            organizer_id,
            participants: req.participants,
            kind: req.kind,
            price_override_cents: None,
            credit_offset_cents: offset,
            template_id: None,
            confirm: req.confirm,
        }).await?;

        if reservation.status == ReservationStatus::Confirmed {
            self.after_confirmation(&reservation).await;
        } else if reservation.payable_cents() > 0 {
            if let Err(e) = self.request_payment(&reservation).await {
                error!(reservation_id = %reservation.id, "Charge request failed, reservation stays pending: {}", e);
            }
        }

        Ok(reservation)
    }

    /// Availability check and insert. The store re-checks blackouts and lets the
    /// unique index arbitrate the slot inside the insert transaction.
    pub async fn book(&self, req: BookingRequest) -> Result<Reservation, AppError> {
        if req.end_time <= req.start_time {
            return Err(AppError::Validation("End time must be after start time".into()));
        }

        let catalog = self.catalog.load(&req.court_id).await?;
        if req.participants < 1 || req.participants > catalog.court.max_occupancy {
            return Err(AppError::Validation(format!(
                "Participants must be between 1 and {}", catalog.court.max_occupancy
            )));
        }

        let start_at = slot_instant(self.policy.venue_timezone, req.date, req.start_time)?;
        if start_at <= Utc::now() {
            return Err(AppError::Validation("Cannot book in the past".into()));
        }

        let availability = evaluate(
            &catalog.court, &catalog.slots, &catalog.blackouts, &[],
            req.date, req.start_time, req.end_time,
        );
        let (slot_id, total_cents) = match availability {
            Availability::Available { slot_id, casual_price_cents, subscriber_price_cents } => {
                let price = match req.kind {
                    ReservationKind::Casual => casual_price_cents,
                    ReservationKind::Subscriber => subscriber_price_cents,
                    ReservationKind::RecurringInstance => req.price_override_cents.unwrap_or(subscriber_price_cents),
                };
                (slot_id, price)
            }
            Availability::Unavailable(reason) => {
                warn!(court_id = %req.court_id, date = %req.date, "Booking rejected: {}", reason);
                return Err(AppError::SlotUnavailable(reason));
            }
        };

        let credit_applied = req.credit_offset_cents.clamp(0, total_cents);
        let confirmed = req.confirm || total_cents - credit_applied == 0;

        let reservation = Reservation::new(NewReservationParams {
            court_id: req.court_id,
            slot_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            organizer_id: req.organizer_id,
            participants: req.participants,
            total_cents,
            credit_applied_cents: credit_applied,
            kind: req.kind,
            template_id: req.template_id,
            confirmed,
        });

        let offset_entry = (credit_applied > 0).then(|| {
            NewCreditEntry::new(&reservation.organizer_id, -credit_applied, CreditKind::ReservationOffset, "Reservation credit offset")
                .referencing(ReferenceType::Reservation, &reservation.id)
                .created_by(&reservation.organizer_id)
        });

        let created = match self.reservation_repo.create(&reservation, offset_entry.as_ref()).await {
            Ok(created) => created,
            Err(e) => {
                if let AppError::SlotUnavailable(reason) = &e {
                    warn!(court_id = %reservation.court_id, date = %reservation.date, "Booking lost the slot: {}", reason);
                }
                return Err(e);
            }
        };

        info!(
            reservation_id = %created.id,
            court_id = %created.court_id,
            organizer_id = %created.organizer_id,
            status = %created.status,
            "Reservation created for {} {}-{}", created.date, created.start_time, created.end_time
        );
        Ok(created)
    }

    pub async fn get(&self, actor: &Identity, id: &str) -> Result<Reservation, AppError> {
        let reservation = self.find(id).await?;
        authorize(actor, &reservation)?;
        Ok(reservation)
    }

    pub async fn list_mine(&self, actor: &Identity) -> Result<Vec<Reservation>, AppError> {
        self.reservation_repo.list_by_organizer(&actor.account_id).await
    }

    pub async fn list_by_court(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        if to < from {
            return Err(AppError::Validation("Range end is before its start".into()));
        }
        if (to - from).num_days() > 92 {
            return Err(AppError::Validation("Range is limited to 92 days".into()));
        }
        self.reservation_repo.list_by_court(court_id, from, to).await
    }

    /// Manager override: pending -> confirmed before the slot starts.
    pub async fn confirm(&self, actor: &Identity, id: &str) -> Result<Reservation, AppError> {
        if !actor.is_manager() {
            return Err(AppError::Forbidden("Only managers can confirm reservations".into()));
        }

        let reservation = self.find(id).await?;
        reservation.status.apply(ReservationAction::Confirm)?;

        let start_at = slot_instant(self.policy.venue_timezone, reservation.date, reservation.start_time)?;
        let now = Utc::now();
        if start_at <= now {
            return Err(AppError::Validation("Reservation has already started".into()));
        }

        let confirmed = match self.reservation_repo.confirm(id, now).await? {
            Some(r) => r,
            None => {
                let current = self.find(id).await?;
                current.status.apply(ReservationAction::Confirm)?;
                return Err(AppError::Conflict("Reservation changed concurrently, retry".into()));
            }
        };

        info!(reservation_id = %id, confirmed_by = %actor.account_id, "Reservation confirmed");
        self.after_confirmation(&confirmed).await;
        Ok(confirmed)
    }

    pub async fn quote_cancellation(&self, actor: &Identity, id: &str, waive_penalty: bool) -> Result<RefundQuote, AppError> {
        let reservation = self.find(id).await?;
        authorize(actor, &reservation)?;
        reservation.status.apply(ReservationAction::Cancel)?;
        self.quote(actor, &reservation, waive_penalty)
    }

    /// Idempotent: cancelling a cancelled reservation returns it unchanged.
    pub async fn cancel(&self, actor: &Identity, id: &str, waive_penalty: bool) -> Result<CancelOutcome, AppError> {
        let reservation = self.find(id).await?;
        authorize(actor, &reservation)?;

        if reservation.status == ReservationStatus::Cancelled {
            info!(reservation_id = %id, "Cancel repeated on cancelled reservation, nothing to do");
            return Ok(CancelOutcome { reservation, quote: None, already_cancelled: true });
        }
        reservation.status.apply(ReservationAction::Cancel)?;

        let quote = self.quote(actor, &reservation, waive_penalty)?;
        let refund_entry = (quote.refund_cents > 0).then(|| {
            NewCreditEntry::new(&reservation.organizer_id, quote.refund_cents, CreditKind::Refund, "Cancellation refund")
                .referencing(ReferenceType::Reservation, &reservation.id)
                .created_by(&actor.account_id)
        });

        match self.reservation_repo.cancel(&reservation, quote.refund_cents, refund_entry.as_ref(), Utc::now()).await? {
            Some(cancelled) => {
                info!(
                    reservation_id = %id,
                    cancelled_by = %actor.account_id,
                    refund_cents = quote.refund_cents,
                    "Reservation cancelled ({:?} refund band)", quote.band
                );
                Ok(CancelOutcome { reservation: cancelled, quote: Some(quote), already_cancelled: false })
            }
            None => {
                let current = self.find(id).await?;
                if current.status == ReservationStatus::Cancelled {
                    return Ok(CancelOutcome { reservation: current, quote: None, already_cancelled: true });
                }
                Err(AppError::Conflict("Reservation changed concurrently, retry".into()))
            }
        }
    }

    /// Asks the processor to charge the payable remainder. An outstanding
    /// request is re-sent under its original request id.
    pub async fn pay(&self, actor: &Identity, id: &str) -> Result<Payment, AppError> {
        let reservation = self.find(id).await?;
        authorize(actor, &reservation)?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidTransition {
                entity: "reservation",
                from: reservation.status.to_string(),
                action: "pay".into(),
            });
        }
        if reservation.payable_cents() - reservation.paid_cents <= 0 {
            return Err(AppError::Validation("Nothing left to pay".into()));
        }

        self.request_payment(&reservation).await
    }

    pub async fn delete(&self, actor: &Identity, id: &str) -> Result<(), AppError> {
        let reservation = self.find(id).await?;
        authorize(actor, &reservation)?;

        if reservation.status != ReservationStatus::Pending || reservation.has_payment() {
            return Err(AppError::Conflict("Only pending, unpaid reservations can be deleted; cancel instead".into()));
        }
        if !self.reservation_repo.delete_unpaid_pending(id).await? {
            return Err(AppError::Conflict("Reservation has payments attached; cancel instead".into()));
        }

        info!(reservation_id = %id, deleted_by = %actor.account_id, "Pending reservation deleted");
        Ok(())
    }

    /// Cancels unpaid pending reservations older than the hold window. Credits
    /// applied to them are handed back; no penalty applies.
    pub async fn release_expired_holds(&self) -> Result<usize, AppError> {
        let Some(hold_minutes) = self.policy.pending_hold_minutes else {
            return Ok(0);
        };

        let now = Utc::now();
        let stale = self.reservation_repo
            .list_stale_pending(now - Duration::minutes(hold_minutes), 50)
            .await?;

        let mut released = 0;
        for reservation in stale {
            reservation.status.apply(ReservationAction::ExpireHold)?;
            let credit_back = (reservation.credit_applied_cents > 0).then(|| {
                NewCreditEntry::new(&reservation.organizer_id, reservation.credit_applied_cents, CreditKind::Refund, "Expired hold")
                    .referencing(ReferenceType::Reservation, &reservation.id)
            });

            if self.reservation_repo
                .cancel(&reservation, reservation.credit_applied_cents, credit_back.as_ref(), now)
                .await?
                .is_some()
            {
                info!(reservation_id = %reservation.id, "Pending hold expired, slot released");
                released += 1;
            }
        }
        Ok(released)
    }

    async fn request_payment(&self, reservation: &Reservation) -> Result<Payment, AppError> {
        let outstanding = self.payment_repo.list_by_reservation(&reservation.id).await?
            .into_iter()
            .find(|p| p.status == PaymentStatus::Requested);

        let payment = match outstanding {
            Some(p) => p,
            None => {
                let amount = reservation.payable_cents() - reservation.paid_cents;
                self.payment_repo.create(&Payment::new(&reservation.id, amount)).await?
            }
        };

        self.processor.charge(&ChargeRequest {
            request_id: payment.request_id.clone(),
            reservation_id: reservation.id.clone(),
            amount_cents: payment.amount_cents,
            description: format!("Court reservation {} {}", reservation.date, reservation.start_time.format("%H:%M")),
        }).await?;

        info!(reservation_id = %reservation.id, request_id = %payment.request_id, "Charge requested for {} cents", payment.amount_cents);
        Ok(payment)
    }

    /// Referral qualification runs after the confirmation has committed; its
    /// failure is logged and does not undo the confirmation.
    pub async fn after_confirmation(&self, reservation: &Reservation) {
        self.after_confirmation_of(&reservation.organizer_id).await;
    }

    pub async fn after_confirmation_of(&self, organizer_id: &str) {
        if let Err(e) = self.referrals.on_confirmed(organizer_id).await {
            error!(organizer_id = %organizer_id, "Referral qualification failed: {}", e);
        }
    }

    fn quote(&self, actor: &Identity, reservation: &Reservation, waive_penalty: bool) -> Result<RefundQuote, AppError> {
        if waive_penalty && !actor.is_manager() {
            return Err(AppError::Forbidden("Only managers can waive the cancellation penalty".into()));
        }
        let start_at = slot_instant(self.policy.venue_timezone, reservation.date, reservation.start_time)?;
        Ok(quote_refund(
            &self.policy,
            &reservation.id,
            reservation.refundable_base_cents(),
            start_at,
            Utc::now(),
            waive_penalty,
        ))
    }

    async fn find(&self, id: &str) -> Result<Reservation, AppError> {
        self.reservation_repo.find_by_id(id).await?
            .ok_or(AppError::NotFound("Reservation not found".into()))
    }
}

fn authorize(actor: &Identity, reservation: &Reservation) -> Result<(), AppError> {
    if actor.role == AccountRole::Manager || actor.account_id == reservation.organizer_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not your reservation".into()))
    }
}

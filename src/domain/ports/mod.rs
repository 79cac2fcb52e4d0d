use crate::domain::models::{
    account::{Account, AccountStatus},
    blackout::Blackout,
    court::Court,
    schedule::ScheduleSlot,
    credit::{CreditTransaction, NewCreditEntry},
    payment::{ChargeRequest, Payment},
    recurring::{CheckpointUpdate, RecurringGap, RecurringTemplate, TemplateStatus},
    referral::{Referral, ReferralCode, ReferralStats},
    reservation::Reservation,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Inserts or refreshes the identity fields; status and balance are left untouched.
    async fn upsert(&self, account: &Account) -> Result<Account, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError>;
    async fn list(&self) -> Result<Vec<Account>, AppError>;
    async fn set_status(&self, id: &str, status: AccountStatus) -> Result<Option<Account>, AppError>;
}

#[async_trait]
pub trait CourtRepository: Send + Sync {
    async fn create(&self, court: &Court) -> Result<Court, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Court>, AppError>;
    async fn list(&self) -> Result<Vec<Court>, AppError>;
    async fn update(&self, court: &Court) -> Result<Court, AppError>;

    async fn create_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError>;
    async fn find_slot(&self, id: &str) -> Result<Option<ScheduleSlot>, AppError>;
    async fn list_slots(&self, court_id: &str) -> Result<Vec<ScheduleSlot>, AppError>;
    async fn update_slot(&self, slot: &ScheduleSlot) -> Result<ScheduleSlot, AppError>;
}

#[async_trait]
pub trait BlackoutRepository: Send + Sync {
    async fn create(&self, blackout: &Blackout) -> Result<Blackout, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Blackout>, AppError>;
    async fn list_by_court(&self, court_id: &str) -> Result<Vec<Blackout>, AppError>;
    async fn list_overlapping(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Blackout>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Inserts the reservation, re-checks blackouts for its date and applies the
    /// optional credit offset, all in one transaction. A live reservation holding
    /// the same (court, date, window) surfaces as `SlotUnavailable(TakenByReservation)`.
    async fn create(&self, reservation: &Reservation, offset: Option<&NewCreditEntry>) -> Result<Reservation, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError>;
    /// First live reservation overlapping `[start, end)` on that court and date.
    async fn find_active_in_window(
        &self,
        court_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Option<Reservation>, AppError>;
    /// Whether any live reservation dated `from` or later was booked against the slot.
    async fn has_live_for_slot_from(&self, slot_id: &str, from: NaiveDate) -> Result<bool, AppError>;
    /// Whether the account has ever organized a reservation that got confirmed.
    async fn has_confirmed_for_organizer(&self, organizer_id: &str) -> Result<bool, AppError>;
    async fn list_active_in_range(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reservation>, AppError>;
    async fn list_by_court(&self, court_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reservation>, AppError>;
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Reservation>, AppError>;
    async fn list_template_dates(&self, template_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, AppError>;
    async fn list_stale_pending(&self, created_before: DateTime<Utc>, limit: i64) -> Result<Vec<Reservation>, AppError>;

    /// Conditional pending -> confirmed. `None` when the row is no longer pending.
    async fn confirm(&self, id: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError>;

    /// Conditional cancel against the snapshot the refund was computed from (same
    /// status and paid total), with the refund credit in the same transaction.
    /// `None` when the row moved on since the snapshot.
    async fn cancel(
        &self,
        snapshot: &Reservation,
        refunded_cents: i64,
        refund: Option<&NewCreditEntry>,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, AppError>;

    /// Hard delete of a pending reservation with no money attached. Returns false otherwise.
    async fn delete_unpaid_pending(&self, id: &str) -> Result<bool, AppError>;
}

/// What a processed settlement did to its reservation.
#[derive(Debug)]
pub struct SettlementResult {
    pub payment: Payment,
    pub reservation: Reservation,
    pub confirmed: bool,
    pub refunded_late: bool,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError>;
    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Payment>, AppError>;
    async fn list_by_reservation(&self, reservation_id: &str) -> Result<Vec<Payment>, AppError>;

    /// requested -> settled, crediting the reservation. A pending reservation is
    /// confirmed; a cancelled one gets the amount back as a refund credit.
    /// `None` for duplicate or out-of-order delivery.
    async fn settle(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<SettlementResult>, AppError>;
    /// requested -> failed. `None` for duplicate or out-of-order delivery.
    async fn fail(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<Payment>, AppError>;
    /// settled -> refunded, taking the amount off the reservation's paid total. On a
    /// cancelled reservation whose money was already returned as credit, the same
    /// amount is reversed off the balance, capped at what is left of it.
    async fn refund(&self, request_id: &str, provider_reference: Option<&str>, at: DateTime<Utc>) -> Result<Option<Payment>, AppError>;
}

#[async_trait]
pub trait RecurringRepository: Send + Sync {
    async fn create(&self, template: &RecurringTemplate) -> Result<RecurringTemplate, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RecurringTemplate>, AppError>;
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<RecurringTemplate>, AppError>;
    async fn list_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<RecurringTemplate>, AppError>;
    async fn set_status(&self, id: &str, status: TemplateStatus) -> Result<Option<RecurringTemplate>, AppError>;
    /// Optimistic on `expected_next_generation_at`; false when another run moved it first.
    async fn advance_checkpoint(&self, update: &CheckpointUpdate) -> Result<bool, AppError>;
    /// Idempotent per (template, date).
    async fn record_gap(&self, gap: &RecurringGap) -> Result<(), AppError>;
    async fn list_gaps(&self, template_id: &str) -> Result<Vec<RecurringGap>, AppError>;
}

#[async_trait]
pub trait CreditRepository: Send + Sync {
    async fn apply(&self, entry: &NewCreditEntry) -> Result<CreditTransaction, AppError>;
    async fn list_recent(&self, account_id: &str, limit: i64) -> Result<Vec<CreditTransaction>, AppError>;
    async fn list_chain(&self, account_id: &str) -> Result<Vec<CreditTransaction>, AppError>;
}

#[async_trait]
pub trait ReferralRepository: Send + Sync {
    async fn create_code(&self, code: &ReferralCode) -> Result<ReferralCode, AppError>;
    async fn find_code_by_account(&self, account_id: &str) -> Result<Option<ReferralCode>, AppError>;
    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>, AppError>;
    async fn set_code_active(&self, account_id: &str, active: bool) -> Result<Option<ReferralCode>, AppError>;

    /// Inserts the pending referral and bumps the code's redemption counter.
    async fn redeem(&self, referral: &Referral) -> Result<Referral, AppError>;
    async fn find_open_for_referred(&self, referred_id: &str) -> Result<Option<Referral>, AppError>;
    async fn list_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>, AppError>;

    /// Conditional pending -> accepted plus both bonus credits, in one transaction.
    /// `None` if the referral is no longer pending or has run out.
    async fn accept(
        &self,
        referral_id: &str,
        bonuses: &[NewCreditEntry],
        at: DateTime<Utc>,
    ) -> Result<Option<Referral>, AppError>;
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
    /// Pending, unexpired referrals whose referred account already has a
    /// reservation confirmed after the redemption.
    async fn list_pending_qualified(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Referral>, AppError>;

    async fn stats_for_referrer(&self, referrer_id: &str) -> Result<ReferralStats, AppError>;
    async fn stats(&self) -> Result<ReferralStats, AppError>;
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<(), AppError>;
}

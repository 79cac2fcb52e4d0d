use std::collections::HashSet;
use std::sync::Arc;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{info, warn};

use crate::config::BookingPolicy;
use crate::domain::models::auth::Identity;
use crate::domain::models::recurring::{
    CheckpointUpdate, ExpansionReport, GapReason, NewTemplateParams, Recurrence, RecurringGap, RecurringTemplate,
    TemplateStatus,
};
use crate::domain::models::reservation::ReservationKind;
use crate::domain::models::schedule::weekday_index;
use crate::domain::ports::{RecurringRepository, ReservationRepository};
use crate::domain::services::availability::slot_instant;
use crate::domain::services::catalog_cache::CatalogCache;
use crate::domain::services::reservation_service::{BookingRequest, ReservationService};
use crate::error::AppError;

/// Dates in [from, to] produced by the template's rule. Monthly rules skip
/// months without the configured day.
pub fn candidate_dates(template: &RecurringTemplate, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| match template.recurrence {
            Recurrence::Weekly => template.includes_weekday(weekday_index(*d)),
            Recurrence::Monthly => template.day_of_month.is_some_and(|dom| d.day() as i32 == dom),
        })
        .collect()
}

/// The next batch to materialize, or `None` when nothing is left inside the horizon.
pub fn expansion_window(template: &RecurringTemplate, today: NaiveDate, horizon_days: i64) -> Option<(NaiveDate, NaiveDate)> {
    let mut from = template.starts_on.max(today);
    if let Some(done) = template.generated_through {
        from = from.max(done + Duration::days(1));
    }

    let mut to = today + Duration::days(horizon_days);
    if let Some(ends_on) = template.ends_on {
        to = to.min(ends_on);
    }

    (from <= to).then_some((from, to))
}

pub struct CreateTemplate {
    pub court_id: String,
    pub recurrence: Recurrence,
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

pub struct RecurringService {
    recurring_repo: Arc<dyn RecurringRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    reservations: Arc<ReservationService>,
    catalog: Arc<CatalogCache>,
    policy: BookingPolicy,
}

impl RecurringService {
    pub fn new(
        recurring_repo: Arc<dyn RecurringRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        reservations: Arc<ReservationService>,
        catalog: Arc<CatalogCache>,
        policy: BookingPolicy,
    ) -> Self {
        Self { recurring_repo, reservation_repo, reservations, catalog, policy }
    }

    pub async fn create(&self, actor: &Identity, req: CreateTemplate) -> Result<RecurringTemplate, AppError> {
        if req.end_time <= req.start_time {
            return Err(AppError::Validation("End time must be after start time".into()));
        }
        if req.ends_on.is_some_and(|end| end < req.starts_on) {
            return Err(AppError::Validation("Template ends before it starts".into()));
        }
        match req.recurrence {
            Recurrence::Weekly => {
                if req.weekdays.is_empty() || req.weekdays.iter().any(|d| !(0..7).contains(d)) {
                    return Err(AppError::Validation("Weekly templates need weekdays between 0 and 6".into()));
                }
            }
            Recurrence::Monthly => {
                if !req.day_of_month.is_some_and(|d| (1..=31).contains(&d)) {
                    return Err(AppError::Validation("Monthly templates need a day of month between 1 and 31".into()));
                }
            }
        }

        let discount = req.discount_percent.unwrap_or(self.policy.default_recurring_discount_percent);
        if !(0..=100).contains(&discount) {
            return Err(AppError::Validation("Discount must be between 0 and 100".into()));
        }

        let catalog = self.catalog.load(&req.court_id).await?;
        if req.participants < 1 || req.participants > catalog.court.max_occupancy {
            return Err(AppError::Validation(format!(
                "Participants must be between 1 and {}", catalog.court.max_occupancy
            )));
        }

        let price_cents = match req.price_cents {
            Some(p) if p < 0 => return Err(AppError::Validation("Price must not be negative".into())),
            Some(p) => p,
            None => catalog.slots.iter()
                .filter(|s| s.active && s.matches_window(req.start_time, req.end_time))
                .find(|s| req.recurrence == Recurrence::Monthly || req.weekdays.contains(&s.weekday))
                .map(|s| s.subscriber_price_cents)
                .ok_or(AppError::Validation("No schedule slot matches the template window".into()))?,
        };

        let template = RecurringTemplate::new(NewTemplateParams {
            court_id: req.court_id,
            organizer_id: actor.account_id.clone(),
            recurrence: req.recurrence,
            weekdays: req.weekdays,
            day_of_month: if req.recurrence == Recurrence::Monthly { req.day_of_month } else { None },
            start_time: req.start_time,
            end_time: req.end_time,
            participants: req.participants,
            price_cents,
            discount_percent: discount,
            starts_on: req.starts_on,
            ends_on: req.ends_on,
        });

        let created = self.recurring_repo.create(&template).await?;
        info!(template_id = %created.id, organizer_id = %created.organizer_id, "Recurring template created");
        Ok(created)
    }

    pub async fn get(&self, actor: &Identity, id: &str) -> Result<RecurringTemplate, AppError> {
        let template = self.find(id).await?;
        authorize(actor, &template)?;
        Ok(template)
    }

    pub async fn list_mine(&self, actor: &Identity) -> Result<Vec<RecurringTemplate>, AppError> {
        self.recurring_repo.list_by_organizer(&actor.account_id).await
    }

    pub async fn gaps(&self, actor: &Identity, id: &str) -> Result<Vec<RecurringGap>, AppError> {
        let template = self.find(id).await?;
        authorize(actor, &template)?;
        self.recurring_repo.list_gaps(id).await
    }

    pub async fn end(&self, actor: &Identity, id: &str) -> Result<RecurringTemplate, AppError> {
        self.change_status(actor, id, &[TemplateStatus::Active, TemplateStatus::Paused], TemplateStatus::Ended).await
    }

    pub async fn pause(&self, actor: &Identity, id: &str) -> Result<RecurringTemplate, AppError> {
        self.change_status(actor, id, &[TemplateStatus::Active], TemplateStatus::Paused).await
    }

    pub async fn resume(&self, actor: &Identity, id: &str) -> Result<RecurringTemplate, AppError> {
        self.change_status(actor, id, &[TemplateStatus::Paused], TemplateStatus::Active).await
    }

    async fn change_status(
        &self,
        actor: &Identity,
        id: &str,
        allowed_from: &[TemplateStatus],
        to: TemplateStatus,
    ) -> Result<RecurringTemplate, AppError> {
        let template = self.find(id).await?;
        authorize(actor, &template)?;

        if !allowed_from.contains(&template.status) {
            return Err(AppError::InvalidTransition {
                entity: "recurring template",
                from: template.status.to_string(),
                action: to.to_string(),
            });
        }

        let updated = self.recurring_repo.set_status(id, to).await?
            .ok_or(AppError::NotFound("Recurring template not found".into()))?;
        info!(template_id = %id, "Recurring template {} -> {}", template.status, to);
        Ok(updated)
    }

    /// Manual run, outside the checkpoint schedule.
    pub async fn expand_now(&self, actor: &Identity, id: &str) -> Result<ExpansionReport, AppError> {
        if !actor.is_manager() {
            return Err(AppError::Forbidden("Only managers can trigger expansion".into()));
        }
        let template = self.find(id).await?;
        if template.status != TemplateStatus::Active {
            return Err(AppError::InvalidTransition {
                entity: "recurring template",
                from: template.status.to_string(),
                action: "expand".into(),
            });
        }
        self.expand(&template).await
    }

    /// Worker entry point: every active template whose checkpoint has passed.
    pub async fn run_due(&self, limit: i64) -> Result<Vec<ExpansionReport>, AppError> {
        let due = self.recurring_repo.list_due(Utc::now(), limit).await?;
        let mut reports = Vec::with_capacity(due.len());

        for template in due {
            match self.expand(&template).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(template_id = %template.id, "Expansion failed, will retry next run: {}", e),
            }
        }
        Ok(reports)
    }

    /// Materializes the next batch. Unavailable dates become gaps; any other
    /// error aborts before the checkpoint moves so the batch is retried whole.
    pub async fn expand(&self, template: &RecurringTemplate) -> Result<ExpansionReport, AppError> {
        let now = Utc::now();
        let today = now.with_timezone(&self.policy.venue_timezone).date_naive();
        let mut report = ExpansionReport {
            template_id: template.id.clone(),
            ..Default::default()
        };

        let window = expansion_window(template, today, self.policy.recurring_horizon_days);
        let mut generated_through = template.generated_through;

        if let Some((from, to)) = window {
            report.window_start = Some(from);
            report.window_end = Some(to);

            let existing: HashSet<NaiveDate> = self.reservation_repo
                .list_template_dates(&template.id, from, to)
                .await?
                .into_iter()
                .collect();

            for date in candidate_dates(template, from, to) {
                if existing.contains(&date) {
                    report.already_generated.push(date);
                    continue;
                }
                if slot_instant(self.policy.venue_timezone, date, template.start_time)? <= now {
                    continue;
                }

                let result = self.reservations.book(BookingRequest {
                    court_id: template.court_id.clone(),
                    date,
                    start_time: template.start_time,
                    end_time: template.end_time,
                    organizer_id: template.organizer_id.clone(),
                    participants: template.participants,
                    kind: ReservationKind::RecurringInstance,
                    price_override_cents: Some(template.occurrence_price_cents()),
                    credit_offset_cents: 0,
                    template_id: Some(template.id.clone()),
                    confirm: true,
                }).await;

                match result {
                    Ok(reservation) => report.created.push(reservation.id),
                    Err(AppError::SlotUnavailable(reason)) => {
                        let gap_reason = GapReason::from(&reason);
                        warn!(template_id = %template.id, date = %date, "Recurring date skipped: {}", reason);
                        self.recurring_repo.record_gap(&RecurringGap::new(template.id.clone(), date, gap_reason)).await?;
                        report.gaps.push((date, gap_reason));
                    }
                    Err(e) if e.is_conflict() => report.already_generated.push(date),
                    Err(e) => return Err(e),
                }
            }

            generated_through = Some(to);
        }

        let ended = template.ends_on.is_some_and(|end| end < today || generated_through.is_some_and(|g| g >= end));
        let update = CheckpointUpdate {
            template_id: template.id.clone(),
            expected_next_generation_at: template.next_generation_at,
            generated_through,
            created_count: report.created.len() as i64,
            next_generation_at: now + Duration::hours(self.policy.recurring_checkpoint_hours),
            status: if ended { TemplateStatus::Ended } else { template.status },
        };

        if !self.recurring_repo.advance_checkpoint(&update).await? {
            warn!(template_id = %template.id, "Checkpoint moved by a concurrent run");
        }
        report.ended = ended;

        if !report.created.is_empty() {
            self.reservations.after_confirmation_of(&template.organizer_id).await;
        }

        info!(
            template_id = %template.id,
            created = report.created.len(),
            gaps = report.gaps.len(),
            skipped = report.already_generated.len(),
            "Recurring expansion finished"
        );
        Ok(report)
    }

    async fn find(&self, id: &str) -> Result<RecurringTemplate, AppError> {
        self.recurring_repo.find_by_id(id).await?
            .ok_or(AppError::NotFound("Recurring template not found".into()))
    }
}

fn authorize(actor: &Identity, template: &RecurringTemplate) -> Result<(), AppError> {
    if actor.is_manager() || actor.account_id == template.organizer_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not your recurring template".into()))
    }
}

use std::sync::Arc;
use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::domain::models::blackout::{Blackout, NewBlackoutParams};
use crate::domain::models::court::{Court, CourtStatus};
use crate::domain::models::schedule::{NewSlotParams, ScheduleSlot};
use crate::domain::ports::{BlackoutRepository, CourtRepository, ReservationRepository};
use crate::domain::services::catalog_cache::CatalogCache;
use crate::error::AppError;

pub struct NewCourt {
    pub name: String,
    pub modality: String,
    pub max_occupancy: i32,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct CourtChanges {
    pub name: Option<String>,
    pub modality: Option<String>,
    pub max_occupancy: Option<i32>,
    pub status: Option<CourtStatus>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct SlotChanges {
    pub weekday: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub casual_price_cents: Option<i64>,
    pub subscriber_price_cents: Option<i64>,
    pub active: Option<bool>,
}

pub struct NewBlackout {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
}

/// Writes to the schedule catalog and blackout registry. Every write drops the
/// court's cached catalog.
pub struct CatalogService {
    court_repo: Arc<dyn CourtRepository>,
    blackout_repo: Arc<dyn BlackoutRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    cache: Arc<CatalogCache>,
    venue_timezone: Tz,
}

impl CatalogService {
    pub fn new(
        court_repo: Arc<dyn CourtRepository>,
        blackout_repo: Arc<dyn BlackoutRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        cache: Arc<CatalogCache>,
        venue_timezone: Tz,
    ) -> Self {
        Self { court_repo, blackout_repo, reservation_repo, cache, venue_timezone }
    }

    pub async fn create_court(&self, req: NewCourt) -> Result<Court, AppError> {
        validate_court(&req.name, &req.modality, req.max_occupancy)?;
        let mut court = Court::new(req.name, req.modality, req.max_occupancy);
        court.description = req.description;

        let created = self.court_repo.create(&court).await?;
        info!(court_id = %created.id, "Court created: {}", created.name);
        Ok(created)
    }

    pub async fn get_court(&self, court_id: &str) -> Result<Court, AppError> {
        self.court_repo.find_by_id(court_id).await?
            .ok_or(AppError::NotFound("Court not found".into()))
    }

    pub async fn list_courts(&self) -> Result<Vec<Court>, AppError> {
        self.court_repo.list().await
    }

    pub async fn update_court(&self, court_id: &str, changes: CourtChanges) -> Result<Court, AppError> {
        let mut court = self.get_court(court_id).await?;

        if let Some(name) = changes.name { court.name = name; }
        if let Some(modality) = changes.modality { court.modality = modality; }
        if let Some(max) = changes.max_occupancy { court.max_occupancy = max; }
        if let Some(status) = changes.status { court.status = status; }
        if changes.description.is_some() { court.description = changes.description; }
        validate_court(&court.name, &court.modality, court.max_occupancy)?;
        court.updated_at = Utc::now();

        let updated = self.court_repo.update(&court).await?;
        self.cache.invalidate(court_id);
        info!(court_id = %court_id, status = %updated.status, "Court updated");
        Ok(updated)
    }

    pub async fn add_slot(&self, court_id: &str, params: NewSlotParams) -> Result<ScheduleSlot, AppError> {
        self.get_court(court_id).await?;
        let slot = ScheduleSlot::new(NewSlotParams { court_id: court_id.to_string(), ..params });
        validate_slot(&slot)?;
        self.ensure_no_overlap(&slot).await?;

        let created = self.court_repo.create_slot(&slot).await?;
        self.cache.invalidate(court_id);
        info!(court_id = %court_id, slot_id = %created.id, weekday = created.weekday, "Schedule slot added {}-{}", created.start_time, created.end_time);
        Ok(created)
    }

    pub async fn list_slots(&self, court_id: &str) -> Result<Vec<ScheduleSlot>, AppError> {
        self.get_court(court_id).await?;
        self.court_repo.list_slots(court_id).await
    }

    pub async fn update_slot(&self, slot_id: &str, changes: SlotChanges) -> Result<ScheduleSlot, AppError> {
        let mut slot = self.court_repo.find_slot(slot_id).await?
            .ok_or(AppError::NotFound("Schedule slot not found".into()))?;
        let before = slot.clone();

        if let Some(weekday) = changes.weekday { slot.weekday = weekday; }
        if let Some(start) = changes.start_time { slot.start_time = start; }
        if let Some(end) = changes.end_time { slot.end_time = end; }
        if let Some(price) = changes.casual_price_cents { slot.casual_price_cents = price; }
        if let Some(price) = changes.subscriber_price_cents { slot.subscriber_price_cents = price; }
        if let Some(active) = changes.active { slot.active = active; }
        validate_slot(&slot)?;
        if slot.active {
            self.ensure_no_overlap(&slot).await?;
        }

        // Upcoming reservations hold the slot's window; only prices may move under them.
        let reshaped = slot.weekday != before.weekday
            || slot.start_time != before.start_time
            || slot.end_time != before.end_time
            || (before.active && !slot.active);
        if reshaped {
            let today = Utc::now().with_timezone(&self.venue_timezone).date_naive();
            if self.reservation_repo.has_live_for_slot_from(slot_id, today).await? {
                warn!(slot_id = %slot_id, "Slot change refused: upcoming reservations still hold it");
                return Err(AppError::Conflict(
                    "Slot has upcoming reservations; cancel them before moving or retiring it".into(),
                ));
            }
        }

        let updated = self.court_repo.update_slot(&slot).await?;
        self.cache.invalidate(&updated.court_id);
        info!(slot_id = %slot_id, active = updated.active, "Schedule slot updated");
        Ok(updated)
    }

    pub async fn add_blackout(&self, court_id: &str, created_by: &str, req: NewBlackout) -> Result<Blackout, AppError> {
        self.get_court(court_id).await?;
        let blackout = Blackout::new(NewBlackoutParams {
            court_id: court_id.to_string(),
            start_date: req.start_date,
            end_date: req.end_date,
            start_time: req.start_time,
            end_time: req.end_time,
            reason: req.reason,
            created_by: created_by.to_string(),
        })?;

        let created = self.blackout_repo.create(&blackout).await?;
        self.cache.invalidate(court_id);
        info!(
            court_id = %court_id,
            blackout_id = %created.id,
            "Blackout declared {}..={}: {}", created.start_date, created.end_date, created.reason
        );
        Ok(created)
    }

    pub async fn list_blackouts(&self, court_id: &str) -> Result<Vec<Blackout>, AppError> {
        self.get_court(court_id).await?;
        self.blackout_repo.list_by_court(court_id).await
    }

    pub async fn remove_blackout(&self, blackout_id: &str) -> Result<(), AppError> {
        let blackout = self.blackout_repo.find_by_id(blackout_id).await?
            .ok_or(AppError::NotFound("Blackout not found".into()))?;
        self.blackout_repo.delete(blackout_id).await?;
        self.cache.invalidate(&blackout.court_id);
        info!(court_id = %blackout.court_id, blackout_id = %blackout_id, "Blackout removed");
        Ok(())
    }

    async fn ensure_no_overlap(&self, slot: &ScheduleSlot) -> Result<(), AppError> {
        let existing = self.court_repo.list_slots(&slot.court_id).await?;
        if let Some(clash) = existing.iter().find(|s| s.active && s.id != slot.id && s.overlaps(slot)) {
            return Err(AppError::Conflict(format!(
                "Slot overlaps {} {}-{} on weekday {}",
                clash.id, clash.start_time, clash.end_time, clash.weekday
            )));
        }
        Ok(())
    }
}

fn validate_court(name: &str, modality: &str, max_occupancy: i32) -> Result<(), AppError> {
    if name.trim().is_empty() || modality.trim().is_empty() {
        return Err(AppError::Validation("Court name and modality are required".into()));
    }
    if max_occupancy < 1 {
        return Err(AppError::Validation("Maximum occupancy must be at least 1".into()));
    }
    Ok(())
}

fn validate_slot(slot: &ScheduleSlot) -> Result<(), AppError> {
    if !(0..7).contains(&slot.weekday) {
        return Err(AppError::Validation("Weekday must be between 0 (Sunday) and 6 (Saturday)".into()));
    }
    if slot.end_time <= slot.start_time {
        return Err(AppError::Validation("Slot end time must be after its start time".into()));
    }
    if slot.casual_price_cents < 0 || slot.subscriber_price_cents < 0 {
        return Err(AppError::Validation("Prices must not be negative".into()));
    }
    Ok(())
}

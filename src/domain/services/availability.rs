use std::sync::Arc;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::models::availability::{Availability, GridCell, GridDay, Unavailability, WeeklyGrid};
use crate::domain::models::blackout::Blackout;
use crate::domain::models::court::Court;
use crate::domain::models::reservation::Reservation;
use crate::domain::models::schedule::{weekday_index, ScheduleSlot};
use crate::domain::ports::ReservationRepository;
use crate::domain::services::catalog_cache::CatalogCache;
use crate::error::AppError;

/// Resolves a venue-local slot start to an instant. Skipped local times (DST gaps) are rejected.
pub fn slot_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, AppError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(AppError::Validation("Invalid local time (skipped due to DST)".into()))
}

pub fn find_slot<'a>(slots: &'a [ScheduleSlot], date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<&'a ScheduleSlot> {
    slots.iter().find(|s| s.is_offered_on(date) && s.matches_window(start, end))
}

pub fn blackout_rule(blackouts: &[Blackout], date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Unavailability> {
    blackouts
        .iter()
        .find(|b| b.blocks(date, start, end))
        .map(|b| Unavailability::BlockedByBlackout {
            blackout_id: b.id.clone(),
            reason: b.reason.clone(),
        })
}

/// Court status, then schedule, then blackouts, then live reservations.
pub fn evaluate(
    court: &Court,
    slots: &[ScheduleSlot],
    blackouts: &[Blackout],
    reservations: &[Reservation],
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Availability {
    if !court.is_bookable() {
        return Availability::Unavailable(Unavailability::CourtUnavailable { court_status: court.status });
    }

    let Some(slot) = find_slot(slots, date, start, end) else {
        return Availability::Unavailable(Unavailability::OutsideSchedule);
    };

    if let Some(blocked) = blackout_rule(blackouts, date, start, end) {
        return Availability::Unavailable(blocked);
    }

    if let Some(taken) = reservations
        .iter()
        .find(|r| r.status.is_active() && r.court_id == court.id && r.date == date && r.start_time < end && start < r.end_time)
    {
        return Availability::Unavailable(Unavailability::TakenByReservation { reservation_id: taken.id.clone() });
    }

    Availability::Available {
        slot_id: slot.id.clone(),
        casual_price_cents: slot.casual_price_cents,
        subscriber_price_cents: slot.subscriber_price_cents,
    }
}

pub fn weekly_grid(
    court: &Court,
    slots: &[ScheduleSlot],
    blackouts: &[Blackout],
    reservations: &[Reservation],
    start: NaiveDate,
) -> WeeklyGrid {
    let days = (0..7)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let mut offered: Vec<&ScheduleSlot> = slots.iter().filter(|s| s.is_offered_on(date)).collect();
            offered.sort_by_key(|s| s.start_time);

            let cells = offered
                .into_iter()
                .map(|slot| GridCell {
                    slot_id: slot.id.clone(),
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    casual_price_cents: slot.casual_price_cents,
                    subscriber_price_cents: slot.subscriber_price_cents,
                    availability: evaluate(court, slots, blackouts, reservations, date, slot.start_time, slot.end_time),
                })
                .collect();

            GridDay { date, weekday: weekday_index(date), slots: cells }
        })
        .collect();

    WeeklyGrid { court_id: court.id.clone(), start, days }
}

/// Read-side wrapper: catalog and blackouts from the cache, reservations always fresh.
pub struct AvailabilityService {
    catalog: Arc<CatalogCache>,
    reservation_repo: Arc<dyn ReservationRepository>,
}

impl AvailabilityService {
    pub fn new(catalog: Arc<CatalogCache>, reservation_repo: Arc<dyn ReservationRepository>) -> Self {
        Self { catalog, reservation_repo }
    }

    pub async fn check(&self, court_id: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Availability, AppError> {
        if end <= start {
            return Err(AppError::Validation("End time must be after start time".into()));
        }

        let catalog = self.catalog.get(court_id).await?;
        let reservations = self.reservation_repo.list_active_in_range(court_id, date, date).await?;

        Ok(evaluate(&catalog.court, &catalog.slots, &catalog.blackouts, &reservations, date, start, end))
    }

    pub async fn weekly_grid(&self, court_id: &str, start: NaiveDate) -> Result<WeeklyGrid, AppError> {
        let catalog = self.catalog.get(court_id).await?;
        let reservations = self.reservation_repo
            .list_active_in_range(court_id, start, start + Duration::days(6))
            .await?;

        Ok(weekly_grid(&catalog.court, &catalog.slots, &catalog.blackouts, &reservations, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::blackout::NewBlackoutParams;
    use crate::domain::models::court::CourtStatus;
    use crate::domain::models::reservation::{NewReservationParams, ReservationKind, ReservationStatus};
    use crate::domain::models::schedule::NewSlotParams;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    // 2025-06-07 is a Saturday.
    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()
    }

    fn society_one() -> (Court, Vec<ScheduleSlot>) {
        let court = Court::new("Society 1".into(), "society".into(), 14);
        let slots = vec![
            ScheduleSlot::new(NewSlotParams {
                court_id: court.id.clone(),
                weekday: 6,
                start_time: t("19:00"),
                end_time: t("20:00"),
                casual_price_cents: 15000,
                subscriber_price_cents: 12000,
            }),
            ScheduleSlot::new(NewSlotParams {
                court_id: court.id.clone(),
                weekday: 6,
                start_time: t("20:00"),
                end_time: t("21:00"),
                casual_price_cents: 15000,
                subscriber_price_cents: 12000,
            }),
        ];
        (court, slots)
    }

    fn full_day_blackout(court: &Court, date: NaiveDate) -> Blackout {
        Blackout::new(NewBlackoutParams {
            court_id: court.id.clone(),
            start_date: date,
            end_date: date,
            start_time: None,
            end_time: None,
            reason: "Tournament".into(),
            created_by: "manager".into(),
        })
        .unwrap()
    }

    fn reservation(court: &Court, slot: &ScheduleSlot, date: NaiveDate) -> Reservation {
        Reservation::new(NewReservationParams {
            court_id: court.id.clone(),
            slot_id: slot.id.clone(),
            date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            organizer_id: "org".into(),
            participants: 10,
            total_cents: slot.casual_price_cents,
            credit_applied_cents: 0,
            kind: ReservationKind::Casual,
            template_id: None,
            confirmed: false,
        })
    }

    #[test]
    fn test_full_day_blackout_blocks_the_saturday_slot() {
        let (court, slots) = society_one();
        let blackouts = vec![full_day_blackout(&court, saturday())];

        let result = evaluate(&court, &slots, &blackouts, &[], saturday(), t("19:00"), t("20:00"));
        assert!(matches!(
            result,
            Availability::Unavailable(Unavailability::BlockedByBlackout { ref reason, .. }) if reason == "Tournament"
        ));
    }

    #[test]
    fn test_window_must_match_a_slot_exactly() {
        let (court, slots) = society_one();
        let partial = evaluate(&court, &slots, &[], &[], saturday(), t("19:00"), t("19:30"));
        assert_eq!(partial, Availability::Unavailable(Unavailability::OutsideSchedule));

        let sunday = saturday() + Duration::days(1);
        let wrong_day = evaluate(&court, &slots, &[], &[], sunday, t("19:00"), t("20:00"));
        assert_eq!(wrong_day, Availability::Unavailable(Unavailability::OutsideSchedule));
    }

    #[test]
    fn test_live_reservation_takes_the_slot_but_cancelled_does_not() {
        let (court, slots) = society_one();
        let mut existing = reservation(&court, &slots[0], saturday());

        let taken = evaluate(&court, &slots, &[], std::slice::from_ref(&existing), saturday(), t("19:00"), t("20:00"));
        assert_eq!(taken, Availability::Unavailable(Unavailability::TakenByReservation { reservation_id: existing.id.clone() }));

        existing.status = ReservationStatus::Cancelled;
        let freed = evaluate(&court, &slots, &[], &[existing], saturday(), t("19:00"), t("20:00"));
        assert!(freed.is_available());
    }

    #[test]
    fn test_reservation_on_a_replaced_slot_still_holds_the_window() {
        let (court, slots) = society_one();
        let existing = reservation(&court, &slots[0], saturday());

        let replacement = ScheduleSlot::new(NewSlotParams {
            court_id: court.id.clone(),
            weekday: 6,
            start_time: t("19:00"),
            end_time: t("20:00"),
            casual_price_cents: 18000,
            subscriber_price_cents: 14000,
        });
        let result = evaluate(&court, &[replacement], &[], &[existing.clone()], saturday(), t("19:00"), t("20:00"));
        assert_eq!(result, Availability::Unavailable(Unavailability::TakenByReservation { reservation_id: existing.id }));
    }

    #[test]
    fn test_court_status_is_checked_first() {
        let (mut court, slots) = society_one();
        court.status = CourtStatus::Maintenance;
        let blackouts = vec![full_day_blackout(&court, saturday())];

        let result = evaluate(&court, &slots, &blackouts, &[], saturday(), t("19:00"), t("20:00"));
        assert_eq!(
            result,
            Availability::Unavailable(Unavailability::CourtUnavailable { court_status: CourtStatus::Maintenance })
        );
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let (court, slots) = society_one();
        let existing = vec![reservation(&court, &slots[1], saturday())];
        let first = evaluate(&court, &slots, &[], &existing, saturday(), t("20:00"), t("21:00"));
        let second = evaluate(&court, &slots, &[], &existing, saturday(), t("20:00"), t("21:00"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_weekly_grid_lists_each_day_with_its_slots() {
        let (court, slots) = society_one();
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let existing = vec![reservation(&court, &slots[1], saturday())];

        let grid = weekly_grid(&court, &slots, &[], &existing, monday);
        assert_eq!(grid.days.len(), 7);

        let sat = grid.days.iter().find(|d| d.date == saturday()).unwrap();
        assert_eq!(sat.weekday, 6);
        assert_eq!(sat.slots.len(), 2);
        assert!(sat.slots[0].availability.is_available());
        assert!(!sat.slots[1].availability.is_available());
        assert!(grid.days.iter().filter(|d| d.date != saturday()).all(|d| d.slots.is_empty()));
    }

    #[test]
    fn test_slot_instant_uses_venue_time() {
        let tz = chrono_tz::America::Sao_Paulo;
        let instant = slot_instant(tz, saturday(), t("19:00")).unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-06-07T22:00:00+00:00");
    }
}

//! Availability resolver.
//!
//! Answers the two questions every booking write depends on: what does a
//! studio's calendar look like over a date range, and is a candidate
//! interval free. The conflict *query* here is advisory (for display and
//! slot checks); the authoritative check happens inside the store's atomic
//! reserve.

use crate::error::{DomainError, DomainResult};
use crate::interval::{self, SlotCalendar};
use crate::store::BookingStore;
use crate::types::{BookingId, StudioId};
use chrono::{DateTime, NaiveDate, Utc};

/// Why a candidate slot is not bookable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The slot start has already passed
    InThePast,
    /// The interval falls outside studio opening hours
    OutsideOpeningHours,
    /// A non-cancelled booking overlaps the interval
    Conflict,
}

/// Result of a slot check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SlotCheck {
    /// Whether the interval can be booked
    pub available: bool,
    /// Why not, when unavailable
    pub reason: Option<UnavailableReason>,
}

/// True iff any non-cancelled booking of the studio (other than
/// `exclude`) overlaps `[start, end)`.
///
/// # Errors
///
/// Propagates store failures as [`DomainError::Dependency`].
pub async fn has_conflict(
    store: &dyn BookingStore,
    studio_id: StudioId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<BookingId>,
) -> DomainResult<bool> {
    let bookings = store
        .list_bookings_for_studio(studio_id, start, end)
        .await
        .map_err(DomainError::from)?;

    Ok(bookings.iter().any(|b| {
        Some(b.id) != exclude
            && b.occupies_interval()
            && interval::overlaps(b.start, b.end, start, end)
    }))
}

/// Hourly availability calendar for `[first_day, last_day]`, lazily
/// evaluated per day.
///
/// # Errors
///
/// Returns [`DomainError::StudioNotFound`] for an unknown studio and
/// [`DomainError::Validation`] for an inverted date range.
pub async fn studio_calendar(
    store: &dyn BookingStore,
    studio_id: StudioId,
    first_day: NaiveDate,
    last_day: NaiveDate,
    now: DateTime<Utc>,
) -> DomainResult<SlotCalendar> {
    if last_day < first_day {
        return Err(DomainError::Validation(
            "date range end must not precede its start".to_string(),
        ));
    }
    if store
        .get_studio(studio_id)
        .await
        .map_err(DomainError::from)?
        .is_none()
    {
        return Err(DomainError::StudioNotFound(studio_id));
    }

    let range_start = first_day
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::Validation("invalid range start".to_string()))?;
    let range_end = last_day
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::Validation("invalid range end".to_string()))?;

    let busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = store
        .list_bookings_for_studio(studio_id, range_start, range_end)
        .await
        .map_err(DomainError::from)?
        .into_iter()
        .filter(crate::types::Booking::occupies_interval)
        .map(|b| (b.start, b.end))
        .collect();

    Ok(SlotCalendar::new(first_day, last_day, busy, now))
}

/// Checks whether `[start, end)` can be booked at `studio_id`.
///
/// # Errors
///
/// Returns [`DomainError::StudioNotFound`] for an unknown studio and
/// [`DomainError::Validation`] for a malformed interval.
pub async fn check_slot(
    store: &dyn BookingStore,
    studio_id: StudioId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DomainResult<SlotCheck> {
    if end <= start {
        return Err(DomainError::Validation(
            "slot end must be after start".to_string(),
        ));
    }
    if store
        .get_studio(studio_id)
        .await
        .map_err(DomainError::from)?
        .is_none()
    {
        return Err(DomainError::StudioNotFound(studio_id));
    }

    if start < now {
        return Ok(SlotCheck {
            available: false,
            reason: Some(UnavailableReason::InThePast),
        });
    }
    if !interval::within_opening_hours(start, end) {
        return Ok(SlotCheck {
            available: false,
            reason: Some(UnavailableReason::OutsideOpeningHours),
        });
    }
    if has_conflict(store, studio_id, start, end, None).await? {
        return Ok(SlotCheck {
            available: false,
            reason: Some(UnavailableReason::Conflict),
        });
    }

    Ok(SlotCheck {
        available: true,
        reason: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::types::{
        Booking, BookingStatus, CancellationPolicy, Money, PaymentStatus, Studio, UserId,
    };
    use chrono::{Duration, TimeZone};

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, h, 0, 0).single().unwrap()
    }

    fn studio() -> Studio {
        Studio {
            id: StudioId::new(),
            host_id: UserId::new(),
            name: "North Light".to_string(),
            hourly_rate: Money::from_euros(60),
            cancellation_policy: CancellationPolicy::Flexible,
            min_booking_hours: 1,
            max_booking_hours: 8,
            instant_book: true,
        }
    }

    fn booking(studio: &Studio, start: DateTime<Utc>, hours: i64) -> Booking {
        Booking {
            id: BookingId::new(),
            studio_id: studio.id,
            renter_id: UserId::new(),
            host_id: studio.host_id,
            start,
            end: start + Duration::hours(hours),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            total_hours: u32::try_from(hours).unwrap(),
            subtotal: Money::from_euros(120),
            service_fee: Money::from_euros(18),
            total_amount: Money::from_cents(13_800),
            host_payout: Money::from_euros(102),
            original_start: None,
            original_end: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: at(1, 0),
        }
    }

    #[tokio::test]
    async fn conflict_query_ignores_cancelled_and_excluded() {
        let store = InMemoryStore::new();
        let studio = studio();
        store.insert_studio(&studio).await.unwrap();

        let mut active = booking(&studio, at(10, 10), 2);
        store.insert_booking(&active).await.unwrap();

        assert!(has_conflict(&store, studio.id, at(10, 11), at(10, 13), None)
            .await
            .unwrap());
        // Excluding the conflicting booking itself (reschedule case)
        assert!(
            !has_conflict(&store, studio.id, at(10, 11), at(10, 13), Some(active.id))
                .await
                .unwrap()
        );

        active.status = BookingStatus::Cancelled;
        store.update_booking(&active).await.unwrap();
        assert!(!has_conflict(&store, studio.id, at(10, 11), at(10, 13), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn calendar_reflects_bookings_across_days() {
        let store = InMemoryStore::new();
        let studio = studio();
        store.insert_studio(&studio).await.unwrap();
        store
            .insert_booking(&booking(&studio, at(11, 9), 3))
            .await
            .unwrap();

        let calendar = studio_calendar(
            &store,
            studio.id,
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            at(1, 0),
        )
        .await
        .unwrap();

        let days: Vec<_> = calendar.collect();
        assert_eq!(days.len(), 3);

        // Day one fully free, day two blocked 09:00-12:00.
        assert!(days[0].slots.iter().all(|s| s.available));
        let blocked: Vec<_> = days[1].slots.iter().filter(|s| !s.available).collect();
        assert_eq!(blocked.len(), 3);
        assert_eq!(blocked[0].start, at(11, 9));
    }

    #[tokio::test]
    async fn calendar_rejects_unknown_studio_and_bad_range() {
        let store = InMemoryStore::new();
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

        assert!(matches!(
            studio_calendar(&store, StudioId::new(), day, day, at(1, 0)).await,
            Err(DomainError::StudioNotFound(_))
        ));

        let studio = studio();
        store.insert_studio(&studio).await.unwrap();
        assert!(matches!(
            studio_calendar(&store, studio.id, day, day.pred_opt().unwrap(), at(1, 0)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn slot_check_reports_reasons() {
        let store = InMemoryStore::new();
        let studio = studio();
        store.insert_studio(&studio).await.unwrap();
        store
            .insert_booking(&booking(&studio, at(10, 10), 2))
            .await
            .unwrap();
        let now = at(5, 12);

        let past = check_slot(&store, studio.id, at(4, 10), at(4, 12), now)
            .await
            .unwrap();
        assert_eq!(past.reason, Some(UnavailableReason::InThePast));

        let after_hours = check_slot(&store, studio.id, at(10, 6), at(10, 7), now)
            .await
            .unwrap();
        assert_eq!(after_hours.reason, Some(UnavailableReason::OutsideOpeningHours));

        let conflicted = check_slot(&store, studio.id, at(10, 11), at(10, 13), now)
            .await
            .unwrap();
        assert_eq!(conflicted.reason, Some(UnavailableReason::Conflict));

        let free = check_slot(&store, studio.id, at(10, 13), at(10, 15), now)
            .await
            .unwrap();
        assert!(free.available);
        assert_eq!(free.reason, None);
    }
}

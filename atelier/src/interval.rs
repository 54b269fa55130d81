//! Interval arithmetic: overlap detection, billable duration, and hourly
//! slot generation.
//!
//! All intervals are half-open `[start, end)`: the end instant is excluded,
//! so back-to-back bookings never conflict.

use crate::types::{DaySlots, TimeSlot};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

/// First bookable hour of a studio day.
pub const OPEN_HOUR: u32 = 8;

/// First hour past the bookable day (slots end here).
pub const CLOSE_HOUR: u32 = 22;

/// Hourly slots per studio day.
pub const SLOTS_PER_DAY: u32 = CLOSE_HOUR - OPEN_HOUR;

/// Half-open interval overlap test.
///
/// `[a_start, a_end)` and `[b_start, b_end)` overlap iff
/// `a_start < b_end && b_start < a_end`. Touching intervals
/// (`a_end == b_start`) do not overlap. This is the single predicate used
/// everywhere conflicts are checked.
#[must_use]
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Billable hours of an interval: the ceiling of its duration in hours.
///
/// A started hour bills as a full hour; 90 minutes bill as 2. Non-positive
/// durations yield 0 (rejected upstream by validation).
#[must_use]
pub fn billable_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Positive and bounded by the max booking duration
    {
        (seconds as u64).div_ceil(3600) as u32
    }
}

/// Lazy calendar of hourly availability slots.
///
/// Yields one [`DaySlots`] per calendar day of the inclusive range. Slots are
/// computed on demand against a pre-fetched list of busy intervals; cloning
/// the calendar restarts iteration from the first day.
#[derive(Clone, Debug)]
pub struct SlotCalendar {
    next_day: NaiveDate,
    last_day: NaiveDate,
    busy: std::sync::Arc<[(DateTime<Utc>, DateTime<Utc>)]>,
    now: DateTime<Utc>,
}

impl SlotCalendar {
    /// Creates a calendar for the inclusive day range `[first_day, last_day]`.
    ///
    /// `busy` holds the intervals of non-cancelled bookings; `now` is the
    /// reference instant below which slots are unavailable.
    #[must_use]
    pub fn new(
        first_day: NaiveDate,
        last_day: NaiveDate,
        busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            next_day: first_day,
            last_day,
            busy: busy.into(),
            now,
        }
    }

    fn slots_for(&self, day: NaiveDate) -> DaySlots {
        let mut slots = Vec::with_capacity(SLOTS_PER_DAY as usize);
        for hour in OPEN_HOUR..CLOSE_HOUR {
            let Some(naive) = day.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            let start = naive.and_utc();
            let end = start + Duration::hours(1);
            let in_past = start < self.now;
            let conflicted = self
                .busy
                .iter()
                .any(|&(b_start, b_end)| overlaps(start, end, b_start, b_end));
            slots.push(TimeSlot {
                start,
                end,
                available: !in_past && !conflicted,
            });
        }
        DaySlots { date: day, slots }
    }
}

impl Iterator for SlotCalendar {
    type Item = DaySlots;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_day > self.last_day {
            return None;
        }
        let day = self.next_day;
        self.next_day = day.succ_opt()?;
        Some(self.slots_for(day))
    }
}

/// True when `start` falls inside the studio opening hours and the interval
/// ends by closing time on the same day.
#[must_use]
pub fn within_opening_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let same_day = start.date_naive() == end.date_naive();
    let start_ok = start.hour() >= OPEN_HOUR;
    // 22:00 exactly is the last admissible end instant.
    let end_ok =
        end.hour() < CLOSE_HOUR || (end.hour() == CLOSE_HOUR && end.minute() == 0 && end.second() == 0);
    same_day && start_ok && end_ok
}

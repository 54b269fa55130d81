//! Persistence for studios and bookings.
//!
//! The store owns the one operation that needs a stronger guarantee than a
//! mutex over small values: the availability-conflict check and the
//! reservation write are a single atomic unit. [`memory::InMemoryStore`]
//! performs both under one critical section; [`postgres::PgBookingStore`]
//! takes a per-studio advisory lock inside the insert/update transaction.
//! Two concurrent requests for overlapping intervals therefore cannot both
//! observe "no conflict".

pub mod memory;
pub mod postgres;

use crate::error::DomainError;
use crate::types::{Booking, BookingId, Studio, StudioId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures reported by a booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A non-cancelled booking already overlaps the requested interval
    #[error("studio is already booked for the requested interval")]
    IntervalConflict,

    /// Referenced studio does not exist
    #[error("studio {0} not found")]
    StudioNotFound(StudioId),

    /// Referenced booking does not exist
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// A stored record failed validation on read (unknown status, bad amount)
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    /// The backing database failed or timed out
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IntervalConflict => {
                Self::Conflict("studio is already booked for the requested interval".to_string())
            }
            StoreError::StudioNotFound(id) => Self::StudioNotFound(id),
            StoreError::BookingNotFound(id) => Self::BookingNotFound(id),
            StoreError::Corrupt(msg) => Self::store(format!("corrupt record: {msg}")),
            StoreError::Backend(msg) => Self::store(msg),
        }
    }
}

/// Persistence operations the reservation core consumes.
///
/// `insert_booking` and `update_interval` perform the conflict check and the
/// write as one atomic unit; everything else is plain CRUD.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a studio.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the write fails.
    async fn insert_studio(&self, studio: &Studio) -> Result<(), StoreError>;

    /// Fetch a studio by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the read fails.
    async fn get_studio(&self, id: StudioId) -> Result<Option<Studio>, StoreError>;

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the read fails.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// All bookings of `studio_id` whose interval overlaps
    /// `[range_start, range_end)`, any status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the read fails.
    async fn list_bookings_for_studio(
        &self,
        studio_id: StudioId,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Insert a booking, atomically verifying no non-cancelled booking of
    /// the same studio overlaps its interval.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IntervalConflict`] when the interval is taken,
    /// [`StoreError::StudioNotFound`] for an unknown studio.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Persist a rescheduled booking, atomically verifying the new interval
    /// conflicts with no non-cancelled booking other than itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IntervalConflict`] when the new interval is
    /// taken, [`StoreError::BookingNotFound`] for an unknown booking.
    async fn update_interval(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Persist status, payment, and cancellation fields of a booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BookingNotFound`] for an unknown booking.
    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Confirmed bookings whose end has passed, for the completion sweep.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the read fails.
    async fn list_elapsed_confirmed(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError>;
}

//! In-memory booking store.
//!
//! Single-process deployments and tests. One mutex guards both maps, so the
//! conflict check and the write of `insert_booking`/`update_interval` happen
//! inside the same critical section - the store never observes a half-done
//! reservation.

use super::{BookingStore, StoreError};
use crate::interval::overlaps;
use crate::types::{Booking, BookingId, Studio, StudioId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    studios: HashMap<StudioId, Studio>,
    bookings: HashMap<BookingId, Booking>,
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn conflict_exists(
        inner: &Inner,
        studio_id: StudioId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<BookingId>,
    ) -> bool {
        inner.bookings.values().any(|existing| {
            existing.studio_id == studio_id
                && Some(existing.id) != exclude
                && existing.occupies_interval()
                && overlaps(existing.start, existing.end, start, end)
        })
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_studio(&self, studio: &Studio) -> Result<(), StoreError> {
        self.lock().studios.insert(studio.id, studio.clone());
        Ok(())
    }

    async fn get_studio(&self, id: StudioId) -> Result<Option<Studio>, StoreError> {
        Ok(self.lock().studios.get(&id).cloned())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock().bookings.get(&id).cloned())
    }

    async fn list_bookings_for_studio(
        &self,
        studio_id: StudioId,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let inner = self.lock();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| {
                b.studio_id == studio_id && overlaps(b.start, b.end, range_start, range_end)
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        // Check and insert under one guard: this is the atomicity the
        // overlap invariant depends on.
        let mut inner = self.lock();
        if !inner.studios.contains_key(&booking.studio_id) {
            return Err(StoreError::StudioNotFound(booking.studio_id));
        }
        if Self::conflict_exists(&inner, booking.studio_id, booking.start, booking.end, None) {
            return Err(StoreError::IntervalConflict);
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_interval(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.bookings.contains_key(&booking.id) {
            return Err(StoreError::BookingNotFound(booking.id));
        }
        if Self::conflict_exists(
            &inner,
            booking.studio_id,
            booking.start,
            booking.end,
            Some(booking.id),
        ) {
            return Err(StoreError::IntervalConflict);
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.bookings.contains_key(&booking.id) {
            return Err(StoreError::BookingNotFound(booking.id));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn list_elapsed_confirmed(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .bookings
            .values()
            .filter(|b| b.status == crate::types::BookingStatus::Confirmed && b.end <= now)
            .cloned()
            .collect())
    }
}

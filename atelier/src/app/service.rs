//! Booking service: the operations exposed to callers.
//!
//! Guard violations surface before any side effect. The one ordering rule
//! on the cancel path: the status transition commits first with the locally
//! computed refund decision, then the gateway call runs, and its outcome is
//! recorded separately - a failed refund never rolls back a cancellation
//! the user is waiting on.

use crate::aggregates::booking::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, CompletionTrigger,
    build_booking,
};
use crate::availability::{self, SlotCheck};
use crate::error::{DomainError, DomainResult};
use crate::metrics;
use crate::notify::{Notification, NotificationDispatcher, NotificationKind};
use crate::payment_gateway::PaymentGateway;
use crate::store::BookingStore;
use crate::types::{
    Booking, BookingId, DaySlots, Money, PaymentStatus, RefundDecision, StudioId, UserId,
};
use atelier_core::effect::Effect;
use atelier_core::environment::Clock;
use atelier_core::reducer::Reducer;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Result of a cancellation, including the partial-success case where the
/// booking is cancelled but the gateway refund is pending reconciliation.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CancellationOutcome {
    /// The cancelled booking
    pub booking: Booking,
    /// Refund computed at cancellation time
    pub refund: RefundDecision,
    /// Whether the gateway executed the refund
    pub refund_issued: bool,
}

/// The reservation operations exposed to the HTTP layer.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    reducer: BookingReducer,
    fee_basis_points: u32,
    gateway_timeout: Duration,
}

impl BookingService {
    /// Creates the service over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        fee_basis_points: u32,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            notifications,
            clock,
            reducer: BookingReducer::new(),
            fee_basis_points,
            gateway_timeout,
        }
    }

    fn environment(&self) -> BookingEnvironment {
        BookingEnvironment::new(Arc::clone(&self.clock), Arc::clone(&self.notifications))
    }

    /// Effects run detached: they are best-effort and never feed back into
    /// the request that produced them.
    fn spawn_effects<I>(effects: I)
    where
        I: IntoIterator<Item = Effect<BookingAction>>,
    {
        for effect in effects {
            if let Effect::Future(fut) = effect {
                tokio::spawn(fut);
            }
        }
    }

    fn notify_detached(&self, notification: Notification) {
        let dispatcher = Arc::clone(&self.notifications);
        tokio::spawn(async move {
            dispatcher.deliver(notification).await;
        });
    }

    async fn load_state(&self, booking_id: BookingId) -> DomainResult<BookingState> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await
            .map_err(DomainError::from)?
            .ok_or(DomainError::BookingNotFound(booking_id))?;
        let studio = self
            .store
            .get_studio(booking.studio_id)
            .await
            .map_err(DomainError::from)?
            .ok_or(DomainError::StudioNotFound(booking.studio_id))?;
        Ok(BookingState::new(booking, &studio, self.fee_basis_points))
    }

    /// Create a booking of `studio_id` for `[start, end)` on behalf of
    /// `renter`.
    ///
    /// The conflict check and the insert are one atomic store operation;
    /// under concurrent requests for overlapping intervals exactly one
    /// create succeeds.
    ///
    /// # Errors
    ///
    /// `StudioNotFound`, `Validation` for malformed intervals, `Conflict`
    /// when the interval is taken.
    pub async fn create_booking(
        &self,
        renter: UserId,
        studio_id: StudioId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Booking> {
        let studio = self
            .store
            .get_studio(studio_id)
            .await
            .map_err(DomainError::from)?
            .ok_or(DomainError::StudioNotFound(studio_id))?;

        let booking = build_booking(
            &studio,
            renter,
            start,
            end,
            self.fee_basis_points,
            self.clock.now(),
        )?;

        self.store
            .insert_booking(&booking)
            .await
            .map_err(DomainError::from)?;

        metrics::record_booking_event("created");
        tracing::info!(
            booking_id = %booking.id,
            studio_id = %studio_id,
            status = booking.status.as_str(),
            total_amount = %booking.total_amount,
            "Booking created"
        );

        self.notify_detached(Notification {
            user_id: studio.host_id,
            kind: NotificationKind::BookingRequested,
            title: "New booking request".to_string(),
            message: format!(
                "{} was requested for {} - {}",
                studio.name, booking.start, booking.end
            ),
            link: Some(format!("/bookings/{}", booking.id)),
        });

        Ok(booking)
    }

    /// Host confirms a pending booking.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `InvalidTransition`/`Conflict` for guard
    /// violations.
    pub async fn confirm_booking(&self, by: UserId, booking_id: BookingId) -> DomainResult<Booking> {
        let mut state = self.load_state(booking_id).await?;
        let effects =
            self.reducer
                .reduce(&mut state, BookingAction::Confirm { by }, &self.environment());

        if let Some(error) = state.last_error.take() {
            return Err(error.into_domain());
        }

        self.store
            .update_booking(&state.booking)
            .await
            .map_err(DomainError::from)?;

        metrics::record_booking_event("confirmed");
        tracing::info!(booking_id = %booking_id, "Booking confirmed");
        Self::spawn_effects(effects);
        Ok(state.booking)
    }

    /// Renter or host cancels a booking.
    ///
    /// # Errors
    ///
    /// `Forbidden` for strangers, `InvalidTransition` on terminal statuses.
    pub async fn cancel_booking(
        &self,
        by: UserId,
        booking_id: BookingId,
        reason: String,
    ) -> DomainResult<CancellationOutcome> {
        let mut state = self.load_state(booking_id).await?;
        let was_paid = state.booking.payment_status == PaymentStatus::Paid;
        let effects = self.reducer.reduce(
            &mut state,
            BookingAction::Cancel { by, reason },
            &self.environment(),
        );

        if let Some(error) = state.last_error.take() {
            return Err(error.into_domain());
        }

        let refund = state.last_refund.unwrap_or(RefundDecision {
            percent: 0,
            amount: Money::ZERO,
        });

        // Commit the transition before touching the gateway.
        self.store
            .update_booking(&state.booking)
            .await
            .map_err(DomainError::from)?;
        metrics::record_booking_event("cancelled");

        let refund_issued = if was_paid && refund.amount > Money::ZERO {
            self.issue_refund(&mut state, refund).await
        } else {
            false
        };

        tracing::info!(
            booking_id = %booking_id,
            refund_percent = refund.percent,
            refund_amount = %refund.amount,
            refund_issued,
            "Booking cancelled"
        );
        Self::spawn_effects(effects);

        Ok(CancellationOutcome {
            booking: state.booking,
            refund,
            refund_issued,
        })
    }

    /// Runs the gateway refund after the cancellation has committed.
    /// Returns whether the money actually moved.
    async fn issue_refund(&self, state: &mut BookingState, refund: RefundDecision) -> bool {
        let reference = state.booking.id.to_string();
        let call = self.gateway.refund_payment(&reference, refund.amount);

        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(Ok(receipt)) => {
                state.booking.payment_status = PaymentStatus::Refunded;
                if let Err(err) = self.store.update_booking(&state.booking).await {
                    tracing::error!(
                        booking_id = %state.booking.id,
                        error = %err,
                        "Refund issued but payment status update failed"
                    );
                }
                metrics::record_refund_issued(refund.amount.cents());
                tracing::info!(
                    booking_id = %state.booking.id,
                    transaction_id = %receipt.transaction_id,
                    amount = %refund.amount,
                    "Refund issued"
                );
                true
            }
            Ok(Err(err)) => {
                metrics::record_refund_failure();
                tracing::error!(
                    booking_id = %state.booking.id,
                    amount = %refund.amount,
                    error = %err,
                    "Gateway refund failed, pending reconciliation"
                );
                false
            }
            Err(_) => {
                metrics::record_refund_failure();
                tracing::error!(
                    booking_id = %state.booking.id,
                    amount = %refund.amount,
                    timeout_secs = self.gateway_timeout.as_secs(),
                    "Gateway refund timed out, pending reconciliation"
                );
                false
            }
        }
    }

    /// Renter moves a booking to a new interval.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-renters, `InvalidTransition` inside the 24h
    /// window, `Conflict` when the new interval is taken.
    pub async fn reschedule_booking(
        &self,
        by: UserId,
        booking_id: BookingId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> DomainResult<Booking> {
        let mut state = self.load_state(booking_id).await?;
        let effects = self.reducer.reduce(
            &mut state,
            BookingAction::Reschedule {
                by,
                new_start,
                new_end,
            },
            &self.environment(),
        );

        if let Some(error) = state.last_error.take() {
            return Err(error.into_domain());
        }

        // The store re-checks the new interval (excluding this booking)
        // inside its critical section before persisting.
        self.store
            .update_interval(&state.booking)
            .await
            .map_err(DomainError::from)?;

        metrics::record_booking_event("rescheduled");
        tracing::info!(
            booking_id = %booking_id,
            new_start = %new_start,
            new_end = %new_end,
            "Booking rescheduled"
        );
        Self::spawn_effects(effects);
        Ok(state.booking)
    }

    /// Marks a confirmed booking completed.
    ///
    /// Driven by the periodic sweep (`Elapsed`) or by a submitted review.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` for unconfirmed or not-yet-ended bookings.
    pub async fn complete_booking(
        &self,
        booking_id: BookingId,
        trigger: CompletionTrigger,
    ) -> DomainResult<Booking> {
        let mut state = self.load_state(booking_id).await?;
        let effects = self.reducer.reduce(
            &mut state,
            BookingAction::Complete { trigger },
            &self.environment(),
        );

        if let Some(error) = state.last_error.take() {
            return Err(error.into_domain());
        }

        self.store
            .update_booking(&state.booking)
            .await
            .map_err(DomainError::from)?;
        metrics::record_booking_event("completed");
        Self::spawn_effects(effects);
        Ok(state.booking)
    }

    /// Completes every confirmed booking whose end has passed; returns how
    /// many were completed. Individual failures are logged and skipped.
    pub async fn sweep_completions(&self) -> usize {
        let elapsed = match self.store.list_elapsed_confirmed(self.clock.now()).await {
            Ok(bookings) => bookings,
            Err(err) => {
                tracing::warn!(error = %err, "Completion sweep could not list bookings");
                return 0;
            }
        };

        let mut completed = 0;
        for booking in elapsed {
            match self
                .complete_booking(booking.id, CompletionTrigger::Elapsed)
                .await
            {
                Ok(_) => completed += 1,
                Err(err) => {
                    tracing::warn!(booking_id = %booking.id, error = %err, "Completion sweep skipped booking");
                }
            }
        }
        if completed > 0 {
            tracing::info!(completed, "Completion sweep finished");
        }
        completed
    }

    /// Spawns the periodic completion sweep.
    pub fn spawn_completion_sweep(
        self: &Arc<Self>,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.sweep_completions().await;
            }
        })
    }

    /// Hourly availability for `[first_day, last_day]`.
    ///
    /// # Errors
    ///
    /// `StudioNotFound`, `Validation` for an inverted range.
    pub async fn get_availability(
        &self,
        studio_id: StudioId,
        first_day: NaiveDate,
        last_day: NaiveDate,
    ) -> DomainResult<Vec<DaySlots>> {
        let calendar = availability::studio_calendar(
            self.store.as_ref(),
            studio_id,
            first_day,
            last_day,
            self.clock.now(),
        )
        .await?;
        Ok(calendar.collect())
    }

    /// Checks whether one candidate interval is bookable.
    ///
    /// # Errors
    ///
    /// `StudioNotFound`, `Validation` for malformed intervals.
    pub async fn check_slot(
        &self,
        studio_id: StudioId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<SlotCheck> {
        availability::check_slot(self.store.as_ref(), studio_id, start, end, self.clock.now()).await
    }

    /// Fetch one booking.
    ///
    /// # Errors
    ///
    /// `BookingNotFound` for unknown ids.
    pub async fn get_booking(&self, booking_id: BookingId) -> DomainResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await
            .map_err(DomainError::from)?
            .ok_or(DomainError::BookingNotFound(booking_id))
    }
}

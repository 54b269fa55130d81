//! Booking lifecycle state machine.
//!
//! Owns the transitions of a single reservation:
//! creation → confirmation → rescheduling → cancellation/completion.
//!
//! The reducer is pure: guards, transitions, and the refund decision are
//! computed here; conflict checking lives in the store (atomically with the
//! write), and gateway/notification I/O is executed by the service from the
//! returned effects. Disallowed transitions record the precise violated
//! guard, never a generic failure.

use crate::error::DomainError;
use crate::notify::{Notification, NotificationDispatcher, NotificationKind};
use crate::pricing;
use crate::refund::refund_decision;
use crate::types::{
    Booking, BookingId, BookingQuote, BookingStatus, CancellationPolicy, Money, PaymentStatus,
    RefundDecision, Studio, UserId,
};
use atelier_core::{
    DateTime, SmallVec, Utc,
    effect::Effect,
    environment::Clock,
    reducer::{INLINE_EFFECTS, Reducer},
    smallvec,
};
use std::sync::Arc;

/// Hours before the original start under which rescheduling is refused.
pub const RESCHEDULE_WINDOW_HOURS: i64 = 24;

// ============================================================================
// Creation
// ============================================================================

/// Builds a new booking of `studio` for `[start, end)`.
///
/// Validates the interval (positive duration, not in the past, within
/// opening hours, within the studio's duration bounds) and computes the
/// monetary breakdown. The result starts in `Pending`, or `Confirmed`
/// immediately when the studio has instant booking enabled. The caller is
/// responsible for the atomic conflict-checked insert.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] for malformed intervals.
pub fn build_booking(
    studio: &Studio,
    renter_id: UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    fee_basis_points: u32,
    now: DateTime<Utc>,
) -> Result<Booking, DomainError> {
    if start < now {
        return Err(DomainError::Validation(
            "booking start is in the past".to_string(),
        ));
    }
    if !crate::interval::within_opening_hours(start, end) {
        return Err(DomainError::Validation(format!(
            "bookings must fall within opening hours ({:02}:00-{:02}:00)",
            crate::interval::OPEN_HOUR,
            crate::interval::CLOSE_HOUR,
        )));
    }

    let quote = pricing::quote(studio.hourly_rate, start, end, fee_basis_points)?;
    if quote.total_hours < studio.min_booking_hours {
        return Err(DomainError::Validation(format!(
            "booking must be at least {} hours",
            studio.min_booking_hours
        )));
    }
    if quote.total_hours > studio.max_booking_hours {
        return Err(DomainError::Validation(format!(
            "booking must be at most {} hours",
            studio.max_booking_hours
        )));
    }

    let status = if studio.instant_book {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Pending
    };

    Ok(Booking {
        id: BookingId::new(),
        studio_id: studio.id,
        renter_id,
        host_id: studio.host_id,
        start,
        end,
        status,
        payment_status: PaymentStatus::Pending,
        total_hours: quote.total_hours,
        subtotal: quote.subtotal,
        service_fee: quote.service_fee,
        total_amount: quote.total_amount,
        host_payout: quote.host_payout,
        original_start: None,
        original_end: None,
        cancellation_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        created_at: now,
    })
}

// ============================================================================
// Guard violations
// ============================================================================

/// The precise guard a rejected transition violated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionError {
    /// Booking is already cancelled (terminal)
    AlreadyCancelled,
    /// Booking is already completed (terminal)
    AlreadyCompleted,
    /// Confirm requires a pending booking
    NotPending,
    /// Confirm requires the payment to be authorized or captured
    PaymentNotSettled,
    /// Only the host may confirm
    NotHost,
    /// Only the renter may reschedule
    NotRenter,
    /// Only the renter or host may cancel
    NotParticipant,
    /// Reschedule window has closed
    RescheduleWindow {
        /// Hours left before the original start
        hours_remaining: i64,
    },
    /// New interval is malformed
    InvalidInterval(String),
    /// Complete requires a confirmed booking
    NotConfirmed,
    /// Complete requires the booking end to have passed
    NotElapsed,
}

impl TransitionError {
    /// Maps the violated guard to the domain error surfaced to callers.
    #[must_use]
    pub fn into_domain(self) -> DomainError {
        match self {
            Self::AlreadyCancelled => {
                DomainError::InvalidTransition("booking is already cancelled".to_string())
            }
            Self::AlreadyCompleted => {
                DomainError::InvalidTransition("booking is already completed".to_string())
            }
            Self::NotPending => {
                DomainError::Conflict("booking has already been confirmed".to_string())
            }
            Self::PaymentNotSettled => DomainError::InvalidTransition(
                "booking payment must be authorized or paid before confirmation".to_string(),
            ),
            Self::NotHost => {
                DomainError::Forbidden("only the host may confirm a booking".to_string())
            }
            Self::NotRenter => {
                DomainError::Forbidden("only the renter may reschedule a booking".to_string())
            }
            Self::NotParticipant => {
                DomainError::Forbidden("only the renter or host may cancel a booking".to_string())
            }
            Self::RescheduleWindow { hours_remaining } => DomainError::InvalidTransition(format!(
                "bookings can only be rescheduled at least {RESCHEDULE_WINDOW_HOURS} hours before \
                 the original start ({hours_remaining}h remaining)",
            )),
            Self::InvalidInterval(message) => DomainError::Validation(message),
            Self::NotConfirmed => {
                DomainError::InvalidTransition("only confirmed bookings can be completed".to_string())
            }
            Self::NotElapsed => {
                DomainError::InvalidTransition("booking has not ended yet".to_string())
            }
        }
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// How a completion was triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// The booking end passed (periodic sweep)
    Elapsed,
    /// The renter submitted a review for the booking
    ReviewSubmitted,
}

/// Actions for the booking lifecycle.
///
/// Commands are requests carrying the acting principal; events are the facts
/// a validated command produces. Events always apply cleanly.
#[derive(Clone, Debug)]
pub enum BookingAction {
    // Commands
    /// Host confirms a pending booking
    Confirm {
        /// Acting principal
        by: UserId,
    },

    /// Renter or host cancels the booking
    Cancel {
        /// Acting principal
        by: UserId,
        /// Free-form reason shown to the other party
        reason: String,
    },

    /// Renter moves the booking to a new interval
    Reschedule {
        /// Acting principal
        by: UserId,
        /// New interval start
        new_start: DateTime<Utc>,
        /// New interval end
        new_end: DateTime<Utc>,
    },

    /// Mark an elapsed confirmed booking as completed
    Complete {
        /// What triggered the completion
        trigger: CompletionTrigger,
    },

    // Events
    /// Booking was confirmed
    Confirmed {
        /// When
        at: DateTime<Utc>,
    },

    /// Booking was cancelled
    Cancelled {
        /// Who cancelled
        by: UserId,
        /// Reason
        reason: String,
        /// When
        at: DateTime<Utc>,
        /// Refund computed at cancellation time
        refund: RefundDecision,
    },

    /// Booking was moved to a new interval
    Rescheduled {
        /// New interval start
        new_start: DateTime<Utc>,
        /// New interval end
        new_end: DateTime<Utc>,
        /// Recomputed monetary breakdown
        quote: BookingQuote,
    },

    /// Booking finished
    Completed {
        /// When
        at: DateTime<Utc>,
    },

    /// A command violated a guard
    TransitionRejected {
        /// The violated guard
        error: TransitionError,
    },
}

// ============================================================================
// State
// ============================================================================

/// Reducer state: one booking plus the studio attributes read at
/// calculation time.
#[derive(Clone, Debug)]
pub struct BookingState {
    /// The booking under transition
    pub booking: Booking,
    /// Studio cancellation policy (read at cancel time)
    pub policy: CancellationPolicy,
    /// Studio hourly rate (read at reschedule time)
    pub hourly_rate: Money,
    /// Platform commission in basis points
    pub fee_basis_points: u32,
    /// Refund computed by the most recent cancellation
    pub last_refund: Option<RefundDecision>,
    /// Guard violated by the most recent rejected command
    pub last_error: Option<TransitionError>,
}

impl BookingState {
    /// Creates state for `booking` of `studio`.
    #[must_use]
    pub const fn new(booking: Booking, studio: &Studio, fee_basis_points: u32) -> Self {
        Self {
            booking,
            policy: studio.cancellation_policy,
            hourly_rate: studio.hourly_rate,
            fee_basis_points,
            last_refund: None,
            last_error: None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the booking reducer.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for timestamps and window calculations
    pub clock: Arc<dyn Clock>,
    /// Best-effort notification dispatch
    pub notifications: Arc<NotificationDispatcher>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, notifications: Arc<NotificationDispatcher>) -> Self {
        Self {
            clock,
            notifications,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the booking lifecycle.
#[derive(Clone, Debug)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn guard_not_terminal(status: BookingStatus) -> Result<(), TransitionError> {
        match status {
            BookingStatus::Cancelled => Err(TransitionError::AlreadyCancelled),
            BookingStatus::Completed => Err(TransitionError::AlreadyCompleted),
            BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
        }
    }

    fn validate_confirm(state: &BookingState, by: UserId) -> Result<(), TransitionError> {
        Self::guard_not_terminal(state.booking.status)?;
        if by != state.booking.host_id {
            return Err(TransitionError::NotHost);
        }
        if state.booking.status != BookingStatus::Pending {
            return Err(TransitionError::NotPending);
        }
        match state.booking.payment_status {
            PaymentStatus::Paid | PaymentStatus::Authorized => Ok(()),
            PaymentStatus::Pending | PaymentStatus::Refunded => {
                Err(TransitionError::PaymentNotSettled)
            }
        }
    }

    fn validate_cancel(state: &BookingState, by: UserId) -> Result<(), TransitionError> {
        Self::guard_not_terminal(state.booking.status)?;
        if by != state.booking.renter_id && by != state.booking.host_id {
            return Err(TransitionError::NotParticipant);
        }
        Ok(())
    }

    fn validate_reschedule(
        state: &BookingState,
        by: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        Self::guard_not_terminal(state.booking.status)?;
        if by != state.booking.renter_id {
            return Err(TransitionError::NotRenter);
        }
        let hours_remaining = (state.booking.committed_start() - now).num_hours();
        if hours_remaining < RESCHEDULE_WINDOW_HOURS {
            return Err(TransitionError::RescheduleWindow { hours_remaining });
        }
        Ok(())
    }

    fn validate_complete(
        state: &BookingState,
        trigger: CompletionTrigger,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        Self::guard_not_terminal(state.booking.status)?;
        if state.booking.status != BookingStatus::Confirmed {
            return Err(TransitionError::NotConfirmed);
        }
        if trigger == CompletionTrigger::Elapsed && state.booking.end > now {
            return Err(TransitionError::NotElapsed);
        }
        Ok(())
    }

    /// Applies an event to state.
    fn apply_event(state: &mut BookingState, action: &BookingAction) {
        match action {
            BookingAction::Confirmed { .. } => {
                state.booking.status = BookingStatus::Confirmed;
                state.last_error = None;
            }

            BookingAction::Cancelled {
                by,
                reason,
                at,
                refund,
            } => {
                state.booking.status = BookingStatus::Cancelled;
                state.booking.cancellation_reason = Some(reason.clone());
                state.booking.cancelled_by = Some(*by);
                state.booking.cancelled_at = Some(*at);
                state.last_refund = Some(*refund);
                state.last_error = None;
            }

            BookingAction::Rescheduled {
                new_start,
                new_end,
                quote,
            } => {
                // The original interval is captured once, on the first
                // reschedule, and never overwritten.
                if state.booking.original_start.is_none() {
                    state.booking.original_start = Some(state.booking.start);
                    state.booking.original_end = Some(state.booking.end);
                }
                state.booking.start = *new_start;
                state.booking.end = *new_end;
                state.booking.total_hours = quote.total_hours;
                state.booking.subtotal = quote.subtotal;
                state.booking.service_fee = quote.service_fee;
                state.booking.total_amount = quote.total_amount;
                state.booking.host_payout = quote.host_payout;
                state.last_error = None;
            }

            BookingAction::Completed { .. } => {
                state.booking.status = BookingStatus::Completed;
                state.last_error = None;
            }

            BookingAction::TransitionRejected { error } => {
                state.last_error = Some(error.clone());
            }

            // Commands don't modify state
            BookingAction::Confirm { .. }
            | BookingAction::Cancel { .. }
            | BookingAction::Reschedule { .. }
            | BookingAction::Complete { .. } => {}
        }
    }

    fn notify_effect(
        env: &BookingEnvironment,
        notification: Notification,
    ) -> Effect<BookingAction> {
        let dispatcher = Arc::clone(&env.notifications);
        Effect::future(async move {
            dispatcher.deliver(notification).await;
            None
        })
    }
}

impl Default for BookingReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per lifecycle transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; INLINE_EFFECTS]> {
        match action {
            // ========== Confirm ==========
            BookingAction::Confirm { by } => {
                if let Err(error) = Self::validate_confirm(state, by) {
                    Self::apply_event(state, &BookingAction::TransitionRejected { error });
                    return SmallVec::new();
                }

                let at = env.clock.now();
                Self::apply_event(state, &BookingAction::Confirmed { at });

                let booking = &state.booking;
                smallvec![Self::notify_effect(
                    env,
                    Notification {
                        user_id: booking.renter_id,
                        kind: NotificationKind::BookingConfirmed,
                        title: "Booking confirmed".to_string(),
                        message: format!(
                            "Your booking starting {} has been confirmed by the host",
                            booking.start
                        ),
                        link: Some(format!("/bookings/{}", booking.id)),
                    },
                )]
            }

            // ========== Cancel ==========
            BookingAction::Cancel { by, reason } => {
                if let Err(error) = Self::validate_cancel(state, by) {
                    Self::apply_event(state, &BookingAction::TransitionRejected { error });
                    return SmallVec::new();
                }

                let at = env.clock.now();
                let refund =
                    refund_decision(state.policy, state.booking.total_amount, state.booking.start, at);
                Self::apply_event(
                    state,
                    &BookingAction::Cancelled {
                        by,
                        reason,
                        at,
                        refund,
                    },
                );

                let booking = &state.booking;
                // Tell the party that did not cancel.
                let other_party = if by == booking.renter_id {
                    booking.host_id
                } else {
                    booking.renter_id
                };
                smallvec![Self::notify_effect(
                    env,
                    Notification {
                        user_id: other_party,
                        kind: NotificationKind::BookingCancelled,
                        title: "Booking cancelled".to_string(),
                        message: format!("The booking starting {} was cancelled", booking.start),
                        link: Some(format!("/bookings/{}", booking.id)),
                    },
                )]
            }

            // ========== Reschedule ==========
            BookingAction::Reschedule {
                by,
                new_start,
                new_end,
            } => {
                let now = env.clock.now();
                if let Err(error) = Self::validate_reschedule(state, by, now) {
                    Self::apply_event(state, &BookingAction::TransitionRejected { error });
                    return SmallVec::new();
                }

                let quote = match pricing::quote(
                    state.hourly_rate,
                    new_start,
                    new_end,
                    state.fee_basis_points,
                ) {
                    Ok(quote) => quote,
                    Err(err) => {
                        Self::apply_event(
                            state,
                            &BookingAction::TransitionRejected {
                                error: TransitionError::InvalidInterval(err.to_string()),
                            },
                        );
                        return SmallVec::new();
                    }
                };

                Self::apply_event(
                    state,
                    &BookingAction::Rescheduled {
                        new_start,
                        new_end,
                        quote,
                    },
                );

                let booking = &state.booking;
                smallvec![Self::notify_effect(
                    env,
                    Notification {
                        user_id: booking.host_id,
                        kind: NotificationKind::BookingRescheduled,
                        title: "Booking rescheduled".to_string(),
                        message: format!(
                            "A booking of your studio was moved to {} - {}",
                            booking.start, booking.end
                        ),
                        link: Some(format!("/bookings/{}", booking.id)),
                    },
                )]
            }

            // ========== Complete ==========
            BookingAction::Complete { trigger } => {
                let now = env.clock.now();
                if let Err(error) = Self::validate_complete(state, trigger, now) {
                    Self::apply_event(state, &BookingAction::TransitionRejected { error });
                    return SmallVec::new();
                }

                Self::apply_event(state, &BookingAction::Completed { at: now });
                SmallVec::new()
            }

            // ========== Events (already validated facts) ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            }
        }
    }
}

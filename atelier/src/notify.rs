//! Best-effort notification dispatch.
//!
//! Notifications are decoupled from booking transitions: the transition
//! commits first, dispatch happens afterwards with retries, and a failed
//! delivery is logged and swallowed - it never blocks or reverses a
//! transition.

use crate::types::UserId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// What happened, from the recipient's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// A renter requested a booking of the host's studio
    BookingRequested,
    /// The host confirmed the renter's booking
    BookingConfirmed,
    /// The other party cancelled the booking
    BookingCancelled,
    /// The renter moved the booking to a new interval
    BookingRescheduled,
}

/// A single message for a single user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Recipient
    pub user_id: UserId,
    /// Message category
    pub kind: NotificationKind,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Optional deep link into the client
    pub link: Option<String>,
}

/// Delivery failure reported by a sink.
#[derive(Debug, Clone)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Transport for notifications (push service, message queue, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport rejects the message; the
    /// dispatcher retries and ultimately swallows it.
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

// ============================================================================
// Retry policy
// ============================================================================

/// Exponential backoff configuration for redelivery attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: `delay = initial_delay * multiplier^attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_possible_wrap
        )] // Delays are small and positive
        let delay = Duration::from_millis(
            (self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32)) as u64,
        );

        delay.min(self.max_delay)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Retrying wrapper around a [`NotificationSink`].
///
/// Dispatch never returns an error: after the retry budget is exhausted the
/// failure is logged for operator follow-up and dropped.
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over `sink` with the given retry policy.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, policy: RetryPolicy) -> Self {
        Self { sink, policy }
    }

    /// Creates a dispatcher with the default retry policy.
    #[must_use]
    pub fn with_default_policy(sink: Arc<dyn NotificationSink>) -> Self {
        Self::new(sink, RetryPolicy::default())
    }

    /// Deliver `notification`, retrying transient failures with backoff.
    pub async fn deliver(&self, notification: Notification) {
        let mut attempt = 0usize;
        loop {
            match self.sink.notify(notification.clone()).await {
                Ok(()) => {
                    tracing::debug!(
                        user_id = %notification.user_id,
                        kind = ?notification.kind,
                        "Notification delivered"
                    );
                    return;
                }
                Err(err) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        user_id = %notification.user_id,
                        kind = ?notification.kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Notification delivery failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = %notification.user_id,
                        kind = ?notification.kind,
                        attempts = attempt + 1,
                        error = %err,
                        "Notification dropped after retries"
                    );
                    return;
                }
            }
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Sink that discards everything; for deployments without a messaging
/// backend and for tests that don't assert on notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// In-memory sink recording every delivered notification, for tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<Notification> {
        match self.delivered.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        match self.delivered.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}

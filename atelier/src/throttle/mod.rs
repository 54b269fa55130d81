//! Request throttling: fixed-window counters per (client identity, route
//! class).
//!
//! Every route is assigned a [`RouteClass`] with its own budget, so a burst
//! of uploads cannot starve payments. The in-memory implementation serves
//! single-process deployments; the redis implementation shares windows
//! across processes behind the same trait.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named bucket with an independent request budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Login, token, session routes
    Auth,
    /// File upload routes
    Upload,
    /// Money-bearing routes
    Payment,
    /// Other state-mutating routes
    Write,
    /// Read-only routes
    Read,
}

impl RouteClass {
    /// Stable string form used in keys and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Upload => "upload",
            Self::Payment => "payment",
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

/// Request budget of one route class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    /// Requests allowed per window
    pub limit: u32,
    /// Window length
    pub window: Duration,
}

impl Budget {
    /// Creates a budget of `limit` requests per `window_secs` seconds.
    #[must_use]
    pub const fn per_seconds(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Outcome of a throttle check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ThrottleDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window (0 when rejected)
    pub remaining: u32,
    /// When the current window ends and the counter restarts
    pub reset_at: DateTime<Utc>,
}

/// Failure of a throttle backend.
///
/// Callers treat this as a dependency failure and deny the request - a
/// broken limiter must not silently become an unlimited one.
#[derive(Debug, Clone)]
pub struct ThrottleError(pub String);

impl std::fmt::Display for ThrottleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "throttle backend error: {}", self.0)
    }
}

impl std::error::Error for ThrottleError {}

/// Fixed-window counter store.
#[async_trait]
pub trait ThrottleStore: Send + Sync {
    /// Count this request against `(identity, class)` and decide whether it
    /// may proceed under `budget`.
    ///
    /// The first request of a window sets the counter to 1 and the reset to
    /// `now + window`; later requests increment and are allowed while the
    /// count stays within the limit.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] when the backing store fails.
    async fn check(
        &self,
        identity: &str,
        class: RouteClass,
        budget: Budget,
    ) -> Result<ThrottleDecision, ThrottleError>;
}

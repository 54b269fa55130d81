//! In-memory fixed-window throttle store.
//!
//! Counters live in a mutex-guarded map; values are small and every
//! operation is O(1), so a single lock is sufficient (see the concurrency
//! notes in the crate docs). Expired windows are replaced lazily on access
//! and swept periodically to bound memory.

use super::{Budget, RouteClass, ThrottleDecision, ThrottleError, ThrottleStore};
use async_trait::async_trait;
use atelier_core::environment::Clock;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
struct Entry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Mutex-guarded fixed-window counters.
pub struct FixedWindowThrottle {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<(String, RouteClass), Entry>>,
}

impl FixedWindowThrottle {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, RouteClass), Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Removes every expired window in one pass over the map.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "Swept throttle windows");
        }
    }

    /// Number of live windows (for tests and introspection).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no windows are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Spawns the periodic sweeper task.
    ///
    /// Runs independently of request traffic; each tick holds the lock only
    /// for a single pass over expired keys.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.sweep();
            }
        })
    }
}

#[async_trait]
impl ThrottleStore for FixedWindowThrottle {
    async fn check(
        &self,
        identity: &str,
        class: RouteClass,
        budget: Budget,
    ) -> Result<ThrottleDecision, ThrottleError> {
        let now = self.clock.now();
        let window = ChronoDuration::from_std(budget.window)
            .map_err(|e| ThrottleError(format!("window out of range: {e}")))?;

        let mut entries = self.lock();
        let entry = entries
            .entry((identity.to_string(), class))
            .or_insert(Entry {
                count: 0,
                reset_at: now + window,
            });

        // Lazy expiry: a stale window restarts on the next access.
        if entry.reset_at <= now {
            entry.count = 0;
            entry.reset_at = now + window;
        }

        entry.count += 1;
        let allowed = entry.count <= budget.limit;
        let decision = ThrottleDecision {
            allowed,
            remaining: budget.limit.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        };
        drop(entries);

        if !allowed {
            metrics::counter!("atelier_throttle_rejections_total", "class" => class.as_str())
                .increment(1);
            tracing::warn!(
                identity,
                class = class.as_str(),
                limit = budget.limit,
                reset_at = %decision.reset_at,
                "Request over throttle budget"
            );
        }

        Ok(decision)
    }
}

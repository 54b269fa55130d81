//! In-memory TTL cache.
//!
//! Entries carry an absolute expiry computed from the injected clock; reads
//! evict lazily, and a periodic sweep bounds memory between reads.

use super::{CacheError, ResponseCache};
use async_trait::async_trait;
use atelier_core::environment::Clock;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Mutex-guarded TTL map.
pub struct TtlCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    /// Creates an empty cache reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Removes every expired entry in one pass over the map.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "Swept cache entries");
        }
    }

    /// Number of stored entries, live or not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Spawns the periodic sweeper task.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}

#[async_trait]
impl ResponseCache for TtlCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                let value = entry.value.clone();
                drop(entries);
                metrics::counter!("atelier_cache_hits_total").increment(1);
                Ok(Some(value))
            }
            Some(_) => {
                // Lazy expiry: evict on read, report a miss.
                entries.remove(key);
                drop(entries);
                metrics::counter!("atelier_cache_misses_total").increment(1);
                Ok(None)
            }
            None => {
                drop(entries);
                metrics::counter!("atelier_cache_misses_total").increment(1);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| CacheError(format!("ttl out of range: {e}")))?;
        let expires_at = self.clock.now() + ttl;
        self.lock()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = (before - entries.len()) as u64;
        drop(entries);
        if removed > 0 {
            tracing::debug!(prefix, removed, "Invalidated cache entries");
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.lock().clear();
        Ok(())
    }
}

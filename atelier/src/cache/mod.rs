//! Response cache: TTL key/value store for idempotent read responses.
//!
//! Keys are built deterministically from a namespace and sorted query
//! parameters, so equivalent queries hit the same entry regardless of
//! parameter order. Mutating operations invalidate by prefix.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Builds the cache key for `namespace` and query `params`.
///
/// Parameters are sorted and `=`-joined, so `?a=1&b=2` and `?b=2&a=1`
/// produce the same key.
#[must_use]
pub fn cache_key(namespace: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    sorted.sort_unstable();
    format!("{namespace}:{}", sorted.join("&"))
}

/// Failure of a cache backend.
#[derive(Debug, Clone)]
pub struct CacheError(pub String);

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cache backend error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// TTL key/value store for JSON response bodies.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch a live entry; expired entries count as a miss and are evicted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store fails.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store fails.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Drop every entry whose key starts with `prefix`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store fails.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Drop every entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store fails.
    async fn clear(&self) -> Result<(), CacheError>;
}

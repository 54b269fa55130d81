//! Redis-backed response cache.
//!
//! Multi-process deployments share cached responses through redis. Values
//! are JSON strings with a TTL attached via `SET ... EX`; prefix
//! invalidation walks matching keys with `SCAN` before deleting them.

use super::{CacheError, ResponseCache};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use std::time::Duration;

/// Namespace prepended to every key to keep the cache apart from other
/// users of the same redis database.
const KEY_PREFIX: &str = "cache:";

/// JSON response cache in redis.
#[derive(Clone)]
pub struct RedisResponseCache {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisResponseCache {
    /// Create a new redis response cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the connection to redis fails.
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError(format!("failed to create redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError(format!("failed to create redis connection: {e}")))?;

        Ok(Self { conn_manager })
    }

    fn storage_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn_manager.clone();
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError(format!("failed to scan cache keys: {e}")))?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn
            .del(keys)
            .await
            .map_err(|e| CacheError(format!("failed to delete cache keys: {e}")))?;
        Ok(removed)
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let cached: Option<String> = conn
            .get(Self::storage_key(key))
            .await
            .map_err(|e| CacheError(format!("redis GET error: {e}")))?;

        match cached {
            Some(json) => {
                metrics::counter!("atelier_cache_hits_total").increment(1);
                let value = serde_json::from_str(&json)
                    .map_err(|e| CacheError(format!("cached value is not JSON: {e}")))?;
                Ok(Some(value))
            }
            None => {
                metrics::counter!("atelier_cache_misses_total").increment(1);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let json = serde_json::to_string(&value)
            .map_err(|e| CacheError(format!("failed to serialize value: {e}")))?;

        let () = conn
            .set_ex(Self::storage_key(key), json, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError(format!("redis SET error: {e}")))?;
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.delete_matching(&format!("{KEY_PREFIX}{prefix}*")).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.delete_matching(&format!("{KEY_PREFIX}*")).await?;
        Ok(())
    }
}

//! Redis-backed fixed-window throttle store.
//!
//! Multi-process deployments: per-process memory does not coordinate across
//! instances, so the windows live in a shared store. One key per
//! (identity, route class) holds the window counter; the key TTL is the
//! window reset.

use super::{Budget, RouteClass, ThrottleDecision, ThrottleError, ThrottleStore};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use redis::aio::ConnectionManager;
use redis::Client;

/// Fixed-window counters in redis.
#[derive(Clone)]
pub struct RedisThrottle {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisThrottle {
    /// Create a new redis throttle store.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] if the connection to redis fails.
    pub async fn new(redis_url: &str) -> Result<Self, ThrottleError> {
        let client = Client::open(redis_url)
            .map_err(|e| ThrottleError(format!("failed to create redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| ThrottleError(format!("failed to create redis connection: {e}")))?;

        Ok(Self { conn_manager })
    }

    fn window_key(identity: &str, class: RouteClass) -> String {
        format!("throttle:{}:{identity}", class.as_str())
    }
}

#[async_trait]
impl ThrottleStore for RedisThrottle {
    async fn check(
        &self,
        identity: &str,
        class: RouteClass,
        budget: Budget,
    ) -> Result<ThrottleDecision, ThrottleError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::window_key(identity, class);
        #[allow(clippy::cast_possible_truncation)] // Windows are seconds to minutes
        let window_ms = budget.window.as_millis() as i64;

        // Atomic increment + TTL read. INCR creates the key at 1; the TTL is
        // attached right after for the first request of a window. NX keeps
        // later requests from sliding the reset forward.
        let (count, ttl_ms): (u32, i64) = redis::pipe()
            .atomic()
            .incr(&key, 1u32)
            .cmd("PEXPIRE")
            .arg(&key)
            .arg(window_ms)
            .arg("NX")
            .ignore()
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                // Backend failure denies access upstream; a broken limiter
                // must not become an unlimited one.
                tracing::error!(error = %e, key = %key, "Redis pipeline failed during throttle check");
                ThrottleError(format!("failed to check throttle window: {e}"))
            })?;

        let now = Utc::now();
        let reset_at = now + ChronoDuration::milliseconds(ttl_ms.max(0));
        let allowed = count <= budget.limit;

        if !allowed {
            metrics::counter!("atelier_throttle_rejections_total", "class" => class.as_str())
                .increment(1);
            tracing::warn!(
                identity,
                class = class.as_str(),
                count,
                limit = budget.limit,
                "Request over throttle budget"
            );
        }

        Ok(ThrottleDecision {
            allowed,
            remaining: budget.limit.saturating_sub(count),
            reset_at,
        })
    }
}

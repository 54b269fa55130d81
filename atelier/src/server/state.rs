//! Application state for the HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers. The throttle
//! store and response cache are explicit components injected here, never
//! ambient globals, so a deployment can swap the in-memory implementations
//! for the shared redis ones without touching call sites.

use crate::app::BookingService;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::throttle::ThrottleStore;
use atelier_core::environment::Clock;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Booking operations
    pub service: Arc<BookingService>,

    /// Fixed-window request budgets
    pub throttle: Arc<dyn ThrottleStore>,

    /// TTL cache for idempotent read responses
    pub cache: Arc<dyn ResponseCache>,

    /// Clock shared with the domain (injectable for tests)
    pub clock: Arc<dyn Clock>,

    /// Deployment configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        service: Arc<BookingService>,
        throttle: Arc<dyn ThrottleStore>,
        cache: Arc<dyn ResponseCache>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            service,
            throttle,
            cache,
            clock,
            config,
        }
    }
}

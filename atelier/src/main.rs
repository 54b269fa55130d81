//! Atelier reservation service.
//!
//! Binds the HTTP API over the configured backends:
//! in-process store/throttle/cache for a single instance, or
//! Postgres + redis for multi-process deployments.
//!
//! # Usage
//!
//! ```bash
//! # Single-process, everything in memory
//! cargo run
//!
//! # Shared backends
//! ATELIER_STORE=postgres ATELIER_SHARED_STATE=redis cargo run
//! ```

use atelier::app::BookingService;
use atelier::cache::{ResponseCache, memory::TtlCache, redis::RedisResponseCache};
use atelier::config::{Backend, Config};
use atelier::notify::{NoopSink, NotificationDispatcher};
use atelier::payment_gateway::MockPaymentGateway;
use atelier::server::{routes::build_router, state::AppState};
use atelier::store::{BookingStore, memory::InMemoryStore, postgres::PgBookingStore};
use atelier::throttle::{ThrottleStore, memory::FixedWindowThrottle, redis::RedisThrottle};
use atelier_core::environment::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,atelier=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env());
    tracing::info!(
        store = ?config.store_backend,
        shared_state = ?config.shared_state_backend,
        port = config.server.port,
        "Configuration loaded"
    );

    atelier::metrics::register_business_metrics();

    let clock = Arc::new(SystemClock);

    // Booking store
    let store: Arc<dyn BookingStore> = match config.store_backend {
        Backend::Memory => Arc::new(InMemoryStore::new()),
        Backend::External => {
            let store = PgBookingStore::connect(&config.database).await?;
            store.run_migrations().await?;
            tracing::info!("Connected to Postgres booking store");
            Arc::new(store)
        }
    };

    // Throttle and response cache
    let (throttle, cache): (Arc<dyn ThrottleStore>, Arc<dyn ResponseCache>) =
        match config.shared_state_backend {
            Backend::Memory => {
                let throttle = Arc::new(FixedWindowThrottle::new(clock.clone()));
                let cache = Arc::new(TtlCache::new(clock.clone()));
                let _ = throttle
                    .spawn_sweeper(Duration::from_secs(config.throttle.sweep_interval_secs));
                let _ =
                    cache.spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));
                (throttle, cache)
            }
            Backend::External => {
                let throttle = RedisThrottle::new(&config.redis.url).await?;
                let cache = RedisResponseCache::new(&config.redis.url).await?;
                tracing::info!("Connected to redis throttle/cache backends");
                (Arc::new(throttle), Arc::new(cache))
            }
        };

    let notifications = Arc::new(NotificationDispatcher::with_default_policy(Arc::new(
        NoopSink,
    )));
    let gateway = Arc::new(MockPaymentGateway::new());

    let service = Arc::new(BookingService::new(
        store,
        gateway,
        notifications,
        clock.clone(),
        config.pricing.fee_basis_points,
        Duration::from_secs(config.pricing.gateway_timeout),
    ));
    let _ = service.spawn_completion_sweep(Duration::from_secs(60));

    let state = AppState::new(service, throttle, cache, clock, config.clone());
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Atelier reservation service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gracefully...");
        })
        .await?;

    Ok(())
}

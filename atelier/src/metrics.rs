//! Business metrics for the reservation platform.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `atelier_bookings_total{status}` - bookings by lifecycle outcome
//! - `atelier_refunds_cents_total` - refunds issued in cents
//! - `atelier_refund_failures_total` - gateway refunds pending reconciliation
//! - `atelier_throttle_rejections_total{class}` - requests over budget
//! - `atelier_cache_hits_total` / `atelier_cache_misses_total`

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "atelier_bookings_total",
        "Total number of bookings by status (created, confirmed, cancelled, rescheduled, completed)"
    );
    describe_counter!(
        "atelier_refunds_cents_total",
        "Total refunds issued through the payment gateway, in cents"
    );
    describe_counter!(
        "atelier_refund_failures_total",
        "Gateway refund calls that failed and await operator reconciliation"
    );
    describe_counter!(
        "atelier_throttle_rejections_total",
        "Requests rejected by the throttle, by route class"
    );
    describe_counter!("atelier_cache_hits_total", "Response cache hits");
    describe_counter!("atelier_cache_misses_total", "Response cache misses");

    tracing::info!("Business metrics registered");
}

/// Record a booking lifecycle event.
pub fn record_booking_event(status: &'static str) {
    metrics::counter!("atelier_bookings_total", "status" => status).increment(1);
}

/// Record a successfully issued refund.
pub fn record_refund_issued(cents: u64) {
    metrics::counter!("atelier_refunds_cents_total").increment(cents);
}

/// Record a refund that failed at the gateway.
pub fn record_refund_failure() {
    metrics::counter!("atelier_refund_failures_total").increment(1);
}

//! Router configuration.
//!
//! Every `/api` route passes the throttle middleware with its route class
//! before reaching a handler; health stays unthrottled.

use super::health::health_check;
use super::state::AppState;
use crate::api::{availability, bookings, middleware::throttle};
use crate::throttle::RouteClass;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Build the complete Axum router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let write_routes = Router::new()
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id/confirm", post(bookings::confirm_booking))
        .route(
            "/bookings/:id/reschedule",
            post(bookings::reschedule_booking),
        )
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), RouteClass::Write),
            throttle,
        ));

    // Cancellation moves money; it draws from the payment budget.
    let payment_routes = Router::new()
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), RouteClass::Payment),
            throttle,
        ));

    let read_routes = Router::new()
        .route("/bookings/:id", get(bookings::get_booking))
        .route(
            "/studios/:id/availability",
            get(availability::get_availability),
        )
        .route("/studios/:id/slot", get(availability::check_slot))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), RouteClass::Read),
            throttle,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            write_routes.merge(payment_routes).merge(read_routes),
        )
        .with_state(state)
}

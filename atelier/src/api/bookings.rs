//! Booking lifecycle endpoints.
//!
//! - POST /api/bookings - create
//! - GET  /api/bookings/:id - fetch
//! - POST /api/bookings/:id/confirm - host confirms
//! - POST /api/bookings/:id/cancel - renter or host cancels
//! - POST /api/bookings/:id/reschedule - renter moves the interval
//!
//! Mutations that change which slots are taken invalidate the studio's
//! cached availability prefix.

use super::middleware::Principal;
use crate::app::CancellationOutcome;
use crate::error::AppError;
use crate::server::state::AppState;
use crate::types::{Booking, BookingId, StudioId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Body of POST /api/bookings.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Studio to book
    pub studio_id: Uuid,
    /// Interval start (inclusive)
    pub start: DateTime<Utc>,
    /// Interval end (exclusive)
    pub end: DateTime<Utc>,
}

/// Body of POST /api/bookings/:id/cancel.
#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    /// Reason shown to the other party
    pub reason: String,
}

/// Body of POST /api/bookings/:id/reschedule.
#[derive(Debug, Deserialize)]
pub struct RescheduleBookingRequest {
    /// New interval start
    pub new_start: DateTime<Utc>,
    /// New interval end
    pub new_end: DateTime<Utc>,
}

/// Drops cached availability for the studio after a slot-changing mutation.
async fn invalidate_availability(state: &AppState, studio_id: StudioId) {
    if let Err(err) = state
        .cache
        .invalidate_prefix(&format!("availability:{studio_id}"))
        .await
    {
        // Stale availability heals itself at TTL expiry.
        tracing::warn!(studio_id = %studio_id, error = %err, "Availability cache invalidation failed");
    }
}

/// Create a booking.
pub async fn create_booking(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .service
        .create_booking(
            principal.user_id,
            StudioId::from_uuid(request.studio_id),
            request.start,
            request.end,
        )
        .await?;

    invalidate_availability(&state, booking.studio_id).await;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Fetch one booking.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.service.get_booking(BookingId::from_uuid(id)).await?;
    Ok(Json(booking))
}

/// Host confirms a pending booking.
pub async fn confirm_booking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .service
        .confirm_booking(principal.user_id, BookingId::from_uuid(id))
        .await?;
    Ok(Json(booking))
}

/// Renter or host cancels a booking; reports the refund decision and
/// whether the gateway executed it.
pub async fn cancel_booking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<CancellationOutcome>, AppError> {
    let outcome = state
        .service
        .cancel_booking(principal.user_id, BookingId::from_uuid(id), request.reason)
        .await?;

    invalidate_availability(&state, outcome.booking.studio_id).await;
    Ok(Json(outcome))
}

/// Renter moves a booking to a new interval.
pub async fn reschedule_booking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .service
        .reschedule_booking(
            principal.user_id,
            BookingId::from_uuid(id),
            request.new_start,
            request.new_end,
        )
        .await?;

    invalidate_availability(&state, booking.studio_id).await;
    Ok(Json(booking))
}

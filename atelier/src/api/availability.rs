//! Availability query endpoints.
//!
//! - GET /api/studios/:id/availability?from=&to= - hourly calendar
//! - GET /api/studios/:id/slot?start=&end= - single interval check
//!
//! Calendar responses are cached under a deterministic key; a cache backend
//! failure degrades to computing the response, never to failing the read.

use crate::availability::SlotCheck;
use crate::cache::cache_key;
use crate::error::AppError;
use crate::server::state::AppState;
use crate::types::{DaySlots, StudioId};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Query string of the availability endpoint.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// First day of the range (inclusive)
    pub from: NaiveDate,
    /// Last day of the range (inclusive)
    pub to: NaiveDate,
}

/// Availability response body.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Studio ID
    pub studio_id: Uuid,
    /// One entry per day of the range
    pub days: Vec<DaySlots>,
}

/// Query string of the slot check endpoint.
#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// Candidate interval start
    pub start: DateTime<Utc>,
    /// Candidate interval end
    pub end: DateTime<Utc>,
}

/// Hourly availability calendar over a date range.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(studio_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let key = cache_key(
        &format!("availability:{studio_id}"),
        &[
            ("from", query.from.to_string()),
            ("to", query.to.to_string()),
        ],
    );

    match state.cache.get(&key).await {
        Ok(Some(cached)) => return Ok(Json(cached)),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "Availability cache read failed, computing response");
        }
    }

    let days = state
        .service
        .get_availability(StudioId::from_uuid(studio_id), query.from, query.to)
        .await?;

    let body = serde_json::to_value(AvailabilityResponse { studio_id, days })
        .map_err(|e| AppError::internal(format!("failed to serialize availability: {e}")))?;

    let ttl = Duration::from_secs(state.config.cache.availability_ttl_secs);
    if let Err(err) = state.cache.set(&key, body.clone(), ttl).await {
        tracing::warn!(error = %err, "Availability cache write failed");
    }

    Ok(Json(body))
}

/// Check whether one candidate interval is bookable.
pub async fn check_slot(
    State(state): State<AppState>,
    Path(studio_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotCheck>, AppError> {
    let check = state
        .service
        .check_slot(StudioId::from_uuid(studio_id), query.start, query.end)
        .await?;
    Ok(Json(check))
}

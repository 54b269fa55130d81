//! Error types for the reservation core and its HTTP surface.
//!
//! [`DomainError`] is the closed set of failures domain operations return;
//! guard violations are computed locally and returned before any side
//! effect. [`AppError`] bridges domain errors to HTTP responses,
//! implementing Axum's `IntoResponse`.

use crate::types::{BookingId, StudioId};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures a domain operation can produce.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Referenced studio does not exist
    #[error("studio {0} not found")]
    StudioNotFound(StudioId),

    /// Referenced booking does not exist
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// No authenticated principal on a mutating call
    #[error("authentication required")]
    Unauthorized,

    /// Principal lacks the role or ownership the action requires
    #[error("{0}")]
    Forbidden(String),

    /// Interval overlap, or a transition already processed
    #[error("{0}")]
    Conflict(String),

    /// Terminal-state or window violation on a lifecycle transition
    #[error("{0}")]
    InvalidTransition(String),

    /// Malformed interval or out-of-range duration
    #[error("{0}")]
    Validation(String),

    /// A collaborator (store, gateway) failed or timed out
    #[error("{dependency} failure: {message}")]
    Dependency {
        /// Which collaborator failed
        dependency: &'static str,
        /// What went wrong
        message: String,
    },

    /// Request budget for the route class is exhausted
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited {
        /// When the current window ends
        reset_at: DateTime<Utc>,
    },
}

impl DomainError {
    /// Shorthand for a store failure.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Dependency {
            dependency: "store",
            message: message.into(),
        }
    }

    /// Shorthand for a payment gateway failure.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Dependency {
            dependency: "payment gateway",
            message: message.into(),
        }
    }
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

// ============================================================================
// HTTP bridge
// ============================================================================

/// Application error type for web handlers.
///
/// Wraps domain errors and provides HTTP-friendly error responses with a
/// stable machine-readable `code` alongside the human-readable message.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// `Retry-After` seconds for throttled responses
    retry_after: Option<u64>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            retry_after: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 429 Too Many Requests error with a reset instant.
    #[must_use]
    pub fn rate_limited(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let retry_after = (reset_at - now).num_seconds().max(0);
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate limit exceeded, resets at {reset_at}"),
            "RATE_LIMITED".to_string(),
        );
        #[allow(clippy::cast_sign_loss)] // clamped non-negative above
        {
            err.retry_after = Some(retry_after as u64);
        }
        err
    }

    /// Create a 502 Bad Gateway error for collaborator failures.
    #[must_use]
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            message.into(),
            "DEPENDENCY_FAILURE".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::StudioNotFound(id) => Self::not_found("Studio", id),
            DomainError::BookingNotFound(id) => Self::not_found("Booking", id),
            DomainError::Unauthorized => Self::unauthorized("authentication required"),
            DomainError::Forbidden(msg) => Self::forbidden(msg),
            DomainError::Conflict(msg) => Self::conflict(msg),
            DomainError::InvalidTransition(msg) => Self::conflict(msg),
            DomainError::Validation(msg) => Self::validation(msg),
            DomainError::Dependency { dependency, message } => {
                Self::dependency(format!("{dependency} failure"))
                    .with_source(anyhow::anyhow!("{dependency}: {message}"))
            }
            DomainError::RateLimited { reset_at } => Self::rate_limited(reset_at, Utc::now()),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Server error"
                );
            }
        }

        let retry_after = self.retry_after;
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

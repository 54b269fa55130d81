//! Request middleware and extractors.
//!
//! - [`Principal`]: the authenticated identity the identity provider
//!   attached to the request. The core trusts this input and applies its
//!   own authorization guards (host-only confirm, renter-only reschedule).
//! - [`throttle`]: per-route-class budget enforcement in front of every
//!   handler.

use crate::error::AppError;
use crate::server::state::AppState;
use crate::throttle::RouteClass;
use crate::types::{Role, UserId};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Authenticated principal supplied by the identity provider.
///
/// Extracted from `Authorization: Bearer <user-uuid>` plus the optional
/// `X-Role` header. Mutating handlers require it; missing or malformed
/// credentials reject with 401 before any side effect.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    /// The authenticated user
    pub user_id: UserId,
    /// Role claimed by the identity provider
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?;

        let uuid = Uuid::parse_str(token)
            .map_err(|_| AppError::unauthorized("Invalid bearer token format"))?;

        let role = match parts.headers.get("x-role").and_then(|v| v.to_str().ok()) {
            Some("host") => Role::Host,
            _ => Role::Renter,
        };

        Ok(Self {
            user_id: UserId::from_uuid(uuid),
            role,
        })
    }
}

/// Identity string the throttle keys on: the authenticated user when
/// present, the forwarded client address otherwise.
fn throttle_identity(parts: &axum::http::HeaderMap) -> String {
    if let Some(token) = parts
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        if Uuid::parse_str(token).is_ok() {
            return token.to_string();
        }
    }
    parts
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| "anonymous".to_string(), |v| v.to_string())
}

/// Throttle middleware: counts the request against its route class budget
/// and rejects with 429 (and a `Retry-After` header) once over it.
///
/// A throttle backend failure denies the request: a broken limiter must not
/// become an unlimited one.
///
/// # Errors
///
/// `RateLimited` over budget, `DependencyFailure` when the backend fails.
pub async fn throttle(
    State((state, class)): State<(AppState, RouteClass)>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = throttle_identity(request.headers());
    let budget = state.config.throttle.budget_for(class);

    let decision = state
        .throttle
        .check(&identity, class, budget)
        .await
        .map_err(|err| AppError::dependency("throttle backend unavailable").with_source(err.into()))?;

    if !decision.allowed {
        return Err(AppError::rate_limited(decision.reset_at, state.clock.now()));
    }

    Ok(next.run(request).await)
}

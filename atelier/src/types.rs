//! Domain types for the studio reservation platform.
//!
//! This module contains the value objects, entities, and closed enumerations
//! the reservation core operates on. Statuses and policies are tagged
//! variants, not strings: invalid values are rejected at the boundary
//! instead of silently defaulting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a studio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudioId(Uuid);

impl StudioId {
    /// Creates a new random `StudioId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `StudioId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StudioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (renter or host)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors.
///
/// All monetary amounts on a booking are exact to two decimal places by
/// construction; fractional intermediate results round half-up to the
/// nearest cent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole euros
    #[must_use]
    pub const fn from_euros(euros: u64) -> Self {
        Self(euros.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Adds two amounts, saturating on overflow
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies by an integer factor, saturating on overflow
    #[must_use]
    pub const fn multiply(self, factor: u32) -> Self {
        Self(self.0.saturating_mul(factor as u64))
    }

    /// Takes a whole percentage of this amount, rounding half-up to the cent.
    #[must_use]
    pub const fn percent(self, pct: u32) -> Self {
        Self(self.0.saturating_mul(pct as u64).saturating_add(50) / 100)
    }

    /// Takes a basis-point share of this amount, rounding half-up to the cent.
    ///
    /// 10 000 basis points = 100%.
    #[must_use]
    pub const fn basis_points(self, bp: u32) -> Self {
        Self(self.0.saturating_mul(bp as u64).saturating_add(5_000) / 10_000)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Closed enumerations
// ============================================================================

/// Cancellation policy attached to a studio.
///
/// Determines the refund percentage as a function of how far before the
/// booking start the cancellation happens (see `refund`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// 100% refund ≥ 24h before start, 50% under 24h
    Flexible,
    /// 100% ≥ 120h, 50% ≥ 24h, 0% under 24h
    Moderate,
    /// 100% ≥ 168h, 50% ≥ 48h, 0% under 48h
    Strict,
}

impl CancellationPolicy {
    /// Stable string form used for persistence
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flexible => "flexible",
            Self::Moderate => "moderate",
            Self::Strict => "strict",
        }
    }

    /// Parse the persisted string form; `None` for unknown values
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "flexible" => Some(Self::Flexible),
            "moderate" => Some(Self::Moderate),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Lifecycle status of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting host confirmation
    Pending,
    /// Confirmed by the host (or instantly on creation)
    Confirmed,
    /// Cancelled by either party; terminal
    Cancelled,
    /// Finished; terminal
    Completed,
}

impl BookingStatus {
    /// Terminal statuses never transition further
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Stable string form used for persistence
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parse the persisted string form; `None` for unknown values
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Payment state of a booking, owned by the payment gateway integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No charge attempted yet
    Pending,
    /// Funds held but not captured
    Authorized,
    /// Captured
    Paid,
    /// Returned to the renter after cancellation
    Refunded,
}

impl PaymentStatus {
    /// Stable string form used for persistence
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    /// Parse the persisted string form; `None` for unknown values
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "authorized" => Some(Self::Authorized),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// Role supplied by the identity provider alongside the principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books studios
    Renter,
    /// Owns studios
    Host,
}

// ============================================================================
// Entities
// ============================================================================

/// A bookable studio.
///
/// Referenced by the reservation core; immutable here except that the rate
/// and policy are read at booking-calculation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Studio {
    /// Studio ID
    pub id: StudioId,
    /// Owning host
    pub host_id: UserId,
    /// Display name
    pub name: String,
    /// Rate charged per started hour
    pub hourly_rate: Money,
    /// Refund schedule for cancellations
    pub cancellation_policy: CancellationPolicy,
    /// Shortest bookable duration, in hours
    pub min_booking_hours: u32,
    /// Longest bookable duration, in hours
    pub max_booking_hours: u32,
    /// New bookings start confirmed instead of pending
    pub instant_book: bool,
}

/// A reservation of a studio for a half-open interval `[start, end)`.
///
/// Bookings are never physically deleted; cancellation is a terminal status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Reserved studio
    pub studio_id: StudioId,
    /// Renting user
    pub renter_id: UserId,
    /// Studio owner at booking time
    pub host_id: UserId,
    /// Interval start (inclusive)
    pub start: DateTime<Utc>,
    /// Interval end (exclusive)
    pub end: DateTime<Utc>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Billed hours: ceiling of the interval duration
    pub total_hours: u32,
    /// Rate × hours
    pub subtotal: Money,
    /// Platform fee added on top of the subtotal
    pub service_fee: Money,
    /// Amount charged to the renter
    pub total_amount: Money,
    /// Amount paid out to the host (subtotal minus platform commission)
    pub host_payout: Money,
    /// Interval start before the first reschedule; set once, never updated
    pub original_start: Option<DateTime<Utc>>,
    /// Interval end before the first reschedule; set once, never updated
    pub original_end: Option<DateTime<Utc>>,
    /// Free-form cancellation reason
    pub cancellation_reason: Option<String>,
    /// Who cancelled
    pub cancelled_by: Option<UserId>,
    /// When the cancellation happened
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// The start instant the cancellation/reschedule windows are measured
    /// against: the first agreed start, even after reschedules.
    #[must_use]
    pub fn committed_start(&self) -> DateTime<Utc> {
        self.original_start.unwrap_or(self.start)
    }

    /// True when the booking still occupies its interval.
    #[must_use]
    pub const fn occupies_interval(&self) -> bool {
        !matches!(self.status, BookingStatus::Cancelled)
    }
}

// ============================================================================
// Ephemeral query values
// ============================================================================

/// One displayable hourly slot; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    /// Slot start (inclusive)
    pub start: DateTime<Utc>,
    /// Slot end (exclusive)
    pub end: DateTime<Utc>,
    /// Free of conflicts and not in the past
    pub available: bool,
}

/// All slots of one calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySlots {
    /// The calendar day
    pub date: chrono::NaiveDate,
    /// Hourly slots within opening hours
    pub slots: Vec<TimeSlot>,
}

/// Monetary breakdown of a prospective or stored booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingQuote {
    /// Billed hours (ceiling of duration)
    pub total_hours: u32,
    /// Rate × hours
    pub subtotal: Money,
    /// Platform fee added on top
    pub service_fee: Money,
    /// Charged to the renter
    pub total_amount: Money,
    /// Paid out to the host
    pub host_payout: Money,
}

/// Outcome of the pure refund computation on the cancel path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RefundDecision {
    /// Refund percentage: 0, 50, or 100
    pub percent: u8,
    /// `total_amount × percent`, rounded to the cent
    pub amount: Money,
}

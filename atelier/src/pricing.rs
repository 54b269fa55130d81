//! Booking economics: hours, subtotal, service fee, total, and host payout.
//!
//! All four monetary outputs are rounded to the cent independently, never
//! derived by re-rounding each other.

use crate::error::{DomainError, DomainResult};
use crate::interval::billable_hours;
use crate::types::{BookingQuote, Money};
use chrono::{DateTime, Utc};

/// Platform commission in basis points (15%), used when the deployment does
/// not override it.
pub const DEFAULT_FEE_BASIS_POINTS: u32 = 1_500;

/// Computes the monetary breakdown for booking an interval at a rate.
///
/// `total_hours` is the ceiling of the duration: a partial hour bills as a
/// full hour. The service fee is added on top of the subtotal for the
/// renter; the host payout is the subtotal minus the platform commission.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] when `end` is not after `start`.
pub fn quote(
    hourly_rate: Money,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    fee_basis_points: u32,
) -> DomainResult<BookingQuote> {
    if end <= start {
        return Err(DomainError::Validation(
            "booking end must be after start".to_string(),
        ));
    }

    let total_hours = billable_hours(start, end);
    let subtotal = hourly_rate.multiply(total_hours);
    let service_fee = subtotal.basis_points(fee_basis_points);
    let total_amount = subtotal.add(service_fee);
    let host_payout = subtotal.basis_points(10_000 - fee_basis_points);

    Ok(BookingQuote {
        total_hours,
        subtotal,
        service_fee,
        total_amount,
        host_payout,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, m, 0).single().unwrap()
    }

    #[test]
    fn two_hours_at_fifty_with_default_fee() {
        // €50/h, 08:00-10:00: €100 subtotal, €15 fee, €115 total, €85 payout
        let q = quote(Money::from_euros(50), at(8, 0), at(10, 0), DEFAULT_FEE_BASIS_POINTS)
            .unwrap();
        assert_eq!(q.total_hours, 2);
        assert_eq!(q.subtotal, Money::from_euros(100));
        assert_eq!(q.service_fee, Money::from_euros(15));
        assert_eq!(q.total_amount, Money::from_cents(11_500));
        assert_eq!(q.host_payout, Money::from_euros(85));
    }

    #[test]
    fn partial_hour_bills_as_full_hour() {
        let q = quote(Money::from_euros(50), at(8, 0), at(9, 30), DEFAULT_FEE_BASIS_POINTS)
            .unwrap();
        assert_eq!(q.total_hours, 2);
        assert_eq!(q.subtotal, Money::from_euros(100));
    }

    #[test]
    fn quote_is_idempotent() {
        let a = quote(Money::from_cents(4_999), at(9, 0), at(12, 30), 1_500).unwrap();
        let b = quote(Money::from_cents(4_999), at(9, 0), at(12, 30), 1_500).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn totals_keep_the_invariant() {
        let q = quote(Money::from_cents(3_333), at(8, 0), at(11, 0), 1_500).unwrap();
        assert_eq!(q.total_amount, q.subtotal.add(q.service_fee));
    }

    #[test]
    fn rejects_empty_and_inverted_intervals() {
        assert!(matches!(
            quote(Money::from_euros(50), at(10, 0), at(10, 0), 1_500),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            quote(Money::from_euros(50), at(10, 0), at(8, 0), 1_500),
            Err(DomainError::Validation(_))
        ));
    }
}

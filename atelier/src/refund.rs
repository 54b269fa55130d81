//! Refund policy engine.
//!
//! Pure mapping from (cancellation policy, hours until start) to a refund
//! percentage, and from there to a cent-exact refund amount.

use crate::types::{CancellationPolicy, Money, RefundDecision};
use chrono::{DateTime, Utc};

/// Refund percentage for cancelling `hours_until_start` hours before the
/// booked start.
///
/// Negative values (cancelling after the start has passed) fall through to
/// the lowest tier of the policy.
#[must_use]
pub const fn refund_percent(policy: CancellationPolicy, hours_until_start: i64) -> u8 {
    match policy {
        CancellationPolicy::Flexible => {
            if hours_until_start >= 24 {
                100
            } else {
                50
            }
        }
        CancellationPolicy::Moderate => {
            if hours_until_start >= 120 {
                100
            } else if hours_until_start >= 24 {
                50
            } else {
                0
            }
        }
        CancellationPolicy::Strict => {
            if hours_until_start >= 168 {
                100
            } else if hours_until_start >= 48 {
                50
            } else {
                0
            }
        }
    }
}

/// Computes the refund for cancelling a booking of `total_amount` that
/// starts at `start`, as observed at `now`.
#[must_use]
pub fn refund_decision(
    policy: CancellationPolicy,
    total_amount: Money,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> RefundDecision {
    let hours_until_start = (start - now).num_hours();
    let percent = refund_percent(policy, hours_until_start);
    RefundDecision {
        percent,
        amount: total_amount.percent(u32::from(percent)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn flexible_tiers() {
        assert_eq!(refund_percent(CancellationPolicy::Flexible, 24), 100);
        assert_eq!(refund_percent(CancellationPolicy::Flexible, 23), 50);
        assert_eq!(refund_percent(CancellationPolicy::Flexible, 0), 50);
        assert_eq!(refund_percent(CancellationPolicy::Flexible, -5), 50);
    }

    #[test]
    fn moderate_tiers() {
        assert_eq!(refund_percent(CancellationPolicy::Moderate, 120), 100);
        assert_eq!(refund_percent(CancellationPolicy::Moderate, 119), 50);
        assert_eq!(refund_percent(CancellationPolicy::Moderate, 24), 50);
        assert_eq!(refund_percent(CancellationPolicy::Moderate, 23), 0);
    }

    #[test]
    fn strict_tiers() {
        assert_eq!(refund_percent(CancellationPolicy::Strict, 168), 100);
        assert_eq!(refund_percent(CancellationPolicy::Strict, 72), 50);
        assert_eq!(refund_percent(CancellationPolicy::Strict, 48), 50);
        assert_eq!(refund_percent(CancellationPolicy::Strict, 47), 0);
    }

    #[test]
    fn decision_rounds_to_the_cent() {
        let now = Utc::now();
        let start = now + Duration::hours(10);
        // Flexible at 10h: 50% of €115.00 = €57.50
        let decision = refund_decision(
            CancellationPolicy::Flexible,
            Money::from_cents(11_500),
            start,
            now,
        );
        assert_eq!(decision.percent, 50);
        assert_eq!(decision.amount, Money::from_cents(5_750));
    }

    #[test]
    fn full_refund_far_out() {
        let now = Utc::now();
        let start = now + Duration::hours(30);
        let decision = refund_decision(
            CancellationPolicy::Flexible,
            Money::from_cents(11_500),
            start,
            now,
        );
        assert_eq!(decision.percent, 100);
        assert_eq!(decision.amount, Money::from_cents(11_500));
    }

    proptest! {
        #[test]
        fn percent_is_monotone_in_lead_time(
            policy in prop_oneof![
                Just(CancellationPolicy::Flexible),
                Just(CancellationPolicy::Moderate),
                Just(CancellationPolicy::Strict),
            ],
            hours in -48i64..400,
        ) {
            let here = refund_percent(policy, hours);
            let later = refund_percent(policy, hours + 1);
            prop_assert!(later >= here);
        }

        #[test]
        fn percent_is_a_known_tier(
            policy in prop_oneof![
                Just(CancellationPolicy::Flexible),
                Just(CancellationPolicy::Moderate),
                Just(CancellationPolicy::Strict),
            ],
            hours in -48i64..400,
        ) {
            prop_assert!(matches!(refund_percent(policy, hours), 0 | 50 | 100));
        }
    }
}

//! End-to-end lifecycle scenarios against the in-memory store.
//!
//! Exercises the service layer the way the HTTP handlers drive it:
//! create → confirm → reschedule → cancel/complete, including refund
//! computation and the partial-success path when the gateway fails.

#![allow(clippy::unwrap_used)]

use atelier::aggregates::booking::CompletionTrigger;
use atelier::app::BookingService;
use atelier::error::DomainError;
use atelier::notify::{NotificationDispatcher, NotificationKind, RecordingSink};
use atelier::payment_gateway::{FailingPaymentGateway, MockPaymentGateway, PaymentGateway};
use atelier::store::{BookingStore, memory::InMemoryStore};
use atelier::types::{
    Booking, BookingStatus, CancellationPolicy, Money, PaymentStatus, Studio, StudioId, UserId,
};
use atelier_core::environment::FixedClock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

const FEE_BASIS_POINTS: u32 = 1_500;

struct Fixture {
    store: Arc<InMemoryStore>,
    service: BookingService,
    clock: Arc<FixedClock>,
    sink: RecordingSink,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
}

fn fixture_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::new(now()));
    let sink = RecordingSink::new();
    let notifications = Arc::new(NotificationDispatcher::with_default_policy(Arc::new(
        sink.clone(),
    )));
    let service = BookingService::new(
        store.clone(),
        gateway,
        notifications,
        clock.clone(),
        FEE_BASIS_POINTS,
        StdDuration::from_secs(2),
    );
    Fixture {
        store,
        service,
        clock,
        sink,
    }
}

fn fixture() -> (Fixture, Arc<MockPaymentGateway>) {
    let gateway = Arc::new(MockPaymentGateway::new());
    (fixture_with_gateway(gateway.clone()), gateway)
}

fn studio(policy: CancellationPolicy, instant_book: bool) -> Studio {
    Studio {
        id: StudioId::new(),
        host_id: UserId::new(),
        name: "Riverside Studio".to_string(),
        hourly_rate: Money::from_euros(50),
        cancellation_policy: policy,
        min_booking_hours: 1,
        max_booking_hours: 8,
        instant_book,
    }
}

/// Tomorrow 18:00-20:00, 30 hours after the fixed clock.
fn tomorrow_evening() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).single().unwrap();
    (start, start + Duration::hours(2))
}

async fn mark_paid(store: &InMemoryStore, booking: &Booking) {
    let mut paid = store.get_booking(booking.id).await.unwrap().unwrap();
    paid.payment_status = PaymentStatus::Paid;
    store.update_booking(&paid).await.unwrap();
}

#[tokio::test]
async fn full_lifecycle_create_confirm_cancel_with_full_refund() {
    let (f, gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_amount, Money::from_cents(11_500));

    // Confirm before payment settles: precise guard error.
    let unpaid = f.service.confirm_booking(studio.host_id, booking.id).await;
    assert!(matches!(unpaid, Err(DomainError::InvalidTransition(_))));

    mark_paid(&f.store, &booking).await;
    let confirmed = f
        .service
        .confirm_booking(studio.host_id, booking.id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    // 30 hours before start, flexible: 100% refund of €115.00.
    let outcome = f
        .service
        .cancel_booking(renter, booking.id, "travel fell through".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(outcome.refund.percent, 100);
    assert_eq!(outcome.refund.amount, Money::from_cents(11_500));
    assert!(outcome.refund_issued);

    assert_eq!(
        gateway.issued(),
        vec![(booking.id.to_string(), Money::from_cents(11_500))]
    );

    let stored = f.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    assert_eq!(stored.payment_status, PaymentStatus::Refunded);
    assert_eq!(stored.cancelled_by, Some(renter));
}

#[tokio::test]
async fn late_cancellation_refunds_half() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;

    // 10 hours before start: 50% of €115.00 = €57.50.
    f.clock.set(start - Duration::hours(10));
    let outcome = f
        .service
        .cancel_booking(renter, booking.id, "ill".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.refund.percent, 50);
    assert_eq!(outcome.refund.amount, Money::from_cents(5_750));
}

#[tokio::test]
async fn strict_policy_cancellation_between_thresholds_refunds_half() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Strict, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    // Ten days out so the 72h cancellation point is still in the future.
    let start = Utc.with_ymd_and_hms(2025, 6, 11, 10, 0, 0).single().unwrap();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, start + Duration::hours(2))
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;

    // 72h before start: between the 48h and 168h thresholds.
    f.clock.set(start - Duration::hours(72));
    let outcome = f
        .service
        .cancel_booking(renter, booking.id, "plans changed".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.refund.percent, 50);
}

#[tokio::test]
async fn gateway_failure_still_cancels_but_reports_unissued_refund() {
    let f = fixture_with_gateway(Arc::new(FailingPaymentGateway));
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;

    let outcome = f
        .service
        .cancel_booking(renter, booking.id, "oops".to_string())
        .await
        .unwrap();

    // Partial success: the transition committed, the money did not move.
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(outcome.refund.percent, 100);
    assert!(!outcome.refund_issued);

    let stored = f.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    assert_eq!(stored.payment_status, PaymentStatus::Paid); // awaiting reconciliation
}

#[tokio::test]
async fn unpaid_cancellation_reports_refund_without_gateway_call() {
    let (f, gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();

    let outcome = f
        .service
        .cancel_booking(renter, booking.id, "never paid".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.refund.percent, 100);
    assert!(!outcome.refund_issued);
    assert!(gateway.issued().is_empty());
}

#[tokio::test]
async fn instant_book_studio_confirms_on_creation() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Moderate, true);
    f.store.insert_studio(&studio).await.unwrap();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(UserId::new(), studio.id, start, end)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn overlapping_create_is_rejected_with_conflict() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();

    let (start, end) = tomorrow_evening();
    f.service
        .create_booking(UserId::new(), studio.id, start, end)
        .await
        .unwrap();

    let overlapping = f
        .service
        .create_booking(UserId::new(), studio.id, start + Duration::hours(1), end + Duration::hours(1))
        .await;
    assert!(matches!(overlapping, Err(DomainError::Conflict(_))));

    // Back-to-back is not a conflict: half-open intervals.
    f.service
        .create_booking(UserId::new(), studio.id, end, end + Duration::hours(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn reschedule_preserves_first_original_interval() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();

    let second_start = start + Duration::days(3);
    f.service
        .reschedule_booking(
            renter,
            booking.id,
            second_start,
            second_start + Duration::hours(2),
        )
        .await
        .unwrap();

    let third_start = start + Duration::days(5);
    let rescheduled = f
        .service
        .reschedule_booking(
            renter,
            booking.id,
            third_start,
            third_start + Duration::hours(3),
        )
        .await
        .unwrap();

    // Values from the FIRST reschedule, not the second.
    assert_eq!(rescheduled.original_start, Some(start));
    assert_eq!(rescheduled.original_end, Some(end));
    assert_eq!(rescheduled.start, third_start);
    assert_eq!(rescheduled.total_hours, 3);

    let stored = f.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.original_start, Some(start));
}

#[tokio::test]
async fn reschedule_into_taken_interval_is_rejected() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let first = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();
    let other_start = start + Duration::days(1);
    f.service
        .create_booking(
            UserId::new(),
            studio.id,
            other_start,
            other_start + Duration::hours(2),
        )
        .await
        .unwrap();

    let result = f
        .service
        .reschedule_booking(
            renter,
            first.id,
            other_start + Duration::hours(1),
            other_start + Duration::hours(3),
        )
        .await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));

    // The stored booking kept its interval.
    let stored = f.store.get_booking(first.id).await.unwrap().unwrap();
    assert_eq!(stored.start, start);
    assert_eq!(stored.original_start, None);
}

#[tokio::test]
async fn completion_sweep_completes_elapsed_confirmed_bookings() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(UserId::new(), studio.id, start, end)
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;
    f.service
        .confirm_booking(studio.host_id, booking.id)
        .await
        .unwrap();

    // Nothing to do while the booking is running.
    f.clock.set(start + Duration::hours(1));
    assert_eq!(f.service.sweep_completions().await, 0);

    f.clock.set(end + Duration::minutes(5));
    assert_eq!(f.service.sweep_completions().await, 1);

    let stored = f.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);

    // The sweep is idempotent.
    assert_eq!(f.service.sweep_completions().await, 0);
}

#[tokio::test]
async fn review_submission_completes_before_end() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(UserId::new(), studio.id, start, end)
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;
    f.service
        .confirm_booking(studio.host_id, booking.id)
        .await
        .unwrap();

    let completed = f
        .service
        .complete_booking(booking.id, CompletionTrigger::ReviewSubmitted)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
}

#[tokio::test]
async fn notifications_reach_the_counterparty() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();
    mark_paid(&f.store, &booking).await;
    f.service
        .confirm_booking(studio.host_id, booking.id)
        .await
        .unwrap();

    // Dispatch is detached; give the spawned tasks a beat.
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let delivered = f.sink.delivered();
    assert!(delivered.iter().any(|n| {
        n.user_id == studio.host_id && n.kind == NotificationKind::BookingRequested
    }));
    assert!(delivered
        .iter()
        .any(|n| n.user_id == renter && n.kind == NotificationKind::BookingConfirmed));
}

#[tokio::test]
async fn availability_frees_slots_after_cancellation() {
    let (f, _gateway) = fixture();
    let studio = studio(CancellationPolicy::Flexible, false);
    f.store.insert_studio(&studio).await.unwrap();
    let renter = UserId::new();

    let (start, end) = tomorrow_evening();
    let booking = f
        .service
        .create_booking(renter, studio.id, start, end)
        .await
        .unwrap();

    let day = start.date_naive();
    let days = f.service.get_availability(studio.id, day, day).await.unwrap();
    let booked: Vec<_> = days[0].slots.iter().filter(|s| !s.available).collect();
    assert_eq!(booked.len(), 2);
    assert_eq!(booked[0].start, start);

    let check = f.service.check_slot(studio.id, start, end).await.unwrap();
    assert!(!check.available);

    f.service
        .cancel_booking(renter, booking.id, "freeing it".to_string())
        .await
        .unwrap();

    let check = f.service.check_slot(studio.id, start, end).await.unwrap();
    assert!(check.available);
}

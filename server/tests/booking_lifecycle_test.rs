//! End-to-end lifecycle tests for the booking and escalation engines.
//!
//! Exercises the documented scenarios against real stores: commands go
//! through `send_and_wait_for`, replies carry the exact error kinds, and
//! state is read back through committed snapshots.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use wayfarer_core::environment::FixedClock;
use wayfarer_server::aggregates::{BookingEnvironment, EscalationEnvironment};
use wayfarer_server::engines::{BookingEngine, EngineError, EscalationEngine, NewBooking};
use wayfarer_server::payment_gateway::{DecliningPaymentGateway, MockPaymentGateway, PaymentGateway};
use wayfarer_server::types::{
    BookingStatus, Identity, LifecycleError, Money, PaymentStatus, PropertyId, Role, UserId,
};
use wayfarer_server::vouchers::RandomVoucherGenerator;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Engine with the clock frozen before the test stay dates
fn engine_with(gateway: Arc<dyn PaymentGateway>) -> BookingEngine {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
    BookingEngine::new(
        BookingEnvironment::new(Arc::new(clock), Arc::new(RandomVoucherGenerator::new())),
        gateway,
        Duration::from_secs(5),
    )
}

fn request() -> NewBooking {
    NewBooking {
        property: PropertyId::new(),
        check_in: date(2025, 6, 1),
        check_out: date(2025, 6, 5),
        guests: 2,
        amount: Money::from_dollars(500),
    }
}

fn traveler() -> Identity {
    Identity::new(UserId::new(), Role::Traveler)
}

fn admin() -> Identity {
    Identity::new(UserId::new(), Role::Admin)
}

// Invariant sweep used after every scenario step
async fn check_invariants(engine: &BookingEngine) {
    let violations = engine
        .state(|s| {
            let mut violations = Vec::new();
            for booking in s.bookings.values() {
                if booking.payment == PaymentStatus::Paid
                    && !matches!(
                        booking.status,
                        BookingStatus::Confirmed | BookingStatus::Completed
                    )
                {
                    violations.push(format!("{}: paid but {}", booking.id, booking.status));
                }
                let has_voucher = booking.voucher.is_some();
                let is_paid = booking.payment == PaymentStatus::Paid;
                if has_voucher != is_paid {
                    violations.push(format!(
                        "{}: voucher {} but payment {}",
                        booking.id,
                        if has_voucher { "present" } else { "absent" },
                        booking.payment
                    ));
                }
                if let Some(voucher) = &booking.voucher {
                    if !s.issued_vouchers.contains(voucher) {
                        violations.push(format!("{}: voucher missing from issued set", booking.id));
                    }
                }
            }
            violations
        })
        .await;
    assert!(violations.is_empty(), "invariant violations: {violations:?}");
}

#[tokio::test]
async fn documented_scenario_create_confirm_pay_then_cancel_is_rejected() {
    let engine = engine_with(MockPaymentGateway::shared());
    let owner = traveler();
    let staff = admin();

    // create (dates 2025-06-01 → 2025-06-05, guests 2, amount $500)
    let booking = engine.create(owner, request()).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment, PaymentStatus::Pending);
    check_invariants(&engine).await;

    // confirm by admin
    let booking = engine.confirm(staff, booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    check_invariants(&engine).await;

    // pay by the owning traveler
    let booking = engine.pay(owner, booking.id).await.unwrap();
    assert_eq!(booking.payment, PaymentStatus::Paid);
    let voucher = booking.voucher.clone().unwrap();
    assert!(!voucher.as_str().is_empty());
    check_invariants(&engine).await;

    // cancel by the same traveler afterwards: rejected, reconciliation is
    // the refund operation
    let result = engine.cancel(owner, booking.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. }))
    ));
    check_invariants(&engine).await;

    // the booking is untouched
    let unchanged = engine.state(|s| s.get(&booking.id).cloned()).await.unwrap();
    assert_eq!(unchanged.status, BookingStatus::Confirmed);
    assert_eq!(unchanged.payment, PaymentStatus::Paid);
    assert_eq!(unchanged.voucher, Some(voucher));
}

#[tokio::test]
async fn confirm_twice_rejects_the_second_call() {
    let engine = engine_with(MockPaymentGateway::shared());
    let booking = engine.create(traveler(), request()).await.unwrap();

    engine.confirm(admin(), booking.id).await.unwrap();
    let second = engine.confirm(admin(), booking.id).await;
    assert!(matches!(
        second,
        Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. }))
    ));
}

#[tokio::test]
async fn confirm_by_traveler_is_permission_denied() {
    let engine = engine_with(MockPaymentGateway::shared());
    let owner = traveler();
    let booking = engine.create(owner, request()).await.unwrap();

    let result = engine.confirm(owner, booking.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Lifecycle(LifecycleError::PermissionDenied(_)))
    ));
}

#[tokio::test]
async fn pay_by_non_owner_is_permission_denied() {
    let engine = engine_with(MockPaymentGateway::shared());
    let owner = traveler();
    let stranger = traveler();
    let booking = engine.create(owner, request()).await.unwrap();
    engine.confirm(admin(), booking.id).await.unwrap();

    let result = engine.pay(stranger, booking.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Lifecycle(LifecycleError::PermissionDenied(_)))
    ));
}

#[tokio::test]
async fn vouchers_are_unique_across_all_paid_bookings() {
    let engine = engine_with(MockPaymentGateway::shared());
    let staff = admin();

    let mut vouchers = std::collections::HashSet::new();
    for _ in 0..25 {
        let owner = traveler();
        let booking = engine.create(owner, request()).await.unwrap();
        engine.confirm(staff, booking.id).await.unwrap();
        let paid = engine.pay(owner, booking.id).await.unwrap();
        let voucher = paid.voucher.unwrap();
        assert!(
            vouchers.insert(voucher.clone()),
            "voucher {voucher} issued twice"
        );
    }
    check_invariants(&engine).await;
}

#[tokio::test]
async fn declined_payment_can_be_retried() {
    // First engine call declines, then we rebuild the scenario with an
    // approving gateway sharing the same store is not possible from outside,
    // so exercise retry against the same engine: decline, then decline again
    // leaves the booking payable.
    let engine = engine_with(DecliningPaymentGateway::shared("card expired"));
    let owner = traveler();
    let booking = engine.create(owner, request()).await.unwrap();
    engine.confirm(admin(), booking.id).await.unwrap();

    let first = engine.pay(owner, booking.id).await;
    assert!(matches!(
        first,
        Err(EngineError::Lifecycle(LifecycleError::PaymentDeclined(_)))
    ));
    let payment = engine
        .state(|s| s.get(&booking.id).unwrap().payment.clone())
        .await;
    assert!(matches!(payment, PaymentStatus::Failed { .. }));

    // Still payable: a second attempt reaches the gateway again
    let second = engine.pay(owner, booking.id).await;
    assert!(matches!(
        second,
        Err(EngineError::Lifecycle(LifecycleError::PaymentDeclined(_)))
    ));
    check_invariants(&engine).await;
}

#[tokio::test]
async fn refund_reconciles_a_paid_booking() {
    let engine = engine_with(MockPaymentGateway::shared());
    let owner = traveler();
    let booking = engine.create(owner, request()).await.unwrap();
    engine.confirm(admin(), booking.id).await.unwrap();
    engine.pay(owner, booking.id).await.unwrap();

    let refunded = engine.refund(admin(), booking.id).await.unwrap();
    assert_eq!(refunded.status, BookingStatus::Cancelled);
    assert_eq!(refunded.payment, PaymentStatus::Refunded);
    assert!(refunded.voucher.is_none());
    check_invariants(&engine).await;

    // Terminal: nothing else may happen to it
    for result in [
        engine.cancel(owner, booking.id).await,
        engine.confirm(admin(), booking.id).await,
        engine.pay(owner, booking.id).await,
        engine.complete(booking.id).await,
    ] {
        assert!(matches!(
            result,
            Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. }))
        ));
    }
}

#[tokio::test]
async fn completion_is_terminal() {
    let engine = engine_with(MockPaymentGateway::shared());
    let owner = traveler();
    let booking = engine.create(owner, request()).await.unwrap();
    engine.confirm(admin(), booking.id).await.unwrap();
    engine.pay(owner, booking.id).await.unwrap();

    let completed = engine.complete(booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    // paid ⇒ confirmed-or-completed still holds
    assert_eq!(completed.payment, PaymentStatus::Paid);
    check_invariants(&engine).await;

    let result = engine.cancel(owner, booking.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. }))
    ));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let engine = engine_with(MockPaymentGateway::shared());
    let ghost = wayfarer_server::types::BookingId::new();

    let result = engine.confirm(admin(), ghost).await;
    assert!(matches!(
        result,
        Err(EngineError::Lifecycle(LifecycleError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn escalation_scenario_respond_once_only() {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
    let engine = EscalationEngine::new(
        EscalationEnvironment::new(Arc::new(clock)),
        Duration::from_secs(5),
    );
    let user = traveler();
    let responder = admin();

    let ticket = engine
        .open(user, "Can I get a refund?".to_string())
        .await
        .unwrap();
    assert_eq!(
        ticket.status,
        wayfarer_server::types::EscalationStatus::Pending
    );

    let resolved = engine
        .respond(
            responder,
            ticket.id,
            "Refunds processed within 5 days".to_string(),
        )
        .await
        .unwrap();
    assert_eq!(
        resolved.status,
        wayfarer_server::types::EscalationStatus::Resolved
    );
    assert_eq!(
        resolved.admin_response.as_deref(),
        Some("Refunds processed within 5 days")
    );

    let second = engine
        .respond(responder, ticket.id, "another answer".to_string())
        .await;
    assert!(matches!(
        second,
        Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. }))
    ));
}

//! Concurrency tests for the booking engine.
//!
//! Mutations of one booking are serialized through its store: of N racing
//! commands exactly one wins, and every loser observes the post-transition
//! state as `InvalidTransition`. Commands on different bookings proceed
//! independently.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use wayfarer_core::environment::FixedClock;
use wayfarer_server::aggregates::BookingEnvironment;
use wayfarer_server::engines::{BookingEngine, EngineError, NewBooking};
use wayfarer_server::payment_gateway::MockPaymentGateway;
use wayfarer_server::types::{
    BookingStatus, Identity, LifecycleError, Money, PaymentStatus, PropertyId, Role, UserId,
};
use wayfarer_server::vouchers::RandomVoucherGenerator;

fn engine() -> BookingEngine {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
    BookingEngine::new(
        BookingEnvironment::new(Arc::new(clock), Arc::new(RandomVoucherGenerator::new())),
        MockPaymentGateway::shared(),
        Duration::from_secs(10),
    )
}

fn request() -> NewBooking {
    NewBooking {
        property: PropertyId::new(),
        check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        guests: 2,
        amount: Money::from_dollars(500),
    }
}

#[tokio::test]
async fn racing_confirms_have_exactly_one_winner() {
    let engine = engine();
    let staff = Identity::new(UserId::new(), Role::Admin);
    let booking = engine
        .create(Identity::new(UserId::new(), Role::Traveler), request())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let id = booking.id;
        handles.push(tokio::spawn(
            async move { engine.confirm(staff, id).await },
        ));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(confirmed) => {
                assert_eq!(confirmed.status, BookingStatus::Confirmed);
                wins += 1;
            },
            Err(EngineError::Lifecycle(LifecycleError::InvalidTransition { .. })) => {
                conflicts += 1;
            },
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(wins, 1, "exactly one confirm must win");
    assert_eq!(conflicts, 15);
}

#[tokio::test]
async fn racing_pay_and_cancel_never_strand_a_paid_cancellation() {
    // Run the race many times: whatever the interleaving, the end state is
    // either (cancelled, not paid) or (confirmed, paid with voucher).
    for _ in 0..10 {
        let engine = engine();
        let owner = Identity::new(UserId::new(), Role::Traveler);
        let staff = Identity::new(UserId::new(), Role::Admin);
        let booking = engine.create(owner, request()).await.unwrap();
        engine.confirm(staff, booking.id).await.unwrap();

        let pay = {
            let engine = engine.clone();
            let id = booking.id;
            tokio::spawn(async move { engine.pay(owner, id).await })
        };
        let cancel = {
            let engine = engine.clone();
            let id = booking.id;
            tokio::spawn(async move { engine.cancel(owner, id).await })
        };

        let pay_result = pay.await.unwrap();
        let cancel_result = cancel.await.unwrap();

        let final_state = engine.state(|s| s.get(&booking.id).cloned()).await.unwrap();
        match (&pay_result, &cancel_result) {
            (Ok(_), Err(_)) => {
                assert_eq!(final_state.status, BookingStatus::Confirmed);
                assert_eq!(final_state.payment, PaymentStatus::Paid);
                assert!(final_state.voucher.is_some());
            },
            (Err(_), Ok(_)) => {
                assert_eq!(final_state.status, BookingStatus::Cancelled);
                assert_ne!(final_state.payment, PaymentStatus::Paid);
                assert!(final_state.voucher.is_none());
            },
            (Ok(_), Ok(_)) => panic!("pay and cancel cannot both win"),
            (Err(pay_err), Err(cancel_err)) => {
                panic!("one racer must win, got pay={pay_err} cancel={cancel_err}")
            },
        }
    }
}

#[tokio::test]
async fn racing_pays_issue_exactly_one_voucher() {
    let engine = engine();
    let owner = Identity::new(UserId::new(), Role::Traveler);
    let staff = Identity::new(UserId::new(), Role::Admin);
    let booking = engine.create(owner, request()).await.unwrap();
    engine.confirm(staff, booking.id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let id = booking.id;
        handles.push(tokio::spawn(async move { engine.pay(owner, id).await }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1, "exactly one pay must win");

    let (voucher_count, issued) = engine
        .state(|s| {
            let booking = s.get(&booking.id).cloned().unwrap();
            (
                usize::from(booking.voucher.is_some()),
                s.issued_vouchers.len(),
            )
        })
        .await;
    assert_eq!(voucher_count, 1);
    assert_eq!(issued, 1, "losing pays must not issue vouchers");
}

#[tokio::test]
async fn different_bookings_proceed_independently() {
    let engine = engine();
    let staff = Identity::new(UserId::new(), Role::Admin);

    let mut handles = Vec::new();
    for _ in 0..24 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let owner = Identity::new(UserId::new(), Role::Traveler);
            let booking = engine.create(owner, request()).await?;
            let booking = engine.confirm(staff, booking.id).await?;
            engine.pay(owner, booking.id).await
        }));
    }

    for handle in handles {
        let booking = handle.await.unwrap().unwrap();
        assert_eq!(booking.payment, PaymentStatus::Paid);
    }

    let (count, vouchers) = engine
        .state(|s| (s.count(), s.issued_vouchers.len()))
        .await;
    assert_eq!(count, 24);
    assert_eq!(vouchers, 24);
}

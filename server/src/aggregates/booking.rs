//! Booking aggregate reducer.
//!
//! Owns the booking state machine (`Pending → Confirmed → Completed`, with
//! `Cancelled` reachable from `Pending`/`Confirmed`) and the orthogonal
//! payment sub-state. Every command runs the same pipeline: look up the
//! entity, consult the role guard, consult the transition table, apply in
//! place, reply. Re-invoking an operation that would not change state is
//! rejected with `InvalidTransition` - the lifecycle is append-only and
//! callers must not retry blindly.

use crate::guard::{self, Operation, Ownership};
use crate::types::{
    Booking, BookingId, BookingState, BookingStatus, GuestCount, Identity, LifecycleError, Money,
    PaymentStatus, PropertyId, StayDates, VoucherCode,
};
use crate::vouchers::VoucherGenerator;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::environment::Clock;
use wayfarer_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Environment dependencies for the booking reducer
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for transition timestamps
    pub clock: Arc<dyn Clock>,
    /// Voucher generator consulted when a payment succeeds
    pub vouchers: Arc<dyn VoucherGenerator>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, vouchers: Arc<dyn VoucherGenerator>) -> Self {
        Self { clock, vouchers }
    }
}

/// Result of the payment-gateway round-trip, carried by the `Pay` command
///
/// The gateway is consulted by the engine facade before the command is
/// submitted, so the reducer itself never blocks on external I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The gateway captured the charge
    Approved {
        /// Gateway transaction ID (kept for compensation on a lost race)
        transaction_id: String,
    },
    /// The gateway declined the charge
    Declined {
        /// Decline reason
        reason: String,
    },
}

/// All inputs to the booking reducer: commands and their replies
#[derive(Clone, Debug)]
pub enum BookingAction {
    // ========== Commands ==========
    /// Create a new booking owned by the caller
    Create {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// Pre-generated id for the new booking
        booking_id: BookingId,
        /// The caller (must be a traveler; becomes the owner)
        caller: Identity,
        /// The property being booked
        property: PropertyId,
        /// Requested check-in date
        check_in: NaiveDate,
        /// Requested check-out date
        check_out: NaiveDate,
        /// Requested guest count (validated by the reducer)
        guests: u32,
        /// Total amount for the stay
        amount: Money,
    },
    /// Confirm a pending booking (staff)
    Confirm {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The booking to confirm
        booking_id: BookingId,
        /// The caller
        caller: Identity,
    },
    /// Record the outcome of a payment attempt (owning traveler)
    Pay {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The booking being paid
        booking_id: BookingId,
        /// The caller
        caller: Identity,
        /// Gateway outcome obtained by the engine facade
        outcome: ChargeOutcome,
    },
    /// Cancel a booking (owner or staff; not once paid)
    Cancel {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The booking to cancel
        booking_id: BookingId,
        /// The caller
        caller: Identity,
    },
    /// Refund a paid booking and cancel it (admin)
    Refund {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The booking to refund
        booking_id: BookingId,
        /// The caller
        caller: Identity,
    },
    /// System-internal post-stay transition; not exposed to end users
    Complete {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The booking to complete
        booking_id: BookingId,
    },

    // ========== Replies ==========
    /// The command was applied; carries the post-transition booking
    Accepted {
        /// Correlation id of the originating command
        correlation_id: Uuid,
        /// The booking after the transition
        booking: Box<Booking>,
    },
    /// The command was rejected; carries the exact error kind
    Rejected {
        /// Correlation id of the originating command
        correlation_id: Uuid,
        /// Why the command was rejected
        error: LifecycleError,
    },
}

/// Reducer for the booking aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Transition table for the booking status machine
    ///
    /// Keyed by (current status, operation); the caller's role has already
    /// been resolved by the guard when this table is consulted. Everything
    /// not listed here is an invalid transition - including re-invoking an
    /// operation whose target state already holds.
    fn status_transition(
        current: BookingStatus,
        operation: Operation,
    ) -> Result<BookingStatus, LifecycleError> {
        match (current, operation) {
            (BookingStatus::Pending, Operation::ConfirmBooking) => Ok(BookingStatus::Confirmed),
            (BookingStatus::Pending | BookingStatus::Confirmed, Operation::CancelBooking) => {
                Ok(BookingStatus::Cancelled)
            },
            (BookingStatus::Confirmed, Operation::CompleteBooking) => Ok(BookingStatus::Completed),
            (BookingStatus::Confirmed, Operation::RefundBooking) => Ok(BookingStatus::Cancelled),
            (from, attempted) => Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: from.to_string(),
                attempted: attempted.verb(),
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_create(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        caller: Identity,
        property: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        amount: Money,
    ) -> Result<Booking, LifecycleError> {
        guard::authorize(caller.role, Operation::CreateBooking, Ownership::NotApplicable)?;

        let now = env.clock.now();
        let dates = StayDates::new(check_in, check_out, now.date_naive())?;
        let guests = GuestCount::new(guests)?;

        let booking = Booking::new(
            booking_id,
            caller.user_id,
            property,
            dates,
            guests,
            amount,
            now,
        );
        state.bookings.insert(booking_id, booking.clone());
        Ok(booking)
    }

    fn handle_confirm(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        caller: Identity,
    ) -> Result<Booking, LifecycleError> {
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Err(LifecycleError::booking_not_found(booking_id));
        };

        guard::authorize(caller.role, Operation::ConfirmBooking, Ownership::NotApplicable)?;

        booking.status = Self::status_transition(booking.status, Operation::ConfirmBooking)?;
        booking.updated_at = env.clock.now();
        Ok(booking.clone())
    }

    fn handle_pay(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        caller: Identity,
        outcome: ChargeOutcome,
    ) -> Result<Booking, LifecycleError> {
        let BookingState {
            bookings,
            issued_vouchers,
        } = state;

        let Some(booking) = bookings.get_mut(&booking_id) else {
            return Err(LifecycleError::booking_not_found(booking_id));
        };

        let ownership = if booking.is_owned_by(&caller.user_id) {
            Ownership::Owner
        } else {
            Ownership::NotOwner
        };
        guard::authorize(caller.role, Operation::PayBooking, ownership)?;

        if booking.status != BookingStatus::Confirmed {
            return Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: booking.status.to_string(),
                attempted: Operation::PayBooking.verb(),
            });
        }
        if !booking.payment.is_payable() {
            return Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: format!("already {}", booking.payment),
                attempted: Operation::PayBooking.verb(),
            });
        }

        match outcome {
            ChargeOutcome::Declined { reason } => {
                booking.payment = PaymentStatus::Failed {
                    reason: reason.clone(),
                };
                booking.updated_at = env.clock.now();
                Err(LifecycleError::PaymentDeclined(reason))
            },
            ChargeOutcome::Approved { .. } => {
                // Payment flip and voucher issuance commit in this single
                // reduce step; a partial write cannot be observed.
                let voucher = Self::issue_voucher(issued_vouchers, env.vouchers.as_ref());
                booking.payment = PaymentStatus::Paid;
                booking.voucher = Some(voucher);
                booking.updated_at = env.clock.now();
                Ok(booking.clone())
            },
        }
    }

    fn handle_cancel(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        caller: Identity,
    ) -> Result<Booking, LifecycleError> {
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Err(LifecycleError::booking_not_found(booking_id));
        };

        let ownership = if booking.is_owned_by(&caller.user_id) {
            Ownership::Owner
        } else {
            Ownership::NotOwner
        };
        guard::authorize(caller.role, Operation::CancelBooking, ownership)?;

        // A paid booking is never cancelled directly: the money has to go
        // somewhere, and that path is the explicit refund operation.
        if booking.payment == PaymentStatus::Paid {
            return Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: "paid".to_string(),
                attempted: Operation::CancelBooking.verb(),
            });
        }

        booking.status = Self::status_transition(booking.status, Operation::CancelBooking)?;
        booking.updated_at = env.clock.now();
        Ok(booking.clone())
    }

    fn handle_refund(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
        caller: Identity,
    ) -> Result<Booking, LifecycleError> {
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Err(LifecycleError::booking_not_found(booking_id));
        };

        guard::authorize(caller.role, Operation::RefundBooking, Ownership::NotApplicable)?;

        if booking.payment != PaymentStatus::Paid {
            return Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: format!("payment {}", booking.payment),
                attempted: Operation::RefundBooking.verb(),
            });
        }

        booking.status = Self::status_transition(booking.status, Operation::RefundBooking)?;
        // Refund, cancellation, and voucher voiding commit together; the
        // voucher-iff-paid invariant holds on both sides of this step.
        booking.payment = PaymentStatus::Refunded;
        booking.voucher = None;
        booking.updated_at = env.clock.now();
        Ok(booking.clone())
    }

    fn handle_complete(
        state: &mut BookingState,
        env: &BookingEnvironment,
        booking_id: BookingId,
    ) -> Result<Booking, LifecycleError> {
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Err(LifecycleError::booking_not_found(booking_id));
        };

        // System-internal transition: no caller identity, guard not consulted.
        booking.status = Self::status_transition(booking.status, Operation::CompleteBooking)?;
        booking.updated_at = env.clock.now();
        Ok(booking.clone())
    }

    /// Draw voucher candidates until one is globally fresh
    ///
    /// The issued set covers every code ever handed out, including vouchers
    /// later voided by a refund, so codes are never reused.
    fn issue_voucher(
        issued: &mut std::collections::HashSet<VoucherCode>,
        generator: &dyn VoucherGenerator,
    ) -> VoucherCode {
        let code = loop {
            let candidate = generator.generate();
            if !issued.contains(&candidate) {
                break candidate;
            }
        };
        issued.insert(code.clone());
        code
    }

    fn reply(
        correlation_id: Uuid,
        result: Result<Booking, LifecycleError>,
        operation: &'static str,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let action = match result {
            Ok(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    status = %booking.status,
                    payment = %booking.payment,
                    operation,
                    "booking transition applied"
                );
                BookingAction::Accepted {
                    correlation_id,
                    booking: Box::new(booking),
                }
            },
            Err(error) => {
                tracing::warn!(%error, operation, "booking command rejected");
                BookingAction::Rejected {
                    correlation_id,
                    error,
                }
            },
        };
        smallvec![Effect::reply(action)]
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BookingAction::Create {
                correlation_id,
                booking_id,
                caller,
                property,
                check_in,
                check_out,
                guests,
                amount,
            } => {
                let result = Self::handle_create(
                    state, env, booking_id, caller, property, check_in, check_out, guests, amount,
                );
                Self::reply(correlation_id, result, "create")
            },
            BookingAction::Confirm {
                correlation_id,
                booking_id,
                caller,
            } => {
                let result = Self::handle_confirm(state, env, booking_id, caller);
                Self::reply(correlation_id, result, "confirm")
            },
            BookingAction::Pay {
                correlation_id,
                booking_id,
                caller,
                outcome,
            } => {
                let result = Self::handle_pay(state, env, booking_id, caller, outcome);
                Self::reply(correlation_id, result, "pay")
            },
            BookingAction::Cancel {
                correlation_id,
                booking_id,
                caller,
            } => {
                let result = Self::handle_cancel(state, env, booking_id, caller);
                Self::reply(correlation_id, result, "cancel")
            },
            BookingAction::Refund {
                correlation_id,
                booking_id,
                caller,
            } => {
                let result = Self::handle_refund(state, env, booking_id, caller);
                Self::reply(correlation_id, result, "refund")
            },
            BookingAction::Complete {
                correlation_id,
                booking_id,
            } => {
                let result = Self::handle_complete(state, env, booking_id);
                Self::reply(correlation_id, result, "complete")
            },

            // Replies are notifications for observers, not state inputs
            BookingAction::Accepted { .. } | BookingAction::Rejected { .. } => SmallVec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::types::{Role, UserId};
    use crate::vouchers::SequenceVoucherGenerator;
    use chrono::{TimeZone, Utc};
    use wayfarer_core::environment::FixedClock;
    use wayfarer_testing::{ReducerTest, assertions};

    fn test_env() -> BookingEnvironment {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
        BookingEnvironment::new(
            Arc::new(clock),
            Arc::new(SequenceVoucherGenerator::default()),
        )
    }

    fn traveler() -> Identity {
        Identity::new(UserId::new(), Role::Traveler)
    }

    fn admin() -> Identity {
        Identity::new(UserId::new(), Role::Admin)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Seed a state with one booking owned by `owner`, in the given states
    fn seeded_state(
        owner: Identity,
        booking_id: BookingId,
        status: BookingStatus,
        payment: PaymentStatus,
    ) -> BookingState {
        let mut state = BookingState::new();
        let env = test_env();
        let dates =
            StayDates::new(date(2025, 6, 1), date(2025, 6, 5), date(2025, 1, 15)).unwrap();
        let mut booking = Booking::new(
            booking_id,
            owner.user_id,
            PropertyId::new(),
            dates,
            GuestCount::new(2).unwrap(),
            Money::from_dollars(500),
            env.clock.now(),
        );
        booking.status = status;
        if payment == PaymentStatus::Paid {
            booking.voucher = Some(VoucherCode::new("SEEDED01".to_string()));
            state.issued_vouchers.insert(VoucherCode::new("SEEDED01".to_string()));
        }
        booking.payment = payment;
        state.bookings.insert(booking_id, booking);
        state
    }

    #[test]
    fn create_starts_pending_and_unpaid() {
        let caller = traveler();
        let booking_id = BookingId::new();

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(BookingState::new())
            .when_action(BookingAction::Create {
                correlation_id: Uuid::new_v4(),
                booking_id,
                caller,
                property: PropertyId::new(),
                check_in: date(2025, 6, 1),
                check_out: date(2025, 6, 5),
                guests: 2,
                amount: Money::from_dollars(500),
            })
            .then_state(move |state| {
                let booking = state.get(&booking_id).unwrap();
                assert_eq!(booking.status, BookingStatus::Pending);
                assert_eq!(booking.payment, PaymentStatus::Pending);
                assert_eq!(booking.traveler, caller.user_id);
                assert!(booking.voucher.is_none());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn create_rejects_inverted_dates() {
        let env = test_env();
        let mut state = BookingState::new();
        let result = BookingReducer::handle_create(
            &mut state,
            &env,
            BookingId::new(),
            traveler(),
            PropertyId::new(),
            date(2025, 6, 5),
            date(2025, 6, 1),
            2,
            Money::from_dollars(500),
        );
        assert!(matches!(result, Err(LifecycleError::Validation(_))));
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn create_rejects_past_checkin() {
        let env = test_env();
        let mut state = BookingState::new();
        let result = BookingReducer::handle_create(
            &mut state,
            &env,
            BookingId::new(),
            traveler(),
            PropertyId::new(),
            date(2024, 12, 1),
            date(2024, 12, 5),
            2,
            Money::from_dollars(500),
        );
        assert!(matches!(result, Err(LifecycleError::Validation(_))));
    }

    #[test]
    fn create_rejects_zero_guests() {
        let env = test_env();
        let mut state = BookingState::new();
        let result = BookingReducer::handle_create(
            &mut state,
            &env,
            BookingId::new(),
            traveler(),
            PropertyId::new(),
            date(2025, 6, 1),
            date(2025, 6, 5),
            0,
            Money::from_dollars(500),
        );
        assert!(matches!(result, Err(LifecycleError::Validation(_))));
    }

    #[test]
    fn create_rejects_staff_callers() {
        let env = test_env();
        let mut state = BookingState::new();
        let result = BookingReducer::handle_create(
            &mut state,
            &env,
            BookingId::new(),
            admin(),
            PropertyId::new(),
            date(2025, 6, 1),
            date(2025, 6, 5),
            2,
            Money::from_dollars(500),
        );
        assert!(matches!(result, Err(LifecycleError::PermissionDenied(_))));
    }

    #[test]
    fn confirm_moves_pending_to_confirmed() {
        let owner = traveler();
        let booking_id = BookingId::new();
        let state = seeded_state(owner, booking_id, BookingStatus::Pending, PaymentStatus::Pending);

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(state)
            .when_action(BookingAction::Confirm {
                correlation_id: Uuid::new_v4(),
                booking_id,
                caller: admin(),
            })
            .then_state(move |state| {
                assert_eq!(state.get(&booking_id).unwrap().status, BookingStatus::Confirmed);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn confirm_by_traveler_is_denied_in_any_state() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            let mut state = seeded_state(owner, booking_id, status, PaymentStatus::Pending);
            let result =
                BookingReducer::handle_confirm(&mut state, &env, booking_id, owner);
            assert!(
                matches!(result, Err(LifecycleError::PermissionDenied(_))),
                "confirm by traveler should be denied when {status}"
            );
        }
    }

    #[test]
    fn confirm_twice_is_an_invalid_transition() {
        let env = test_env();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            traveler(),
            booking_id,
            BookingStatus::Pending,
            PaymentStatus::Pending,
        );

        BookingReducer::handle_confirm(&mut state, &env, booking_id, admin()).unwrap();
        let second = BookingReducer::handle_confirm(&mut state, &env, booking_id, admin());
        assert!(matches!(
            second,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn confirm_unknown_booking_is_not_found() {
        let env = test_env();
        let mut state = BookingState::new();
        let result =
            BookingReducer::handle_confirm(&mut state, &env, BookingId::new(), admin());
        assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
    }

    #[test]
    fn pay_flips_payment_and_issues_voucher() {
        let owner = traveler();
        let booking_id = BookingId::new();
        let state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Pending,
        );

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(state)
            .when_action(BookingAction::Pay {
                correlation_id: Uuid::new_v4(),
                booking_id,
                caller: owner,
                outcome: ChargeOutcome::Approved {
                    transaction_id: "txn_1".to_string(),
                },
            })
            .then_state(move |state| {
                let booking = state.get(&booking_id).unwrap();
                assert_eq!(booking.payment, PaymentStatus::Paid);
                assert_eq!(booking.status, BookingStatus::Confirmed);
                let voucher = booking.voucher.as_ref().unwrap();
                assert!(!voucher.as_str().is_empty());
                assert!(state.issued_vouchers.contains(voucher));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn pay_regenerates_on_voucher_collision() {
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Pending,
        );
        // First candidate collides with a code already issued
        state
            .issued_vouchers
            .insert(VoucherCode::new("TAKEN001".to_string()));
        let env = BookingEnvironment::new(
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
            )),
            Arc::new(SequenceVoucherGenerator::scripted(["TAKEN001", "FRESH002"])),
        );

        let booking = BookingReducer::handle_pay(
            &mut state,
            &env,
            booking_id,
            owner,
            ChargeOutcome::Approved {
                transaction_id: "txn_1".to_string(),
            },
        )
        .unwrap();

        assert_eq!(booking.voucher.unwrap().as_str(), "FRESH002");
    }

    #[test]
    fn pay_by_non_owner_is_denied_in_any_state() {
        let env = test_env();
        let owner = traveler();
        let stranger = traveler();
        let booking_id = BookingId::new();
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            let mut state = seeded_state(owner, booking_id, status, PaymentStatus::Pending);
            let result = BookingReducer::handle_pay(
                &mut state,
                &env,
                booking_id,
                stranger,
                ChargeOutcome::Approved {
                    transaction_id: "txn_1".to_string(),
                },
            );
            assert!(
                matches!(result, Err(LifecycleError::PermissionDenied(_))),
                "pay by non-owner should be denied when {status}"
            );
        }
    }

    #[test]
    fn pay_requires_confirmed_status() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Pending,
            PaymentStatus::Pending,
        );
        let result = BookingReducer::handle_pay(
            &mut state,
            &env,
            booking_id,
            owner,
            ChargeOutcome::Approved {
                transaction_id: "txn_1".to_string(),
            },
        );
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn pay_twice_is_an_invalid_transition() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
        );
        let result = BookingReducer::handle_pay(
            &mut state,
            &env,
            booking_id,
            owner,
            ChargeOutcome::Approved {
                transaction_id: "txn_2".to_string(),
            },
        );
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn declined_charge_records_failure_and_reports_it() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Pending,
        );

        let result = BookingReducer::handle_pay(
            &mut state,
            &env,
            booking_id,
            owner,
            ChargeOutcome::Declined {
                reason: "insufficient funds".to_string(),
            },
        );

        assert_eq!(
            result,
            Err(LifecycleError::PaymentDeclined(
                "insufficient funds".to_string()
            ))
        );
        let booking = state.get(&booking_id).unwrap();
        assert!(matches!(booking.payment, PaymentStatus::Failed { .. }));
        assert!(booking.voucher.is_none());
    }

    #[test]
    fn pay_can_be_retried_after_a_decline() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Failed {
                reason: "card expired".to_string(),
            },
        );

        let booking = BookingReducer::handle_pay(
            &mut state,
            &env,
            booking_id,
            owner,
            ChargeOutcome::Approved {
                transaction_id: "txn_retry".to_string(),
            },
        )
        .unwrap();

        assert_eq!(booking.payment, PaymentStatus::Paid);
        assert!(booking.voucher.is_some());
    }

    #[test]
    fn cancel_from_pending_and_confirmed() {
        let env = test_env();
        let owner = traveler();
        for status in [BookingStatus::Pending, BookingStatus::Confirmed] {
            let booking_id = BookingId::new();
            let mut state = seeded_state(owner, booking_id, status, PaymentStatus::Pending);
            let booking =
                BookingReducer::handle_cancel(&mut state, &env, booking_id, owner).unwrap();
            assert_eq!(booking.status, BookingStatus::Cancelled);
        }
    }

    #[test]
    fn staff_cancel_someone_elses_booking() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Pending,
            PaymentStatus::Pending,
        );
        let sales = Identity::new(UserId::new(), Role::PropertySales);
        let booking = BookingReducer::handle_cancel(&mut state, &env, booking_id, sales).unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[test]
    fn cancel_of_a_paid_booking_is_rejected() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
        );
        let result = BookingReducer::handle_cancel(&mut state, &env, booking_id, owner);
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { .. })
        ));
        // Untouched: still confirmed, still paid
        let booking = state.get(&booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment, PaymentStatus::Paid);
    }

    #[test]
    fn terminal_states_reject_every_mutation() {
        let env = test_env();
        let owner = traveler();
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            let booking_id = BookingId::new();
            let mut state = seeded_state(owner, booking_id, status, PaymentStatus::Pending);

            assert!(matches!(
                BookingReducer::handle_confirm(&mut state, &env, booking_id, admin()),
                Err(LifecycleError::InvalidTransition { .. })
            ));
            assert!(matches!(
                BookingReducer::handle_cancel(&mut state, &env, booking_id, owner),
                Err(LifecycleError::InvalidTransition { .. })
            ));
            assert!(matches!(
                BookingReducer::handle_complete(&mut state, &env, booking_id),
                Err(LifecycleError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn refund_voids_voucher_and_cancels() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
        );

        let booking =
            BookingReducer::handle_refund(&mut state, &env, booking_id, admin()).unwrap();

        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment, PaymentStatus::Refunded);
        assert!(booking.voucher.is_none());
        // The voided code stays in the issued set so it is never reused
        assert!(
            state
                .issued_vouchers
                .contains(&VoucherCode::new("SEEDED01".to_string()))
        );
    }

    #[test]
    fn refund_requires_admin() {
        let env = test_env();
        let owner = traveler();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            owner,
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
        );
        let sales = Identity::new(UserId::new(), Role::PropertySales);
        assert!(matches!(
            BookingReducer::handle_refund(&mut state, &env, booking_id, sales),
            Err(LifecycleError::PermissionDenied(_))
        ));
        assert!(matches!(
            BookingReducer::handle_refund(&mut state, &env, booking_id, owner),
            Err(LifecycleError::PermissionDenied(_))
        ));
    }

    #[test]
    fn refund_requires_a_paid_booking() {
        let env = test_env();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            traveler(),
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Pending,
        );
        assert!(matches!(
            BookingReducer::handle_refund(&mut state, &env, booking_id, admin()),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn complete_moves_confirmed_to_completed() {
        let env = test_env();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            traveler(),
            booking_id,
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
        );
        let booking = BookingReducer::handle_complete(&mut state, &env, booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        // The paid ⇒ confirmed-or-completed invariant still holds
        assert_eq!(booking.payment, PaymentStatus::Paid);
    }

    #[test]
    fn complete_requires_confirmed() {
        let env = test_env();
        let booking_id = BookingId::new();
        let mut state = seeded_state(
            traveler(),
            booking_id,
            BookingStatus::Pending,
            PaymentStatus::Pending,
        );
        assert!(matches!(
            BookingReducer::handle_complete(&mut state, &env, booking_id),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }
}

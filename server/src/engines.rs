//! Lifecycle engine facades.
//!
//! An engine owns the store for one aggregate and turns the reply-action
//! protocol into plain `Result` methods: it submits a command with a fresh
//! correlation id, waits for the matching `Accepted`/`Rejected` reply, and
//! returns either the post-transition entity or the exact error kind.
//!
//! The payment-gateway round-trip for `Pay` also lives here, so the reducer
//! never blocks on external I/O: eligibility is pre-checked against a
//! committed snapshot, the gateway is consulted, and only then is the
//! definitive command submitted. A charge that wins at the gateway but loses
//! the state-machine race is compensated with a refund.

use crate::aggregates::{
    BookingAction, BookingEnvironment, BookingReducer, ChargeOutcome, EscalationAction,
    EscalationEnvironment, EscalationReducer,
};
use crate::guard::{self, Operation, Ownership};
use crate::payment_gateway::{PaymentGateway, PaymentGatewayError};
use crate::types::{
    Booking, BookingId, BookingState, BookingStatus, EscalationId, EscalationState,
    EscalationTicket, Identity, LifecycleError, Money, PropertyId,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wayfarer_runtime::{Store, StoreError};

/// Store type for the booking aggregate
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// Store type for the escalation aggregate
pub type EscalationStore =
    Store<EscalationState, EscalationAction, EscalationEnvironment, EscalationReducer>;

/// Broadcast capacity sized for bursts of concurrent requests
const ENGINE_BROADCAST_CAPACITY: usize = 256;

/// Errors surfaced by the engine facades
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The lifecycle rejected the command; carries the stable error kind
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The engine did not reply within the configured window
    #[error("the engine did not reply in time")]
    Timeout,

    /// The engine or one of its collaborators is unavailable
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::Timeout => Self::Timeout,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Parameters for creating a booking
#[derive(Clone, Debug)]
pub struct NewBooking {
    /// The property being booked
    pub property: PropertyId,
    /// Requested check-in date
    pub check_in: NaiveDate,
    /// Requested check-out date
    pub check_out: NaiveDate,
    /// Requested guest count
    pub guests: u32,
    /// Total amount for the stay
    pub amount: Money,
}

/// Facade over the booking store
#[derive(Clone)]
pub struct BookingEngine {
    store: BookingStore,
    gateway: Arc<dyn PaymentGateway>,
    reply_timeout: Duration,
}

impl BookingEngine {
    /// Creates a booking engine with an empty state
    #[must_use]
    pub fn new(
        environment: BookingEnvironment,
        gateway: Arc<dyn PaymentGateway>,
        reply_timeout: Duration,
    ) -> Self {
        let store = Store::with_broadcast_capacity(
            BookingState::new(),
            BookingReducer::new(),
            environment,
            ENGINE_BROADCAST_CAPACITY,
        );
        Self {
            store,
            gateway,
            reply_timeout,
        }
    }

    /// Create a new booking owned by the caller
    ///
    /// # Errors
    ///
    /// `Validation` for bad dates or guest counts, `PermissionDenied` for
    /// non-traveler callers.
    pub async fn create(
        &self,
        caller: Identity,
        request: NewBooking,
    ) -> Result<Booking, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            BookingAction::Create {
                correlation_id,
                booking_id: BookingId::new(),
                caller,
                property: request.property,
                check_in: request.check_in,
                check_out: request.check_out,
                guests: request.guests,
                amount: request.amount,
            },
        )
        .await
    }

    /// Confirm a pending booking
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless the caller is staff, `InvalidTransition`
    /// unless the booking is pending, `NotFound` for unknown ids.
    pub async fn confirm(
        &self,
        caller: Identity,
        booking_id: BookingId,
    ) -> Result<Booking, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            BookingAction::Confirm {
                correlation_id,
                booking_id,
                caller,
            },
        )
        .await
    }

    /// Pay for a confirmed booking
    ///
    /// Pre-checks eligibility from a committed snapshot, charges through the
    /// gateway, then submits the definitive command. The state flip and the
    /// voucher issuance commit atomically inside the reducer.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless the caller is the owning traveler,
    /// `InvalidTransition` unless the booking is confirmed and payable,
    /// `PaymentDeclined` when the gateway declines.
    pub async fn pay(
        &self,
        caller: Identity,
        booking_id: BookingId,
    ) -> Result<Booking, EngineError> {
        // Optimistic pre-check before any money moves. The reducer repeats
        // these checks definitively under the write lock.
        let snapshot = self.store.state(|s| s.get(&booking_id).cloned()).await;
        let Some(booking) = snapshot else {
            return Err(LifecycleError::booking_not_found(booking_id).into());
        };
        let ownership = if booking.is_owned_by(&caller.user_id) {
            Ownership::Owner
        } else {
            Ownership::NotOwner
        };
        guard::authorize(caller.role, Operation::PayBooking, ownership)
            .map_err(EngineError::Lifecycle)?;
        if booking.status != BookingStatus::Confirmed || !booking.payment.is_payable() {
            return Err(LifecycleError::InvalidTransition {
                entity: "booking",
                from: format!("{} with payment {}", booking.status, booking.payment),
                attempted: Operation::PayBooking.verb(),
            }
            .into());
        }

        let amount = booking.total_amount;
        let outcome = match self.gateway.charge(booking_id, amount).await {
            Ok(receipt) => ChargeOutcome::Approved {
                transaction_id: receipt.transaction_id,
            },
            Err(PaymentGatewayError::Declined { reason }) => ChargeOutcome::Declined { reason },
            Err(PaymentGatewayError::Unavailable { message }) => {
                return Err(EngineError::Unavailable(message));
            },
        };

        let captured_txn = match &outcome {
            ChargeOutcome::Approved { transaction_id } => Some(transaction_id.clone()),
            ChargeOutcome::Declined { .. } => None,
        };

        let correlation_id = Uuid::new_v4();
        let result = self
            .submit(
                correlation_id,
                BookingAction::Pay {
                    correlation_id,
                    booking_id,
                    caller,
                    outcome,
                },
            )
            .await;

        // The charge was captured but the lifecycle rejected it (a racing
        // cancel or pay won): return the money.
        if let (Err(EngineError::Lifecycle(_)), Some(transaction_id)) = (&result, captured_txn) {
            if let Err(error) = self.gateway.refund(&transaction_id, amount).await {
                tracing::error!(
                    booking_id = %booking_id,
                    transaction_id = %transaction_id,
                    %error,
                    "failed to compensate a charge that lost the state-machine race"
                );
            }
        }

        result
    }

    /// Cancel a booking
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless owner or staff, `InvalidTransition` from a
    /// terminal or paid state.
    pub async fn cancel(
        &self,
        caller: Identity,
        booking_id: BookingId,
    ) -> Result<Booking, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            BookingAction::Cancel {
                correlation_id,
                booking_id,
                caller,
            },
        )
        .await
    }

    /// Refund a paid booking and cancel it
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless the caller is an admin, `InvalidTransition`
    /// unless the booking is confirmed and paid.
    pub async fn refund(
        &self,
        caller: Identity,
        booking_id: BookingId,
    ) -> Result<Booking, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            BookingAction::Refund {
                correlation_id,
                booking_id,
                caller,
            },
        )
        .await
    }

    /// System-internal post-stay transition (`Confirmed → Completed`)
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the booking is confirmed.
    pub async fn complete(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            BookingAction::Complete {
                correlation_id,
                booking_id,
            },
        )
        .await
    }

    /// Read a value derived from the committed booking state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&BookingState) -> T,
    {
        self.store.state(f).await
    }

    /// Stop accepting commands
    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    async fn submit(
        &self,
        correlation_id: Uuid,
        action: BookingAction,
    ) -> Result<Booking, EngineError> {
        let reply = self
            .store
            .send_and_wait_for(
                action,
                move |a| match a {
                    BookingAction::Accepted {
                        correlation_id: c, ..
                    }
                    | BookingAction::Rejected {
                        correlation_id: c, ..
                    } => *c == correlation_id,
                    _ => false,
                },
                self.reply_timeout,
            )
            .await
            .map_err(EngineError::from_store)?;

        match reply {
            BookingAction::Accepted { booking, .. } => Ok(*booking),
            BookingAction::Rejected { error, .. } => Err(EngineError::Lifecycle(error)),
            // The predicate only matches the two reply variants
            _ => Err(EngineError::Unavailable(
                "unexpected reply from booking store".to_string(),
            )),
        }
    }
}

/// Facade over the escalation store
#[derive(Clone)]
pub struct EscalationEngine {
    store: EscalationStore,
    reply_timeout: Duration,
}

impl EscalationEngine {
    /// Creates an escalation engine with an empty state
    #[must_use]
    pub fn new(environment: EscalationEnvironment, reply_timeout: Duration) -> Self {
        let store = Store::with_broadcast_capacity(
            EscalationState::new(),
            EscalationReducer::new(),
            environment,
            ENGINE_BROADCAST_CAPACITY,
        );
        Self {
            store,
            reply_timeout,
        }
    }

    /// File a ticket for a message the agent could not resolve
    ///
    /// # Errors
    ///
    /// `Validation` when the content is empty.
    pub async fn open(
        &self,
        caller: Identity,
        content: String,
    ) -> Result<EscalationTicket, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            EscalationAction::Open {
                correlation_id,
                ticket_id: EscalationId::new(),
                caller,
                content,
            },
        )
        .await
    }

    /// Answer a pending ticket
    ///
    /// # Errors
    ///
    /// `PermissionDenied` unless the caller is an admin, `Validation` for an
    /// empty response, `InvalidTransition` when the ticket is already
    /// resolved.
    pub async fn respond(
        &self,
        caller: Identity,
        ticket_id: EscalationId,
        response: String,
    ) -> Result<EscalationTicket, EngineError> {
        let correlation_id = Uuid::new_v4();
        self.submit(
            correlation_id,
            EscalationAction::Respond {
                correlation_id,
                ticket_id,
                caller,
                response,
            },
        )
        .await
    }

    /// Read a value derived from the committed escalation state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&EscalationState) -> T,
    {
        self.store.state(f).await
    }

    /// Stop accepting commands
    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    async fn submit(
        &self,
        correlation_id: Uuid,
        action: EscalationAction,
    ) -> Result<EscalationTicket, EngineError> {
        let reply = self
            .store
            .send_and_wait_for(
                action,
                move |a| match a {
                    EscalationAction::Accepted {
                        correlation_id: c, ..
                    }
                    | EscalationAction::Rejected {
                        correlation_id: c, ..
                    } => *c == correlation_id,
                    _ => false,
                },
                self.reply_timeout,
            )
            .await
            .map_err(EngineError::from_store)?;

        match reply {
            EscalationAction::Accepted { ticket, .. } => Ok(*ticket),
            EscalationAction::Rejected { error, .. } => Err(EngineError::Lifecycle(error)),
            _ => Err(EngineError::Unavailable(
                "unexpected reply from escalation store".to_string(),
            )),
        }
    }
}

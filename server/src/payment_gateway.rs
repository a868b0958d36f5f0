//! Payment gateway port.
//!
//! Abstraction over payment processors. The lifecycle contract deliberately
//! leaves gateway integration details out of scope, so the production binary
//! ships with the mock gateway; the port is what the `Pay` operation is
//! written against.

use crate::types::{BookingId, Money};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentGatewayError {
    /// The processor declined the charge
    #[error("charge declined: {reason}")]
    Declined {
        /// Decline reason
        reason: String,
    },
    /// The processor could not be reached
    #[error("payment gateway unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },
}

/// Receipt for a captured charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
}

/// Payment gateway trait
///
/// Both operations are async and may fail; neither is invoked while the
/// booking store's write lock is held.
pub trait PaymentGateway: Send + Sync {
    /// Charge the caller for a booking
    ///
    /// # Errors
    ///
    /// Returns an error if the charge is declined or the gateway is
    /// unreachable.
    fn charge(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ChargeReceipt>> + Send>>;

    /// Return a captured charge
    ///
    /// Used both for the explicit refund operation and as compensation when
    /// a charge wins at the gateway but loses the state-machine race.
    ///
    /// # Errors
    ///
    /// Returns an error if the refund fails.
    fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>>;
}

/// Mock payment gateway (always approves)
#[derive(Clone, Copy, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn charge(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ChargeReceipt>> + Send>> {
        Box::pin(async move {
            let transaction_id = format!("mock_txn_{}", uuid::Uuid::new_v4());

            tracing::info!(
                booking_id = %booking_id,
                amount = amount.cents(),
                transaction_id = %transaction_id,
                "mock charge approved"
            );

            Ok(ChargeReceipt {
                transaction_id,
                amount,
            })
        })
    }

    fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        let transaction_id = transaction_id.to_string();
        Box::pin(async move {
            let refund_id = format!("mock_refund_{}", uuid::Uuid::new_v4());

            tracing::info!(
                transaction_id = %transaction_id,
                amount = amount.cents(),
                refund_id = %refund_id,
                "mock refund processed"
            );

            Ok(refund_id)
        })
    }
}

/// Gateway that declines every charge, for exercising the failure path
#[derive(Clone, Debug)]
pub struct DecliningPaymentGateway {
    reason: String,
}

impl DecliningPaymentGateway {
    /// Creates a gateway that declines with the given reason
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(reason: impl Into<String>) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(reason))
    }
}

impl PaymentGateway for DecliningPaymentGateway {
    fn charge(
        &self,
        _booking_id: BookingId,
        _amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ChargeReceipt>> + Send>> {
        let reason = self.reason.clone();
        Box::pin(async move { Err(PaymentGatewayError::Declined { reason }) })
    }

    fn refund(
        &self,
        _transaction_id: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        Box::pin(async move {
            let _ = amount;
            Err(PaymentGatewayError::Unavailable {
                message: "declining gateway does not hold funds".to_string(),
            })
        })
    }
}

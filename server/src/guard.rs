//! Identity & role guard.
//!
//! Stateless policy evaluation over `(role, operation, ownership)` triples,
//! consulted by both lifecycle reducers before any state mutation and by the
//! read-side queries that are role-gated. The whole permission matrix lives
//! in [`authorize`]; no caller re-implements any part of it.

use crate::types::{LifecycleError, Role};

/// The operations the guard knows how to authorize
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create a booking (travelers book for themselves)
    CreateBooking,
    /// Confirm a pending booking (staff)
    ConfirmBooking,
    /// Pay for a confirmed booking (owning traveler)
    PayBooking,
    /// Cancel a booking (owner or staff)
    CancelBooking,
    /// Refund a paid booking (admin)
    RefundBooking,
    /// Post-stay completion; system-internal, never caller-invoked
    CompleteBooking,
    /// View a single booking (owner or staff)
    ViewBooking,
    /// File an escalation ticket (any authenticated user)
    OpenEscalation,
    /// Answer an escalation ticket (admin)
    RespondEscalation,
    /// Read the escalation queue (admin)
    ListEscalations,
}

impl Operation {
    /// Short verb used in error messages and transition logging
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::CreateBooking => "create",
            Self::ConfirmBooking => "confirm",
            Self::PayBooking => "pay",
            Self::CancelBooking => "cancel",
            Self::RefundBooking => "refund",
            Self::CompleteBooking => "complete",
            Self::ViewBooking => "view",
            Self::OpenEscalation => "open",
            Self::RespondEscalation => "respond to",
            Self::ListEscalations => "list",
        }
    }
}

/// The caller's relationship to the entity being operated on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// The caller owns the entity
    Owner,
    /// The caller does not own the entity
    NotOwner,
    /// Ownership does not apply to this operation
    NotApplicable,
}

/// Authorize an operation for a role and ownership relationship
///
/// Pure and stateless: the same triple always evaluates the same way,
/// regardless of which interface (HTTP, internal call, batch job) asks.
///
/// # Errors
///
/// Returns [`LifecycleError::PermissionDenied`] when the matrix rejects the
/// triple.
pub fn authorize(
    role: Role,
    operation: Operation,
    ownership: Ownership,
) -> Result<(), LifecycleError> {
    let allowed = match operation {
        Operation::CreateBooking => role == Role::Traveler,
        Operation::ConfirmBooking => role.is_staff(),
        Operation::PayBooking => role == Role::Traveler && ownership == Ownership::Owner,
        Operation::CancelBooking | Operation::ViewBooking => {
            ownership == Ownership::Owner || role.is_staff()
        },
        Operation::RefundBooking | Operation::RespondEscalation | Operation::ListEscalations => {
            role == Role::Admin
        },
        Operation::OpenEscalation => true,
        // The system invokes completion directly; no caller may request it
        Operation::CompleteBooking => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::PermissionDenied(format!(
            "role {role} may not {} this {}",
            operation.verb(),
            entity_of(operation),
        )))
    }
}

const fn entity_of(operation: Operation) -> &'static str {
    match operation {
        Operation::OpenEscalation
        | Operation::RespondEscalation
        | Operation::ListEscalations => "escalation",
        _ => "booking",
    }
}

//! Read-side views over committed lifecycle state.
//!
//! Each view is a pure function of an aggregate snapshot: no transitions, no
//! mutation, standard read-after-write consistency. Visibility follows the
//! role matrix - travelers see their own bookings, staff see all, and the
//! escalation queue is admin-only.

use crate::guard::{self, Operation, Ownership};
use crate::types::{
    Booking, BookingId, BookingState, BookingStatus, EscalationState, EscalationStatus,
    EscalationTicket, Identity, LifecycleError,
};
use serde::Serialize;

/// All bookings visible to the caller, newest first
///
/// Travelers see the bookings they own; staff roles see every booking.
#[must_use]
pub fn visible_bookings(state: &BookingState, identity: &Identity) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .values()
        .filter(|booking| identity.role.is_staff() || booking.is_owned_by(&identity.user_id))
        .cloned()
        .collect();
    bookings.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });
    bookings
}

/// A single booking, with the same visibility rule as the list view
///
/// # Errors
///
/// `NotFound` for unknown ids; `PermissionDenied` when a traveler asks for a
/// booking they do not own.
pub fn booking_for(
    state: &BookingState,
    identity: &Identity,
    booking_id: BookingId,
) -> Result<Booking, LifecycleError> {
    let Some(booking) = state.get(&booking_id) else {
        return Err(LifecycleError::booking_not_found(booking_id));
    };
    let ownership = if booking.is_owned_by(&identity.user_id) {
        Ownership::Owner
    } else {
        Ownership::NotOwner
    };
    guard::authorize(identity.role, Operation::ViewBooking, ownership)?;
    Ok(booking.clone())
}

/// The admin-wide escalation queue: pending tickets first, newest first
/// within each group
///
/// Ordering is a presentation concern; the lifecycle itself orders nothing.
///
/// # Errors
///
/// `PermissionDenied` unless the caller is an admin.
pub fn escalation_queue(
    state: &EscalationState,
    identity: &Identity,
) -> Result<Vec<EscalationTicket>, LifecycleError> {
    guard::authorize(identity.role, Operation::ListEscalations, Ownership::NotApplicable)?;

    let mut tickets: Vec<EscalationTicket> = state.tickets.values().cloned().collect();
    tickets.sort_by(|a, b| {
        let rank = |status: EscalationStatus| match status {
            EscalationStatus::Pending => 0,
            EscalationStatus::Resolved => 1,
        };
        rank(a.status)
            .cmp(&rank(b.status))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });
    Ok(tickets)
}

/// Booking counts by status over the caller's visible set
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Total visible bookings
    pub total: usize,
    /// Bookings awaiting confirmation
    pub pending: usize,
    /// Confirmed bookings
    pub confirmed: usize,
    /// Completed stays
    pub completed: usize,
    /// Cancelled bookings
    pub cancelled: usize,
    /// Open escalation tickets; present for admins only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_escalations: Option<usize>,
}

/// Dashboard aggregate for the caller's visible set
#[must_use]
pub fn dashboard(
    booking_state: &BookingState,
    escalation_state: &EscalationState,
    identity: &Identity,
) -> DashboardSummary {
    let visible = visible_bookings(booking_state, identity);
    let count_of = |status: BookingStatus| {
        visible
            .iter()
            .filter(|booking| booking.status == status)
            .count()
    };

    let pending_escalations = guard::authorize(
        identity.role,
        Operation::ListEscalations,
        Ownership::NotApplicable,
    )
    .ok()
    .map(|()| {
        escalation_state
            .tickets
            .values()
            .filter(|ticket| ticket.status == EscalationStatus::Pending)
            .count()
    });

    DashboardSummary {
        total: visible.len(),
        pending: count_of(BookingStatus::Pending),
        confirmed: count_of(BookingStatus::Confirmed),
        completed: count_of(BookingStatus::Completed),
        cancelled: count_of(BookingStatus::Cancelled),
        pending_escalations,
    }
}

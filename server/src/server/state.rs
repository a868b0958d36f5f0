//! Application state for the Wayfarer HTTP server.

use crate::auth::provider::IdentityProvider;
use crate::engines::{BookingEngine, EscalationEngine};
use std::sync::Arc;

/// Shared resources for HTTP handlers.
///
/// Cloned cheaply for each request: the engines clone their underlying store
/// handles, and the identity provider is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Booking lifecycle engine (write side) and snapshot access (read side)
    pub booking_engine: BookingEngine,

    /// Escalation lifecycle engine
    pub escalation_engine: EscalationEngine,

    /// Resolves bearer tokens to `(user id, role)` pairs
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        booking_engine: BookingEngine,
        escalation_engine: EscalationEngine,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            booking_engine,
            escalation_engine,
            identity_provider,
        }
    }
}

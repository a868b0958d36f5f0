//! Escalation aggregate reducer.
//!
//! Owns the ticket state machine: `Pending → Resolved`, resolved exactly
//! once by an admin response. Structurally the same shape as the booking
//! reducer, over independent data.

use crate::guard::{self, Operation, Ownership};
use crate::types::{EscalationId, EscalationState, EscalationStatus, EscalationTicket, Identity, LifecycleError};
use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::environment::Clock;
use wayfarer_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Environment dependencies for the escalation reducer
#[derive(Clone)]
pub struct EscalationEnvironment {
    /// Clock for open/resolve timestamps
    pub clock: Arc<dyn Clock>,
}

impl EscalationEnvironment {
    /// Creates a new `EscalationEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

/// All inputs to the escalation reducer: commands and their replies
#[derive(Clone, Debug)]
pub enum EscalationAction {
    // ========== Commands ==========
    /// File a ticket for a message the agent could not resolve
    Open {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// Pre-generated ticket id (shared with the message id space)
        ticket_id: EscalationId,
        /// The caller on whose behalf the ticket is filed
        caller: Identity,
        /// The unresolved user text
        content: String,
    },
    /// Answer a pending ticket (admin)
    Respond {
        /// Correlates the command with its reply
        correlation_id: Uuid,
        /// The ticket being answered
        ticket_id: EscalationId,
        /// The caller
        caller: Identity,
        /// The admin's answer
        response: String,
    },

    // ========== Replies ==========
    /// The command was applied; carries the post-transition ticket
    Accepted {
        /// Correlation id of the originating command
        correlation_id: Uuid,
        /// The ticket after the transition
        ticket: Box<EscalationTicket>,
    },
    /// The command was rejected; carries the exact error kind
    Rejected {
        /// Correlation id of the originating command
        correlation_id: Uuid,
        /// Why the command was rejected
        error: LifecycleError,
    },
}

/// Reducer for the escalation aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct EscalationReducer;

impl EscalationReducer {
    /// Creates a new `EscalationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn handle_open(
        state: &mut EscalationState,
        env: &EscalationEnvironment,
        ticket_id: EscalationId,
        caller: Identity,
        content: String,
    ) -> Result<EscalationTicket, LifecycleError> {
        guard::authorize(caller.role, Operation::OpenEscalation, Ownership::NotApplicable)?;

        if content.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "escalation content must not be empty".to_string(),
            ));
        }
        if state.tickets.contains_key(&ticket_id) {
            return Err(LifecycleError::Validation(format!(
                "escalation ticket {ticket_id} already exists"
            )));
        }

        let ticket = EscalationTicket::new(ticket_id, caller.user_id, content, env.clock.now());
        state.tickets.insert(ticket_id, ticket.clone());
        Ok(ticket)
    }

    fn handle_respond(
        state: &mut EscalationState,
        env: &EscalationEnvironment,
        ticket_id: EscalationId,
        caller: Identity,
        response: String,
    ) -> Result<EscalationTicket, LifecycleError> {
        let Some(ticket) = state.tickets.get_mut(&ticket_id) else {
            return Err(LifecycleError::escalation_not_found(ticket_id));
        };

        guard::authorize(caller.role, Operation::RespondEscalation, Ownership::NotApplicable)?;

        if response.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "escalation response must not be empty".to_string(),
            ));
        }

        // Tickets resolve exactly once; a follow-up becomes a new ticket
        if ticket.status != EscalationStatus::Pending {
            return Err(LifecycleError::InvalidTransition {
                entity: "escalation",
                from: ticket.status.to_string(),
                attempted: Operation::RespondEscalation.verb(),
            });
        }

        ticket.status = EscalationStatus::Resolved;
        ticket.admin_response = Some(response);
        ticket.resolved_at = Some(env.clock.now());
        Ok(ticket.clone())
    }

    fn reply(
        correlation_id: Uuid,
        result: Result<EscalationTicket, LifecycleError>,
        operation: &'static str,
    ) -> SmallVec<[Effect<EscalationAction>; 4]> {
        let action = match result {
            Ok(ticket) => {
                tracing::info!(
                    ticket_id = %ticket.id,
                    status = %ticket.status,
                    operation,
                    "escalation transition applied"
                );
                EscalationAction::Accepted {
                    correlation_id,
                    ticket: Box::new(ticket),
                }
            },
            Err(error) => {
                tracing::warn!(%error, operation, "escalation command rejected");
                EscalationAction::Rejected {
                    correlation_id,
                    error,
                }
            },
        };
        smallvec![Effect::reply(action)]
    }
}

impl Reducer for EscalationReducer {
    type State = EscalationState;
    type Action = EscalationAction;
    type Environment = EscalationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            EscalationAction::Open {
                correlation_id,
                ticket_id,
                caller,
                content,
            } => {
                let result = Self::handle_open(state, env, ticket_id, caller, content);
                Self::reply(correlation_id, result, "open")
            },
            EscalationAction::Respond {
                correlation_id,
                ticket_id,
                caller,
                response,
            } => {
                let result = Self::handle_respond(state, env, ticket_id, caller, response);
                Self::reply(correlation_id, result, "respond")
            },

            EscalationAction::Accepted { .. } | EscalationAction::Rejected { .. } => {
                SmallVec::new()
            },
        }
    }
}

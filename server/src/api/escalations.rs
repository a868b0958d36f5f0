//! Escalation API endpoints.
//!
//! - `POST /api/escalations` - file a ticket (the agent collaborator calls
//!   this on behalf of the user whose message it could not resolve)
//! - `GET /api/escalations` - the admin queue, pending first
//! - `POST /api/escalations/:id/respond` - answer a ticket (admin, once)

use crate::auth::middleware::{CurrentUser, RequireAdmin};
use crate::queries;
use crate::server::state::AppState;
use crate::types::{EscalationId, EscalationStatus, EscalationTicket};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfarer_web::error::AppError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to file an escalation ticket.
#[derive(Debug, Deserialize)]
pub struct OpenEscalationRequest {
    /// The unresolved user text
    pub content: String,
}

/// Request to answer an escalation ticket.
#[derive(Debug, Deserialize)]
pub struct RespondEscalationRequest {
    /// The admin's answer
    pub response: String,
}

/// An escalation ticket as returned by the API.
#[derive(Debug, Serialize)]
pub struct EscalationResponse {
    /// Ticket ID
    pub id: Uuid,
    /// The user whose message was escalated
    pub user_id: Uuid,
    /// The unresolved user text
    pub content: String,
    /// Ticket status
    pub status: EscalationStatus,
    /// The admin's answer, once resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
    /// When the ticket was opened
    pub created_at: DateTime<Utc>,
    /// When the ticket was resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<EscalationTicket> for EscalationResponse {
    fn from(ticket: EscalationTicket) -> Self {
        Self {
            id: *ticket.id.as_uuid(),
            user_id: *ticket.user.as_uuid(),
            content: ticket.content,
            status: ticket.status,
            admin_response: ticket.admin_response,
            created_at: ticket.created_at,
            resolved_at: ticket.resolved_at,
        }
    }
}

/// Response for the escalation queue view.
#[derive(Debug, Serialize)]
pub struct ListEscalationsResponse {
    /// Tickets, pending first, newest first within each group
    pub escalations: Vec<EscalationResponse>,
    /// Total count (pending and resolved)
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// File an escalation ticket.
///
/// Any authenticated caller; the ticket is attributed to the caller's user.
///
/// # Errors
///
/// 422 for empty content.
pub async fn open_escalation(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<OpenEscalationRequest>,
) -> Result<(StatusCode, Json<EscalationResponse>), AppError> {
    let ticket = state
        .escalation_engine
        .open(user.identity, request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket.into())))
}

/// List the escalation queue.
///
/// Admin only. Pending tickets first so the queue reads as a worklist.
pub async fn list_escalations(
    admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ListEscalationsResponse>, AppError> {
    let tickets = state
        .escalation_engine
        .state(|s| queries::escalation_queue(s, &admin.identity))
        .await?;

    let escalations: Vec<EscalationResponse> = tickets.into_iter().map(Into::into).collect();
    let total = escalations.len();
    Ok(Json(ListEscalationsResponse { escalations, total }))
}

/// Answer an escalation ticket.
///
/// Admin only; a ticket resolves exactly once. A second answer is a 409 -
/// a further traveler reply belongs on a new ticket.
///
/// # Errors
///
/// 403 for non-admins, 422 for an empty response, 409 when already resolved,
/// 404 for unknown ids.
pub async fn respond_escalation(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<RespondEscalationRequest>,
) -> Result<Json<EscalationResponse>, AppError> {
    let ticket = state
        .escalation_engine
        .respond(
            admin.identity,
            EscalationId::from_uuid(ticket_id),
            request.response,
        )
        .await?;
    Ok(Json(ticket.into()))
}

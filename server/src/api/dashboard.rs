//! Dashboard API endpoint.
//!
//! `GET /api/dashboard` - booking counts by status over the caller's visible
//! set; admins additionally get the open-escalation count.

use crate::auth::middleware::CurrentUser;
use crate::queries::{self, DashboardSummary};
use crate::server::state::AppState;
use axum::{Json, extract::State};
use wayfarer_web::error::AppError;

/// Dashboard aggregate for the caller.
pub async fn get_dashboard(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, AppError> {
    let bookings = state.booking_engine.state(Clone::clone).await;
    let escalations = state.escalation_engine.state(Clone::clone).await;
    let summary = queries::dashboard(&bookings, &escalations, &user.identity);
    Ok(Json(summary))
}

//! Router configuration for the Wayfarer server.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{bookings, dashboard, escalations};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wayfarer_web::middleware::correlation_id_layer;

/// Build the complete Axum router.
///
/// - Health checks (unauthenticated)
/// - Booking lifecycle endpoints under `/api/bookings`
/// - Escalation endpoints under `/api/escalations`
/// - Dashboard aggregate under `/api/dashboard`
///
/// Every request gets a correlation id span; responses echo the id back in
/// the `X-Correlation-ID` header.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Booking lifecycle
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/confirm", post(bookings::confirm_booking))
        .route("/bookings/:id/pay", post(bookings::pay_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/refund", post(bookings::refund_booking))
        // Escalations
        .route("/escalations", post(escalations::open_escalation))
        .route("/escalations", get(escalations::list_escalations))
        .route(
            "/escalations/:id/respond",
            post(escalations::respond_escalation),
        )
        // Dashboard aggregate (CQRS read side)
        .route("/dashboard", get(dashboard::get_dashboard));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

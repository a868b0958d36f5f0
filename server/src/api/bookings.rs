//! Booking management API endpoints.
//!
//! - `POST /api/bookings` - create a booking (traveler)
//! - `GET /api/bookings` - list bookings visible to the caller
//! - `GET /api/bookings/:id` - single booking (owner or staff)
//! - `POST /api/bookings/:id/confirm` - confirm (staff)
//! - `POST /api/bookings/:id/pay` - pay, returns the voucher (owner)
//! - `POST /api/bookings/:id/cancel` - cancel (owner or staff, not once paid)
//! - `POST /api/bookings/:id/refund` - refund and cancel (admin)
//!
//! # State Machine
//!
//! ```text
//! status:   Pending → Confirmed → Completed
//!               ↓         ↓
//!              Cancelled (also via refund)
//!
//! payment:  Pending → Paid → Refunded
//!               ↓  ↑
//!              Failed (retryable)
//! ```

use crate::auth::middleware::{CurrentUser, RequireAdmin, RequireStaff};
use crate::engines::NewBooking;
use crate::queries;
use crate::server::state::AppState;
use crate::types::{Booking, BookingId, BookingStatus, Money, PaymentStatus, PropertyId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfarer_web::error::AppError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a new booking.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Property to book
    pub property_id: Uuid,
    /// Check-in date (ISO 8601 date)
    pub check_in: NaiveDate,
    /// Check-out date (ISO 8601 date)
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests: u32,
    /// Total amount in cents
    pub amount_cents: u64,
}

/// A booking as returned by the API.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking ID
    pub id: Uuid,
    /// Owning traveler
    pub traveler_id: Uuid,
    /// Booked property
    pub property_id: Uuid,
    /// Check-in date
    pub check_in: NaiveDate,
    /// Check-out date
    pub check_out: NaiveDate,
    /// Number of nights
    pub nights: i64,
    /// Number of guests
    pub guests: u32,
    /// Total amount in cents
    pub amount_cents: u64,
    /// Booking lifecycle status
    pub status: BookingStatus,
    /// Payment sub-state
    pub payment_status: String,
    /// Decline reason when the last payment attempt failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_failure_reason: Option<String>,
    /// Proof-of-payment voucher; present once paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the booking last transitioned
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        let payment_failure_reason = match &booking.payment {
            PaymentStatus::Failed { reason } => Some(reason.clone()),
            _ => None,
        };
        Self {
            id: *booking.id.as_uuid(),
            traveler_id: *booking.traveler.as_uuid(),
            property_id: *booking.property.as_uuid(),
            check_in: booking.dates.check_in(),
            check_out: booking.dates.check_out(),
            nights: booking.dates.nights(),
            guests: booking.guests.value(),
            amount_cents: booking.total_amount.cents(),
            status: booking.status,
            payment_status: booking.payment.to_string(),
            payment_failure_reason,
            voucher_code: booking.voucher.map(|v| v.as_str().to_string()),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Response for the booking list view.
#[derive(Debug, Serialize)]
pub struct ListBookingsResponse {
    /// Bookings visible to the caller, newest first
    pub bookings: Vec<BookingResponse>,
    /// Total count
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new booking.
///
/// Requires a traveler; the caller becomes the owner. The booking starts in
/// `(pending, payment pending)` and waits for staff confirmation.
///
/// # Errors
///
/// 422 for invalid dates or guest counts, 403 for staff callers.
pub async fn create_booking(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .booking_engine
        .create(
            user.identity,
            NewBooking {
                property: PropertyId::from_uuid(request.property_id),
                check_in: request.check_in,
                check_out: request.check_out,
                guests: request.guests,
                amount: Money::from_cents(request.amount_cents),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// List bookings visible to the caller.
///
/// Travelers see their own bookings; staff see all. Newest first.
pub async fn list_bookings(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ListBookingsResponse>, AppError> {
    let bookings = state
        .booking_engine
        .state(|s| queries::visible_bookings(s, &user.identity))
        .await;

    let bookings: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
    let total = bookings.len();
    Ok(Json(ListBookingsResponse { bookings, total }))
}

/// Get a single booking.
///
/// # Errors
///
/// 404 for unknown ids, 403 when a traveler asks for a booking they do not
/// own.
pub async fn get_booking(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .booking_engine
        .state(|s| queries::booking_for(s, &user.identity, BookingId::from_uuid(booking_id)))
        .await?;
    Ok(Json(booking.into()))
}

/// Confirm a pending booking.
///
/// Staff only. A second confirm on the same booking is a 409: the lifecycle
/// is append-only and callers must re-fetch before retrying.
///
/// # Errors
///
/// 403 for travelers, 409 unless the booking is pending, 404 for unknown ids.
pub async fn confirm_booking(
    staff: RequireStaff,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .booking_engine
        .confirm(staff.identity, BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking.into()))
}

/// Pay for a confirmed booking.
///
/// Owning traveler only. On success the response carries the voucher code,
/// issued at the moment payment succeeded.
///
/// # Errors
///
/// 403 unless the caller owns the booking, 409 unless the booking is
/// confirmed and not yet paid, 402 when the gateway declines.
pub async fn pay_booking(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .booking_engine
        .pay(user.identity, BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking.into()))
}

/// Cancel a booking.
///
/// Owner or staff. Paid bookings cannot be cancelled directly - money has to
/// be reconciled through the refund operation.
///
/// # Errors
///
/// 403 for non-owner travelers, 409 from terminal or paid states.
pub async fn cancel_booking(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .booking_engine
        .cancel(user.identity, BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking.into()))
}

/// Refund a paid booking and cancel it.
///
/// Admin only. Voids the voucher; the code is never reissued.
///
/// # Errors
///
/// 403 for non-admins, 409 unless the booking is confirmed and paid.
pub async fn refund_booking(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .booking_engine
        .refund(admin.identity, BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking.into()))
}

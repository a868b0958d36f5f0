//! Domain types for the Wayfarer booking platform.
//!
//! This module contains the value objects, entities, and aggregate state
//! types for the booking and escalation lifecycles, plus the error taxonomy
//! shared by both engines.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an escalation ticket
///
/// Tickets share the identifier space of conversation messages: the agent
/// flags an existing message, and the flagged message id becomes the ticket
/// id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscalationId(Uuid);

impl EscalationId {
    /// Creates a new random `EscalationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EscalationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EscalationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EscalationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(Uuid);

impl PropertyId {
    /// Creates a new random `PropertyId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PropertyId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use `checked_from_dollars` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match Self::checked_from_dollars(dollars) {
            Some(money) => money,
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Stay Dates and Guest Count
// ============================================================================

/// A validated check-in/check-out date range
///
/// Constructed only through [`StayDates::new`], which enforces that check-in
/// precedes check-out and that the stay does not start in the past.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    /// Validates and creates a date range
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] when check-out is not after
    /// check-in, or when check-in is before `today`.
    pub fn new(
        check_in: NaiveDate,
        check_out: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, LifecycleError> {
        if check_in >= check_out {
            return Err(LifecycleError::Validation(
                "check-out date must be after check-in date".to_string(),
            ));
        }
        if check_in < today {
            return Err(LifecycleError::Validation(
                "check-in date must not be in the past".to_string(),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Returns the check-in date
    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Returns the check-out date
    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights between check-in and check-out
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

impl fmt::Display for StayDates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.check_in, self.check_out)
    }
}

/// A validated guest count (at least one guest)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuestCount(u32);

impl GuestCount {
    /// Validates and creates a guest count
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] when the count is zero.
    pub fn new(guests: u32) -> Result<Self, LifecycleError> {
        if guests < 1 {
            return Err(LifecycleError::Validation(
                "guest count must be at least 1".to_string(),
            ));
        }
        Ok(Self(guests))
    }

    /// Returns the guest count
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GuestCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Voucher Code
// ============================================================================

/// An opaque proof-of-payment token
///
/// Issued exactly once, at the moment a booking's payment succeeds. Codes are
/// random (never derivable from the booking id) and unique across all
/// bookings ever paid; the booking aggregate keeps the issued set to enforce
/// uniqueness.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Wraps an already-generated code
    #[must_use]
    pub const fn new(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Roles and Identity
// ============================================================================

/// Caller role, determining which lifecycle transitions may be invoked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A customer booking stays for themselves
    Traveler,
    /// Property-side sales staff
    PropertySales,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Whether this role is a staff role (`PropertySales` or `Admin`)
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::PropertySales | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traveler => write!(f, "traveler"),
            Self::PropertySales => write!(f, "property_sales"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traveler" => Ok(Self::Traveler),
            "property_sales" => Ok(Self::PropertySales),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authorization context supplied with every call
///
/// Resolved from a bearer credential by the identity provider collaborator;
/// the core never manages credentials, it only consumes `(user id, role)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The calling user
    pub user_id: UserId,
    /// The caller's role
    pub role: Role,
}

impl Identity {
    /// Creates an identity
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

// ============================================================================
// Booking
// ============================================================================

/// Booking lifecycle status
///
/// `Pending → Confirmed → Completed`, with `Cancelled` reachable from
/// `Pending` or `Confirmed`. `Cancelled` and `Completed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting staff confirmation
    Pending,
    /// Confirmed by staff, awaiting payment or completion
    Confirmed,
    /// Stay finished (system transition)
    Completed,
    /// Cancelled by the traveler or staff
    Cancelled,
}

impl BookingStatus {
    /// Whether no further status transition is permitted
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Payment sub-state, tracked orthogonally to the booking status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No successful payment yet
    Pending,
    /// Payment captured; the booking carries a voucher
    Paid,
    /// The gateway declined the charge; `Pay` may be retried
    Failed {
        /// Decline reason reported by the gateway
        reason: String,
    },
    /// Payment returned through the explicit refund operation (terminal)
    Refunded,
}

impl PaymentStatus {
    /// Whether a `Pay` attempt is permitted from this sub-state
    #[must_use]
    pub const fn is_payable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed { .. })
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed { .. } => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// A reservation linking a traveler to a property for a date range
///
/// Bookings are never physically deleted - cancellation is a state, not a
/// removal. Mutation happens only through the booking reducer's transition
/// table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// The owning traveler
    pub traveler: UserId,
    /// The booked property
    pub property: PropertyId,
    /// Check-in/check-out dates
    pub dates: StayDates,
    /// Number of guests
    pub guests: GuestCount,
    /// Total amount for the stay
    pub total_amount: Money,
    /// Booking lifecycle status
    pub status: BookingStatus,
    /// Payment sub-state
    pub payment: PaymentStatus,
    /// Proof-of-payment token; present iff `payment` is `Paid`
    pub voucher: Option<VoucherCode>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the booking was last transitioned
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new booking in `(Pending, payment Pending)`
    #[must_use]
    pub const fn new(
        id: BookingId,
        traveler: UserId,
        property: PropertyId,
        dates: StayDates,
        guests: GuestCount,
        total_amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            traveler,
            property,
            dates,
            guests,
            total_amount,
            status: BookingStatus::Pending,
            payment: PaymentStatus::Pending,
            voucher: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Whether the given user owns this booking
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.traveler == *user_id
    }
}

// ============================================================================
// Escalation
// ============================================================================

/// Escalation ticket status: `Pending → Resolved` (terminal)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// Awaiting a staff response
    Pending,
    /// Answered by an admin; never reopened
    Resolved,
}

impl fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// A user message flagged for human resolution
///
/// Created when the conversational agent cannot handle a message. Mutated
/// exactly once, by an admin response; a follow-up on a resolved ticket is a
/// new ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationTicket {
    /// Unique ticket identifier (shared with the message id space)
    pub id: EscalationId,
    /// The user whose message was escalated
    pub user: UserId,
    /// The unresolved user text
    pub content: String,
    /// Ticket status
    pub status: EscalationStatus,
    /// The admin's answer; present iff `status` is `Resolved`
    pub admin_response: Option<String>,
    /// When the ticket was opened
    pub created_at: DateTime<Utc>,
    /// When the ticket was resolved
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscalationTicket {
    /// Creates a new pending ticket
    #[must_use]
    pub const fn new(
        id: EscalationId,
        user: UserId,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            content,
            status: EscalationStatus::Pending,
            admin_response: None,
            created_at,
            resolved_at: None,
        }
    }
}

// ============================================================================
// Aggregate States
// ============================================================================

/// State for the booking aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BookingState {
    /// All bookings indexed by ID
    pub bookings: HashMap<BookingId, Booking>,
    /// Every voucher code ever issued, kept to guarantee uniqueness
    pub issued_vouchers: HashSet<VoucherCode>,
}

impl BookingState {
    /// Creates a new empty `BookingState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a booking by ID
    #[must_use]
    pub fn get(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.get(id)
    }

    /// Checks if a booking exists
    #[must_use]
    pub fn exists(&self, id: &BookingId) -> bool {
        self.bookings.contains_key(id)
    }

    /// Returns the number of bookings
    #[must_use]
    pub fn count(&self) -> usize {
        self.bookings.len()
    }
}

/// State for the escalation aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EscalationState {
    /// All tickets indexed by ID
    pub tickets: HashMap<EscalationId, EscalationTicket>,
}

impl EscalationState {
    /// Creates a new empty `EscalationState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a ticket by ID
    #[must_use]
    pub fn get(&self, id: &EscalationId) -> Option<&EscalationTicket> {
        self.tickets.get(id)
    }

    /// Returns the number of tickets
    #[must_use]
    pub fn count(&self) -> usize {
        self.tickets.len()
    }
}

// ============================================================================
// Error Taxonomy
// ============================================================================

/// The stable error taxonomy shared by both lifecycle engines
///
/// Every kind is reported to callers distinctly - never collapsed into a
/// generic failure - so a client can decide whether to correct input, stop
/// retrying, re-fetch state, or give up. The engines never retry on their
/// own.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Malformed input; recoverable by the caller correcting it
    #[error("validation failed: {0}")]
    Validation(String),

    /// Role or ownership mismatch; never retried with the same identity
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The state machine rejected the requested move; callers must re-fetch
    /// current state before retrying
    #[error("invalid transition: cannot {attempted} a {entity} that is {from}")]
    InvalidTransition {
        /// Entity kind ("booking" or "escalation")
        entity: &'static str,
        /// The state that rejected the move
        from: String,
        /// The operation that was attempted
        attempted: &'static str,
    },

    /// Unknown entity id
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// The payment gateway declined the charge
    #[error("payment declined: {0}")]
    PaymentDeclined(String),
}

impl LifecycleError {
    /// Shorthand for a booking-not-found error
    #[must_use]
    pub fn booking_not_found(id: BookingId) -> Self {
        Self::NotFound {
            entity: "booking",
            id: id.to_string(),
        }
    }

    /// Shorthand for an escalation-not-found error
    #[must_use]
    pub fn escalation_not_found(id: EscalationId) -> Self {
        Self::NotFound {
            entity: "escalation",
            id: id.to_string(),
        }
    }
}

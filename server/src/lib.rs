//! Wayfarer - the booking and escalation lifecycle engine of a chat-driven
//! travel platform.
//!
//! The visible surface of the platform is a conversational client; this crate
//! is the part with engineering substance behind it: the authoritative state
//! machines that govern how a reservation moves from request to
//! paid/confirmed/cancelled/completed, how payment status is tracked
//! independently of booking status, and how customer messages the
//! conversational agent cannot resolve are escalated to and resolved by
//! human staff - all under role-based authorization.
//!
//! # Architecture
//!
//! ```text
//! Write Side (lifecycle engines):
//! ┌──────────────────┐   ┌──────────────────────┐
//! │     Booking      │   │      Escalation      │
//! │  (status + pay)  │   │   (ticket status)    │
//! └──────────────────┘   └──────────────────────┘
//!         │                         │
//!         └──────── Stores ─────────┘
//!                      │
//! Read Side (queries over committed snapshots):
//! ┌──────────────┐  ┌───────────────┐  ┌────────────┐
//! │   Booking    │  │  Escalation   │  │ Dashboard  │
//! │    lists     │  │     queue     │  │ aggregates │
//! └──────────────┘  └───────────────┘  └────────────┘
//! ```
//!
//! Every mutating request enters through the role guard, is validated against
//! the explicit transition table by the owning reducer, applies atomically
//! under the store's write serialization, and answers through a reply action.
//! Read-side views never mutate state.
//!
//! The chat UI, the conversational agent, catalog CRUD, and credential
//! issuance are external collaborators: the agent files escalation tickets
//! through the same HTTP boundary, and the identity provider resolves bearer
//! tokens to `(user id, role)` pairs before any engine is invoked.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod api;
pub mod auth;
pub mod config;
pub mod engines;
pub mod guard;
pub mod payment_gateway;
pub mod queries;
pub mod server;
pub mod types;
pub mod vouchers;

pub use aggregates::{BookingAction, BookingReducer, EscalationAction, EscalationReducer};
pub use config::Config;
pub use engines::{BookingEngine, EngineError, EscalationEngine};
pub use types::*;

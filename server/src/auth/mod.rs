//! Authentication for the HTTP boundary.
//!
//! Credential issuance (registration, login, token minting) belongs to an
//! external identity service; this module only consumes its output. The
//! [`provider::IdentityProvider`] port resolves a bearer token to an
//! [`crate::types::Identity`], and the extractors in [`middleware`] fail a
//! request with `401 UNAUTHENTICATED` before any engine is invoked when that
//! resolution fails.

pub mod middleware;
pub mod provider;

pub use middleware::{BearerToken, CurrentUser, RequireAdmin, RequireStaff};
pub use provider::{IdentityProvider, StaticIdentityProvider};

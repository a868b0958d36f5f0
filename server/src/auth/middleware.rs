//! Authentication extractors for the HTTP boundary.
//!
//! Provides Axum extractors layered on the identity provider:
//! - [`BearerToken`]: raw token from the `Authorization: Bearer <token>` header
//! - [`CurrentUser`]: token resolved to an [`Identity`]; 401 otherwise
//! - [`RequireStaff`] / [`RequireAdmin`]: role pre-checks for routes whose
//!   auth rule is purely role-shaped; 403 otherwise
//!
//! Ownership rules cannot be checked here - they need entity state - so the
//! reducers enforce them through the same guard matrix. The extractors only
//! fail fast on what is knowable before the engine is invoked.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wayfarer_server::auth::middleware::{CurrentUser, RequireAdmin};
//!
//! async fn list_bookings(
//!     user: CurrentUser,
//! ) -> Result<Json<BookingsResponse>, AppError> {
//!     // user.identity is guaranteed resolved
//! }
//!
//! async fn list_escalations(
//!     admin: RequireAdmin,
//! ) -> Result<Json<QueueResponse>, AppError> {
//!     // admin.identity.role is guaranteed Admin
//! }
//! ```

use crate::server::state::AppState;
use crate::types::{Identity, Role};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use wayfarer_web::{ClientIp, error::AppError};

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthenticated("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthenticated("Invalid authorization format. Expected 'Bearer <token>'")
        })?;

        if token.is_empty() {
            return Err(AppError::unauthenticated("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated caller.
///
/// Resolves the bearer token through the identity provider. Use this as a
/// handler parameter to require authentication; the request fails with
/// `401 UNAUTHENTICATED` before any engine is touched when resolution fails.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// The resolved authorization context
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;

        let Some(identity) = state.identity_provider.resolve(&bearer.0) else {
            let client_ip = ClientIp::from_request_parts(parts, state)
                .await
                .map(|ip| ip.0.to_string())
                .unwrap_or_default();
            tracing::warn!(client_ip = %client_ip, "rejected request with unknown bearer token");
            return Err(AppError::unauthenticated("Unknown or expired token"));
        };

        Ok(Self { identity })
    }
}

/// Require a staff role (`property_sales` or `admin`).
///
/// Returns `403 PERMISSION_DENIED` for authenticated non-staff callers.
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff {
    /// The resolved authorization context (guaranteed staff)
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.identity.role.is_staff() {
            return Err(AppError::permission_denied(
                "This operation requires a staff role",
            ));
        }
        Ok(Self {
            identity: user.identity,
        })
    }
}

/// Require the admin role.
///
/// Returns `403 PERMISSION_DENIED` for authenticated non-admin callers.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin {
    /// The resolved authorization context (guaranteed admin)
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.identity.role != Role::Admin {
            return Err(AppError::permission_denied(
                "This operation requires the admin role",
            ));
        }
        Ok(Self {
            identity: user.identity,
        })
    }
}

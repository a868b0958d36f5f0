//! HTTP API endpoints.
//!
//! Thin handlers over the engines and queries: extract, authenticate,
//! dispatch, map the result. The error mapping below is the single place
//! where the domain taxonomy meets HTTP status codes; every kind keeps its
//! own stable code so clients can branch on it.

pub mod bookings;
pub mod dashboard;
pub mod escalations;

use crate::engines::EngineError;
use crate::types::LifecycleError;
use wayfarer_web::AppError;

impl From<LifecycleError> for AppError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::Validation(message) => Self::validation(message),
            LifecycleError::PermissionDenied(message) => Self::permission_denied(message),
            LifecycleError::InvalidTransition { .. } => Self::invalid_transition(error.to_string()),
            LifecycleError::NotFound { entity, id } => Self::not_found(entity, id),
            LifecycleError::PaymentDeclined(message) => Self::payment_declined(message),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Lifecycle(lifecycle) => lifecycle.into(),
            EngineError::Timeout => Self::timeout("The lifecycle engine did not reply in time"),
            EngineError::Unavailable(message) => Self::internal(message),
        }
    }
}

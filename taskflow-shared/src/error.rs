//! Domain error type
//!
//! Services return [`CoreError`]. The HTTP layer maps each variant to a
//! status code; no variant is ever retried inside the core.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by domain services
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input breaks a domain rule (removing the owner, non-member assignee)
    #[error("{0}")]
    Validation(String),

    /// Target does not exist or is outside the actor's projects
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Target is visible but the actor's role does not allow the action
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate membership or label name
    #[error("{0}")]
    Conflict(String),

    /// Persistence failure
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => CoreError::Conflict(message),
            other => CoreError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_becomes_core_conflict() {
        let err: CoreError = StoreError::Conflict("label bug already exists".to_string()).into();
        assert!(matches!(err, CoreError::Conflict(ref m) if m == "label bug already exists"));

        let err: CoreError = StoreError::TransactionClosed.into();
        assert!(matches!(err, CoreError::Store(StoreError::TransactionClosed)));
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(CoreError::NotFound("task").to_string(), "task not found");
    }
}

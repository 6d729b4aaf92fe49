// Error taxonomy for the prediction and reminder services
//
// Every service operation returns one of these kinds; the HTTP layer maps
// them onto status codes at the request boundary.

use thiserror::Error;

/// Errors returned by the account, prediction and reminder services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing caller input. Never reaches the store.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The persistence layer failed; any open transaction was rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Anything not classified above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        ServiceError::Unexpected(message.into())
    }

    /// Short, stable name of the error kind (used in logs).
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Storage(_) => "storage",
            ServiceError::Unexpected(_) => "unexpected",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rusqlite_error_becomes_storage() {
        let err: ServiceError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().starts_with("storage error"));
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ServiceError::validation("Fields \"valor\" and \"due_date\" are required.");
        assert_eq!(err.kind(), "validation");
        assert_eq!(
            err.to_string(),
            "Fields \"valor\" and \"due_date\" are required."
        );
    }
}

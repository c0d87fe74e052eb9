use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service-level error taxonomy for the checkout workflow.
///
/// Validation errors carry the exact user-facing message for the first
/// failed rule; transport errors are surfaced uniformly and are always
/// recoverable by resubmission.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_message() {
        let err = ServiceError::ValidationError("CVV must be at least 3 digits.".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: CVV must be at least 3 digits."
        );
    }
}

//! Error types for the service clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the infrastructure service APIs
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service rejected or failed the call
    #[error("{operation} failed ({code}): {message}")]
    ServiceError {
        /// Name of the API operation
        operation: String,
        /// Service error code (e.g. "ValidationError")
        code: String,
        /// Error message from the service
        message: String,
    },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Request rate exceeded
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The call never reached the service
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Create a service error from operation, code and message
    pub fn service_error(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ServiceError {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    ///
    /// The stack service reports unknown stacks as a validation error whose
    /// message ends in "does not exist", so that shape counts too.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::ServiceError { code, message, .. } => {
                code == "ValidationError" && message.contains("does not exist")
            }
            _ => false,
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants() {
        assert!(ClientError::NotFound("stack".into()).is_not_found());
        assert!(
            ClientError::service_error(
                "DescribeStacks",
                "ValidationError",
                "Stack with id eksctl-demo-cluster does not exist"
            )
            .is_not_found()
        );
        assert!(
            !ClientError::service_error("DescribeStacks", "ValidationError", "bad template")
                .is_not_found()
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Throttled("rate exceeded".into()).is_retryable());
        assert!(!ClientError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn test_display_carries_operation() {
        let err = ClientError::service_error("CreateStack", "AlreadyExistsException", "exists");
        assert_eq!(
            err.to_string(),
            "CreateStack failed (AlreadyExistsException): exists"
        );
    }
}

//! Error types for the ppolicy mapper.
//!
//! Errors carry a transient/permanent classification so the directory-access
//! layer that owns retries can decide what to do with them.

use thiserror::Error;

/// Error that can occur while evaluating or reconciling lockout state.
#[derive(Debug, Error)]
pub enum PpolicyError {
    // Data errors (permanent)
    /// A lock timestamp attribute could not be parsed as generalized time.
    #[error("invalid generalized time '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    /// Mapper configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Directory errors
    /// The directory refused a modification.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    /// The directory rejected a value.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// The entry being modified no longer exists.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// The directory is temporarily unavailable.
    #[error("target system unavailable: {message}")]
    TargetUnavailable { message: String },

    /// A collaborator operation failed.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PpolicyError {
    /// Check if this error is transient and the operation may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, PpolicyError::TargetUnavailable { .. })
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            PpolicyError::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            PpolicyError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            PpolicyError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            PpolicyError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            PpolicyError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            PpolicyError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            PpolicyError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    // Convenience constructors

    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(value: impl Into<String>, message: impl Into<String>) -> Self {
        PpolicyError::InvalidTimestamp {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        PpolicyError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        PpolicyError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PpolicyError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for ppolicy mapper operations.
pub type PpolicyResult<T> = Result<T, PpolicyError>;

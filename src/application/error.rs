//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Missing or invalid column mapping, settings or row shape.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Stable, machine-readable error category for response payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ApplicationError::Domain(DomainError::InvalidOperation { .. }) => "invalid_operation",
            ApplicationError::Domain(DomainError::Boundary { .. }) => "boundary",
            ApplicationError::Domain(DomainError::NodeNotFound(_)) => "not_found",
            ApplicationError::Domain(DomainError::CorruptTree { .. }) => "corrupt_tree",
            ApplicationError::Configuration { .. } => "configuration",
            ApplicationError::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

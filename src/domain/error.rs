//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::{Direction, NodeKey};

/// Domain errors represent business rule and nested-set violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Attempted create/remove/move/edit that the node's rules forbid.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Attempted move past a tree extremity.
    #[error("node {key} cannot move {direction}: already at the boundary")]
    Boundary { key: NodeKey, direction: Direction },

    #[error("node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("corrupt nested set: {message}")]
    CorruptTree { message: String },
}

impl DomainError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptTree {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

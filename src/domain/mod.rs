//! Domain layer: node records and nested-set arithmetic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod nested_set;
pub mod node;

pub use error::{DomainError, DomainResult};
pub use nested_set::{Forest, Placement};
pub use node::{Direction, IconType, Node, NodeAttributes, NodeDraft, NodeFlags, NodeKey};

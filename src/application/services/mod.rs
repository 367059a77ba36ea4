//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the [`NodeStore`](crate::infrastructure::NodeStore)
//! boundary trait but are themselves concrete structs, not traits.

mod tree;

pub use tree::{MutationOutcome, TreeService};

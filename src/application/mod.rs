//! Application layer: loading, rendering, validation and the tree service
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod input;
pub mod loader;
pub mod renderer;
pub mod response;
pub mod services;
pub mod validator;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use input::{RenderedInput, Selection, TreeInput};
pub use loader::{TreeLoader, TreeScope};
pub use renderer::{
    escape_html, ItemDecorator, NodeView, Plain, RenderContext, RenderStats, RenderedTree,
    TreeRenderer,
};
pub use response::{NodeCoordinates, NodeResponse, ResponseStatus};
pub use validator::{accepts_children, MutationValidator, RemoveMode};

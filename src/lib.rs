//! nestview: server-rendered tree view and tree picker over nested-set rows
//!
//! Layers, innermost first:
//!
//! - [`domain`]: nodes and the nested-set [`Forest`](domain::Forest)
//! - [`application`]: loader, renderer, validator, tree input and the
//!   transactional [`TreeService`](application::services::TreeService)
//! - [`infrastructure`]: row stores and the service container
//! - [`cli`]: the `nestview` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

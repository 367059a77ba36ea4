//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::TreeService;
use crate::config::Settings;
use crate::infrastructure::traits::{JsonFileStore, NodeStore};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Row storage
    pub store: Arc<dyn NodeStore>,

    pub tree: TreeService,
}

impl ServiceContainer {
    /// Create a container backed by the JSON file named in `settings.store`.
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(JsonFileStore::new(settings.store.clone()));
        Self::with_deps(settings, store)
    }

    /// Create a service container with a custom store (for testing).
    pub fn with_deps(settings: Settings, store: Arc<dyn NodeStore>) -> Self {
        let settings = Arc::new(settings);
        let tree = TreeService::new(store.clone(), settings.clone());

        Self {
            settings,
            store,
            tree,
        }
    }
}

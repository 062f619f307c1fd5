//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::TreeService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileStateStore, FileSystem, RealFileSystem, StateStore};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Key-value persistence for auto-save
    pub state: Arc<dyn StateStore>,

    /// Configuration tree, restored from the state store
    pub tree: TreeService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let state = Arc::new(FileStateStore::new(settings.state_file.clone(), Arc::clone(&fs)));
        Self::with_deps(settings, fs, state)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let tree = TreeService::new(Arc::clone(&fs), Arc::clone(&state), settings.state_key.clone());
        let restored = tree.restore();
        debug!("service container ready (restored: {restored})");

        Self {
            settings,
            fs,
            state,
            tree,
        }
    }
}

//! Service container for dependency injection
//!
//! Wires up the rule registry, filesystem and editing sessions.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::MutationService;
use crate::application::EditorSession;
use crate::config::Settings;
use crate::domain::{PageTree, RuleRegistry, Validator};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::tree_file::TreeFileStore;

/// Container holding the shared registry and I/O dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Effective component rules: built-ins, file overrides, disabled types removed
    pub registry: Arc<RuleRegistry>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> InfraResult<Self> {
        let registry = Arc::new(Self::build_registry(&settings, fs.as_ref())?);
        Ok(Self {
            settings: Arc::new(settings),
            fs,
            registry,
        })
    }

    #[instrument(level = "debug", skip_all)]
    fn build_registry(settings: &Settings, fs: &dyn FileSystem) -> InfraResult<RuleRegistry> {
        let mut registry = RuleRegistry::builtin();
        if let Some(path) = &settings.rules_file {
            let content = fs
                .read_to_string(path)
                .map_err(|e| InfraError::io(format!("read rules {}", path.display()), e))?;
            let overrides = RuleRegistry::parse_table(&content)?;
            debug!("applying {} rule overrides from {}", overrides.len(), path.display());
            registry = registry.with_overrides(overrides)?;
        }
        if !settings.disabled_types.is_empty() {
            debug!("disabling types: {:?}", settings.disabled_types);
            registry = registry.without_types(&settings.disabled_types)?;
        }
        Ok(registry)
    }

    /// Fresh editing session over `tree`.
    pub fn session(&self, tree: PageTree) -> EditorSession {
        EditorSession::with_tree(
            Arc::clone(&self.registry),
            self.settings.session_options(),
            tree,
        )
    }

    pub fn mutation(&self) -> MutationService {
        MutationService::new(Arc::clone(&self.registry))
    }

    pub fn validator(&self) -> Validator {
        Validator::new(Arc::clone(&self.registry))
    }

    pub fn tree_files(&self) -> TreeFileStore {
        TreeFileStore::new(Arc::clone(&self.fs))
    }
}


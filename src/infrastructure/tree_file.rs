//! Page persistence: the serialized tree is a JSON array of root nodes.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::PageTree;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::FileSystem;

/// Reads and writes page trees through the filesystem abstraction.
pub struct TreeFileStore {
    fs: Arc<dyn FileSystem>,
}

impl TreeFileStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load a page. A blank file is an empty page.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<PageTree> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let tree = Self::parse(&content)
            .map_err(|e| InfraError::json(path.display().to_string(), e))?;
        debug!("loaded {} nodes from {}", tree.len(), path.display());
        Ok(tree)
    }

    /// Write a page, creating parent directories.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, path: &Path, tree: &PageTree) -> InfraResult<()> {
        let json = Self::to_json(tree)?;
        self.fs
            .ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
        self.fs
            .write(path, &json)
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
        debug!("saved {} nodes to {}", tree.len(), path.display());
        Ok(())
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(tree: &PageTree) -> InfraResult<String> {
        let mut json =
            serde_json::to_string_pretty(tree).map_err(|e| InfraError::json("serialize page", e))?;
        json.push('\n');
        Ok(json)
    }

    pub fn parse(content: &str) -> Result<PageTree, serde_json::Error> {
        if content.trim().is_empty() {
            return Ok(PageTree::new());
        }
        serde_json::from_str(content)
    }
}

//! Editing session: one tree, one history, shared rules.
//!
//! Wraps every tree-changing service call with exactly one history record.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::{
    DragSource, DropPlan, DropResolver, DropZones, HistoryManager, MutationService,
};
use crate::domain::{
    DomainResult, Node, NodeId, NodePatch, PageTree, Position, RuleRegistry, ValidationReport,
    Validator,
};

/// Tunables for a session, usually taken from `Settings`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionOptions {
    pub drop_zones: DropZones,
    pub history_limit: Option<usize>,
}

/// Single-writer editing state for one page.
#[derive(Debug, Clone)]
pub struct EditorSession {
    tree: PageTree,
    history: HistoryManager,
    mutation: MutationService,
    resolver: DropResolver,
    validator: Validator,
    options: SessionOptions,
}

impl EditorSession {
    /// Session over an empty page.
    pub fn new(registry: Arc<RuleRegistry>, options: SessionOptions) -> Self {
        Self::with_tree(registry, options, PageTree::new())
    }

    /// Session starting from an existing tree (e.g. loaded from disk).
    pub fn with_tree(registry: Arc<RuleRegistry>, options: SessionOptions, tree: PageTree) -> Self {
        let mutation = MutationService::new(Arc::clone(&registry));
        let resolver = DropResolver::new(mutation.clone(), options.drop_zones);
        let validator = Validator::new(registry);
        let history = HistoryManager::with_limit(tree.clone(), options.history_limit);
        Self {
            tree,
            history,
            mutation,
            resolver,
            validator,
            options,
        }
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn into_tree(self) -> PageTree {
        self.tree
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn registry(&self) -> &RuleRegistry {
        self.mutation.registry()
    }

    /// Replace the tree wholesale and restart history from it.
    pub fn load(&mut self, tree: PageTree) {
        info!("session: loaded tree with {} nodes", tree.len());
        self.history = HistoryManager::with_limit(tree.clone(), self.options.history_limit);
        self.tree = tree;
    }

    pub fn create_node(&self, node_type: &str, overrides: Option<&NodePatch>) -> Node {
        self.mutation.create_node(node_type, overrides)
    }

    pub fn insert(
        &mut self,
        node: Node,
        target_id: &NodeId,
        position: Position,
        explicit_index: Option<usize>,
    ) -> DomainResult<NodeId> {
        let id = node.id().clone();
        let next = self
            .mutation
            .insert(&self.tree, node, target_id, position, explicit_index)?;
        self.commit(next);
        Ok(id)
    }

    pub fn insert_root(&mut self, node: Node, index: Option<usize>) -> DomainResult<NodeId> {
        let id = node.id().clone();
        let next = self.mutation.insert_root(&self.tree, node, index)?;
        self.commit(next);
        Ok(id)
    }

    pub fn insert_into_slot(
        &mut self,
        node: Node,
        target_id: &NodeId,
        slot: &str,
        index: Option<usize>,
    ) -> DomainResult<NodeId> {
        let id = node.id().clone();
        let next = self
            .mutation
            .insert_into_slot(&self.tree, node, target_id, slot, index)?;
        self.commit(next);
        Ok(id)
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, node_id: &NodeId) -> bool {
        let next = self.mutation.remove(&self.tree, node_id);
        self.commit(next)
    }

    pub fn duplicate(&mut self, node_id: &NodeId) -> DomainResult<NodeId> {
        let (next, copy_id) = self.mutation.duplicate(&self.tree, node_id)?;
        self.commit(next);
        Ok(copy_id)
    }

    /// Returns whether the node's payload changed.
    pub fn update(&mut self, node_id: &NodeId, patch: &NodePatch) -> bool {
        let next = self.mutation.update(&self.tree, node_id, patch);
        self.commit(next)
    }

    pub fn move_node(
        &mut self,
        node_id: &NodeId,
        target_id: &NodeId,
        position: Position,
    ) -> DomainResult<()> {
        let next = self
            .mutation
            .move_node(&self.tree, node_id, target_id, position)?;
        self.commit(next);
        Ok(())
    }

    /// Preview a drop without applying it.
    pub fn resolve_drop(
        &self,
        source: &DragSource,
        target_id: &NodeId,
        offset_y: f64,
        height: f64,
    ) -> DomainResult<DropPlan> {
        self.resolver
            .resolve(&self.tree, source, target_id, offset_y, height)
    }

    pub fn drop_node(
        &mut self,
        source: DragSource,
        target_id: &NodeId,
        offset_y: f64,
        height: f64,
    ) -> DomainResult<NodeId> {
        let (next, id) = self
            .resolver
            .drop_node(&self.tree, source, target_id, offset_y, height)?;
        self.commit(next);
        Ok(id)
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.tree = snapshot.clone();
                true
            }
            None => false,
        }
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.tree = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn validate(&self) -> ValidationReport {
        self.validator.validate(&self.tree)
    }

    /// Pre-flight gate before persisting or exporting.
    pub fn ensure_valid(&self) -> DomainResult<()> {
        self.validate().into_result()
    }

    /// Adopt `next` and record it, unless it equals the current tree.
    #[instrument(level = "trace", skip_all)]
    fn commit(&mut self, next: PageTree) -> bool {
        if next == self.tree {
            debug!("session: no change, nothing recorded");
            return false;
        }
        self.tree = next;
        self.history.record(&self.tree);
        true
    }
}

//! Mutation service
//!
//! Structurally safe insert/remove/move/duplicate/update. Every operation works on
//! a copy of the input tree and only hands it back once all checks passed, so a
//! rejected call leaves the caller's tree exactly as it was.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{
    clone_with_fresh_ids, Container, DomainError, DomainResult, Location, Node, NodeBuilder,
    NodeId, NodePatch, PageTree, Position, RejectCause, RuleRegistry,
};

/// Service for structural edits of a [`PageTree`].
#[derive(Debug, Clone)]
pub struct MutationService {
    registry: Arc<RuleRegistry>,
    builder: NodeBuilder,
}

impl MutationService {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        let builder = NodeBuilder::new(Arc::clone(&registry));
        Self { registry, builder }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Fresh node with default children and empty declared slots.
    pub fn create_node(&self, node_type: &str, overrides: Option<&NodePatch>) -> Node {
        self.builder.create_node(node_type, overrides)
    }

    /// Read-only pre-flight: where a node of `node_type` would land.
    pub fn check_placement(
        &self,
        tree: &PageTree,
        node_type: &str,
        target_id: &NodeId,
        position: Position,
    ) -> DomainResult<Location> {
        self.destination(tree, node_type, target_id, position, None)
    }

    /// Insert `node` relative to `target_id`.
    ///
    /// `explicit_index` only applies to `Inside` and is clamped to the child count.
    #[instrument(level = "debug", skip(self, tree, node), fields(node = %node))]
    pub fn insert(
        &self,
        tree: &PageTree,
        node: Node,
        target_id: &NodeId,
        position: Position,
        explicit_index: Option<usize>,
    ) -> DomainResult<PageTree> {
        check_fresh_ids(tree, &node)?;
        let location = self.destination(tree, &node.node_type, target_id, position, explicit_index)?;
        let mut next = tree.clone();
        place(&mut next, &location, node)?;
        Ok(next)
    }

    /// Insert at root level; appends when `index` is `None`.
    #[instrument(level = "debug", skip(self, tree, node), fields(node = %node))]
    pub fn insert_root(
        &self,
        tree: &PageTree,
        node: Node,
        index: Option<usize>,
    ) -> DomainResult<PageTree> {
        check_fresh_ids(tree, &node)?;
        let mut roots = tree.roots().to_vec();
        let index = index.map_or(roots.len(), |i| i.min(roots.len()));
        roots.insert(index, node);
        Ok(PageTree::from_roots(roots))
    }

    /// Insert `node` into a named slot of `target_id`.
    #[instrument(level = "debug", skip(self, tree, node), fields(node = %node))]
    pub fn insert_into_slot(
        &self,
        tree: &PageTree,
        node: Node,
        target_id: &NodeId,
        slot: &str,
        index: Option<usize>,
    ) -> DomainResult<PageTree> {
        check_fresh_ids(tree, &node)?;
        if !tree.contains(target_id) {
            return Err(DomainError::TargetNotFound(target_id.clone()));
        }
        let container = Container::Slot(target_id.clone(), slot.to_string());
        let len = self.check_container(tree, &container, &node.node_type)?;
        let location = Location {
            container,
            index: index.map_or(len, |i| i.min(len)),
        };
        let mut next = tree.clone();
        place(&mut next, &location, node)?;
        Ok(next)
    }

    /// Strip `node_id` and its subtree; absent ids are a no-op.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn remove(&self, tree: &PageTree, node_id: &NodeId) -> PageTree {
        tree.remove_by_id(node_id)
    }

    /// Copy the subtree at `node_id` with fresh ids and place it right after the original.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn duplicate(&self, tree: &PageTree, node_id: &NodeId) -> DomainResult<(PageTree, NodeId)> {
        let original = tree
            .find_by_id(node_id)
            .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
        let copy = clone_with_fresh_ids(original);
        let copy_id = copy.id.clone();
        let location = self.destination(tree, &copy.node_type, node_id, Position::After, None)?;
        let mut next = tree.clone();
        place(&mut next, &location, copy)?;
        debug!("duplicated {} as {}", node_id, copy_id);
        Ok((next, copy_id))
    }

    /// Merge payload fields into `node_id`; topology is untouched. Absent ids are a no-op.
    #[instrument(level = "debug", skip(self, tree, patch))]
    pub fn update(&self, tree: &PageTree, node_id: &NodeId, patch: &NodePatch) -> PageTree {
        let mut next = tree.clone();
        if let Some(node) = next.find_by_id_mut(node_id) {
            patch.apply_to(node);
        }
        next
    }

    /// Pre-flight for [`move_node`](Self::move_node): destination in the tree as it
    /// will look once the node is detached.
    pub fn check_move(
        &self,
        tree: &PageTree,
        node_id: &NodeId,
        target_id: &NodeId,
        position: Position,
    ) -> DomainResult<Location> {
        self.detach_for_move(tree, node_id, target_id, position)
            .map(|(_, _, location)| location)
    }

    /// Relocate the original subtree (same ids) as one atomic step.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn move_node(
        &self,
        tree: &PageTree,
        node_id: &NodeId,
        target_id: &NodeId,
        position: Position,
    ) -> DomainResult<PageTree> {
        let (mut detached, node, location) = self.detach_for_move(tree, node_id, target_id, position)?;
        place(&mut detached, &location, node)?;
        Ok(detached)
    }

    /// Runs every move check and returns the detached working copy; the caller's
    /// tree is never touched.
    fn detach_for_move(
        &self,
        tree: &PageTree,
        node_id: &NodeId,
        target_id: &NodeId,
        position: Position,
    ) -> DomainResult<(PageTree, Node, Location)> {
        let moving = tree
            .find_by_id(node_id)
            .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
        if !tree.contains(target_id) {
            return Err(DomainError::TargetNotFound(target_id.clone()));
        }
        if node_id == target_id {
            debug!("move rejected: self drop {}", node_id);
            return Err(DomainError::SelfDrop(node_id.clone()));
        }
        if moving.contains_id(target_id) {
            debug!("move rejected: {} is inside {}", target_id, node_id);
            return Err(DomainError::CyclicMove {
                node: node_id.clone(),
                target: target_id.clone(),
            });
        }

        let mut detached = tree.clone();
        let node = detached
            .take(node_id)
            .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
        let location = self.destination(&detached, &node.node_type, target_id, position, None)?;
        Ok((detached, node, location))
    }

    /// Resolve `position` relative to `target_id` and run the owner's rule checks.
    fn destination(
        &self,
        tree: &PageTree,
        node_type: &str,
        target_id: &NodeId,
        position: Position,
        explicit_index: Option<usize>,
    ) -> DomainResult<Location> {
        let location = match position {
            Position::Inside => {
                if !tree.contains(target_id) {
                    return Err(DomainError::TargetNotFound(target_id.clone()));
                }
                let container = Container::Children(target_id.clone());
                let len = self.check_container(tree, &container, node_type)?;
                Location {
                    container,
                    index: explicit_index.map_or(len, |i| i.min(len)),
                }
            }
            Position::Before | Position::After => {
                let sibling = tree
                    .locate(target_id)
                    .ok_or_else(|| DomainError::TargetNotFound(target_id.clone()))?;
                self.check_container(tree, &sibling.container, node_type)?;
                let index = match position {
                    Position::After => sibling.index + 1,
                    _ => sibling.index,
                };
                Location {
                    container: sibling.container,
                    index,
                }
            }
        };
        debug!("destination for {}: {} at {}", node_type, location.container, location.index);
        Ok(location)
    }

    /// Check that one more `node_type` fits in `container`; returns its current length.
    fn check_container(
        &self,
        tree: &PageTree,
        container: &Container,
        node_type: &str,
    ) -> DomainResult<usize> {
        let owner = match container.owner() {
            None => return Ok(tree.roots().len()),
            Some(id) => tree
                .find_by_id(id)
                .ok_or_else(|| DomainError::TargetNotFound(id.clone()))?,
        };
        let parent_type = owner.node_type.as_str();
        let registry = &self.registry;

        match container {
            Container::Root => Ok(tree.roots().len()),
            Container::Children(_) => {
                let len = owner.children.len();
                if !registry.contains(parent_type) {
                    return Err(reject(RejectCause::UnknownParent, registry.error_message(parent_type, node_type)));
                }
                if !registry.accepts_children(parent_type) {
                    return Err(reject(RejectCause::NoChildren, registry.error_message(parent_type, node_type)));
                }
                if !registry.can_add_child(parent_type, node_type) {
                    return Err(reject(RejectCause::TypeNotAccepted, registry.error_message(parent_type, node_type)));
                }
                if !registry.can_add_more_children(parent_type, len) {
                    return Err(reject(RejectCause::CapacityExceeded, registry.capacity_message(parent_type)));
                }
                Ok(len)
            }
            Container::Slot(_, slot) => {
                let len = owner.slot(slot).len();
                let rule = registry.slot_rule(parent_type, slot).ok_or_else(|| {
                    reject(RejectCause::SlotNotDeclared, registry.slot_message(parent_type, slot, node_type))
                })?;
                if !rule.accepts(node_type) {
                    return Err(reject(RejectCause::TypeNotAccepted, registry.slot_message(parent_type, slot, node_type)));
                }
                if rule.max_count.is_some_and(|max| len >= max) {
                    return Err(reject(RejectCause::CapacityExceeded, registry.slot_message(parent_type, slot, node_type)));
                }
                Ok(len)
            }
        }
    }
}

/// Reject `node` if any id in its subtree is already in `tree` or repeats within it.
pub(crate) fn check_fresh_ids(tree: &PageTree, node: &Node) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for (_, n) in node.walk() {
        if tree.contains(&n.id) || !seen.insert(&n.id) {
            debug!("insert rejected: id {} already in use", n.id);
            return Err(DomainError::DuplicateId(n.id.clone()));
        }
    }
    Ok(())
}

fn reject(cause: RejectCause, message: String) -> DomainError {
    debug!("placement rejected ({:?}): {}", cause, message);
    DomainError::rejected(cause, message)
}

fn place(tree: &mut PageTree, location: &Location, node: Node) -> DomainResult<()> {
    let owner_missing = || {
        DomainError::TargetNotFound(
            location
                .container
                .owner()
                .cloned()
                .unwrap_or_else(|| node.id.clone()),
        )
    };
    let seq = tree.sequence_mut(&location.container).ok_or_else(owner_missing)?;
    let index = location.index.min(seq.len());
    seq.insert(index, node);
    Ok(())
}

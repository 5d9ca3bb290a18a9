//! Node store: the in-memory page tree and identity-based lookups.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::entities::{Node, NodeId, NodeIter};

/// Ordered sequence that owns a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// Top level of the page
    Root,
    /// Plain `children` of the given node
    Children(NodeId),
    /// Named slot of the given node
    Slot(NodeId, String),
}

impl Container {
    /// Owning node, `None` at root level.
    pub fn owner(&self) -> Option<&NodeId> {
        match self {
            Container::Root => None,
            Container::Children(id) | Container::Slot(id, _) => Some(id),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Root => write!(f, "root"),
            Container::Children(id) => write!(f, "{id}.children"),
            Container::Slot(id, slot) => write!(f, "{id}.slots.{slot}"),
        }
    }
}

/// Where a node sits (or will sit) in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub container: Container,
    pub index: usize,
}

/// A page: ordered root nodes, each exclusively owning its subtree.
///
/// Serializes as a plain array of root nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageTree {
    roots: Vec<Node>,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<Node>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Node> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order walk over every node with its depth (roots at 0).
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter::new(&self.roots)
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(|(_, node)| node.id.clone()).collect()
    }

    /// Number of levels; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth + 1).max().unwrap_or(0)
    }

    /// Depth-first search through children and every slot.
    #[instrument(level = "trace", skip(self))]
    pub fn find_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.iter().map(|(_, node)| node).find(|node| node.id == *id)
    }

    pub(crate) fn find_by_id_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        find_in_mut(&mut self.roots, id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Owning parent of `id`; `None` for roots and absent ids.
    #[instrument(level = "trace", skip(self))]
    pub fn find_parent(&self, id: &NodeId) -> Option<&Node> {
        self.iter().map(|(_, node)| node).find(|node| {
            node.sequences()
                .any(|seq| seq.iter().any(|child| child.id == *id))
        })
    }

    /// Container and index of `id`.
    pub fn locate(&self, id: &NodeId) -> Option<Location> {
        if let Some(index) = position_of(&self.roots, id) {
            return Some(Location {
                container: Container::Root,
                index,
            });
        }
        self.iter().find_map(|(_, node)| locate_in(node, id))
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: &NodeId) -> Vec<&Node> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.find_parent(current) {
            chain.push(parent);
            current = &parent.id;
        }
        chain
    }

    /// True if `id` lives strictly inside the subtree of `ancestor`.
    pub fn is_descendant_of(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        id != ancestor
            && self
                .find_by_id(ancestor)
                .is_some_and(|node| node.contains_id(id))
    }

    /// Copy of the tree with every occurrence of `id` (and its subtree) stripped.
    /// Removing an absent id yields an equal tree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_by_id(&self, id: &NodeId) -> PageTree {
        PageTree {
            roots: strip(&self.roots, id),
        }
    }

    /// Detach `id` from its owner and hand the subtree back.
    pub(crate) fn take(&mut self, id: &NodeId) -> Option<Node> {
        take_from(&mut self.roots, id)
    }

    /// Mutable sequence for `container`; a declared-but-absent slot is created empty.
    pub(crate) fn sequence_mut(&mut self, container: &Container) -> Option<&mut Vec<Node>> {
        match container {
            Container::Root => Some(&mut self.roots),
            Container::Children(owner) => self.find_by_id_mut(owner).map(|n| &mut n.children),
            Container::Slot(owner, slot) => {
                let node = self.find_by_id_mut(owner)?;
                Some(
                    node.slots
                        .get_or_insert_with(Default::default)
                        .entry(slot.clone())
                        .or_default(),
                )
            }
        }
    }
}

impl From<Vec<Node>> for PageTree {
    fn from(roots: Vec<Node>) -> Self {
        Self::from_roots(roots)
    }
}

fn position_of(nodes: &[Node], id: &NodeId) -> Option<usize> {
    nodes.iter().position(|node| node.id == *id)
}

fn locate_in(node: &Node, id: &NodeId) -> Option<Location> {
    if let Some(index) = position_of(&node.children, id) {
        return Some(Location {
            container: Container::Children(node.id.clone()),
            index,
        });
    }
    node.slots.iter().flatten().find_map(|(slot, nodes)| {
        position_of(nodes, id).map(|index| Location {
            container: Container::Slot(node.id.clone(), slot.clone()),
            index,
        })
    })
}

fn find_in_mut<'a>(nodes: &'a mut [Node], id: &NodeId) -> Option<&'a mut Node> {
    for node in nodes.iter_mut() {
        if node.id == *id {
            return Some(node);
        }
        let found = node.sequences_mut().find_map(|seq| find_in_mut(seq, id));
        if found.is_some() {
            return found;
        }
    }
    None
}

fn take_from(nodes: &mut Vec<Node>, id: &NodeId) -> Option<Node> {
    if let Some(index) = position_of(nodes, id) {
        return Some(nodes.remove(index));
    }
    nodes
        .iter_mut()
        .find_map(|node| node.sequences_mut().find_map(|seq| take_from(seq, id)))
}

fn strip(nodes: &[Node], id: &NodeId) -> Vec<Node> {
    nodes
        .iter()
        .filter(|node| node.id != *id)
        .map(|node| Node {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            properties: node.properties.clone(),
            style_overrides: node.style_overrides.clone(),
            children: strip(&node.children, id),
            slots: node.slots.as_ref().map(|slots| {
                slots
                    .iter()
                    .map(|(name, seq)| (name.clone(), strip(seq, id)))
                    .collect()
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // page
    // ├── hero
    // │   ├── title
    // │   └── acc (accordionItem)
    // │       └── #header: h
    // └── footer
    fn sample() -> PageTree {
        PageTree::from_roots(vec![
            Node::new("hero", "hero")
                .with_child(Node::new("title", "heading"))
                .with_child(
                    Node::new("acc", "accordionItem")
                        .with_slot("header", vec![Node::new("h", "heading")]),
                ),
            Node::new("footer", "footer"),
        ])
    }

    #[test]
    fn given_slot_child_when_find_by_id_then_found() {
        let tree = sample();
        assert_eq!(tree.find_by_id(&"h".into()).unwrap().node_type(), "heading");
        assert!(tree.find_by_id(&"missing".into()).is_none());
    }

    #[test]
    fn given_slot_child_when_find_parent_then_returns_slot_owner() {
        let tree = sample();
        assert_eq!(tree.find_parent(&"h".into()).unwrap().id().as_str(), "acc");
        assert!(tree.find_parent(&"hero".into()).is_none());
    }

    #[test]
    fn given_nodes_when_locate_then_reports_container_and_index() {
        let tree = sample();
        assert_eq!(
            tree.locate(&"footer".into()),
            Some(Location { container: Container::Root, index: 1 })
        );
        assert_eq!(
            tree.locate(&"acc".into()),
            Some(Location { container: Container::Children("hero".into()), index: 1 })
        );
        assert_eq!(
            tree.locate(&"h".into()),
            Some(Location { container: Container::Slot("acc".into(), "header".into()), index: 0 })
        );
    }

    #[test]
    fn given_nested_node_when_ancestors_then_nearest_first() {
        let tree = sample();
        let chain: Vec<&str> = tree.ancestors(&"h".into()).iter().map(|n| n.id().as_str()).collect();
        assert_eq!(chain, vec!["acc", "hero"]);
        assert!(tree.is_descendant_of(&"h".into(), &"hero".into()));
        assert!(!tree.is_descendant_of(&"hero".into(), &"hero".into()));
    }

    #[test]
    fn given_subtree_when_remove_by_id_then_detached_and_idempotent() {
        let tree = sample();
        let once = tree.remove_by_id(&"acc".into());
        assert!(!once.contains(&"acc".into()));
        assert!(!once.contains(&"h".into()));
        assert_eq!(once.len(), 3);
        assert_eq!(once.remove_by_id(&"acc".into()), once);
        assert_eq!(tree.remove_by_id(&"missing".into()), tree);
    }

    #[test]
    fn given_node_when_take_then_returns_whole_subtree() {
        let mut tree = sample();
        let taken = tree.take(&"acc".into()).unwrap();
        assert_eq!(taken.subtree_len(), 2);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn given_tree_when_depth_then_counts_levels() {
        assert_eq!(sample().depth(), 3);
        assert_eq!(PageTree::new().depth(), 0);
    }

    #[test]
    fn given_tree_json_when_round_tripped_then_shape_is_array() {
        let tree = sample();
        let json = serde_json::to_value(&tree).unwrap();
        assert!(json.is_array());
        let back: PageTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}

//! Node construction: fresh nodes with their default children, and id-fresh copies.

use std::sync::Arc;

use tracing::{instrument, trace};

use crate::domain::entities::{Node, NodeId, NodePatch, SlotMap};
use crate::domain::rules::RuleRegistry;

/// Creates nodes according to the rule registry.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    registry: Arc<RuleRegistry>,
}

impl NodeBuilder {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// New node of `node_type` with a fresh id.
    ///
    /// Default children are materialized recursively and every declared slot
    /// starts out empty. Unknown types yield a bare node; the validator reports them.
    #[instrument(level = "debug", skip(self, overrides))]
    pub fn create_node(&self, node_type: &str, overrides: Option<&NodePatch>) -> Node {
        let mut node = self.materialize(node_type);
        if let Some(patch) = overrides {
            patch.apply_to(&mut node);
        }
        node
    }

    fn materialize(&self, node_type: &str) -> Node {
        let mut node = Node::new(NodeId::generate(), node_type);
        node.children = self
            .registry
            .default_children_types(node_type)
            .iter()
            .map(|child| self.materialize(child))
            .collect();
        if let Some(rules) = self.registry.slot_rules(node_type) {
            let slots: SlotMap = rules.keys().map(|name| (name.clone(), Vec::new())).collect();
            node.slots = Some(slots);
        }
        trace!("materialized {} with {} default children", node, node.children.len());
        node
    }
}

/// Deep copy of `node` where every node gets a new id.
///
/// Post-order: owned sequences are copied before the node itself is minted.
pub fn clone_with_fresh_ids(node: &Node) -> Node {
    let children = node.children.iter().map(clone_with_fresh_ids).collect();
    let slots = node.slots.as_ref().map(|slots| {
        slots
            .iter()
            .map(|(name, seq)| (name.clone(), seq.iter().map(clone_with_fresh_ids).collect()))
            .collect()
    });
    Node {
        id: NodeId::generate(),
        node_type: node.node_type.clone(),
        properties: node.properties.clone(),
        style_overrides: node.style_overrides.clone(),
        children,
        slots,
    }
}

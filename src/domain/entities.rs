//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Open string-keyed map used for `properties` and `styleOverrides`.
/// The engine never interprets the values.
pub type PropertyMap = BTreeMap<String, Value>;

/// Slot name -> ordered owned nodes.
pub type SlotMap = BTreeMap<String, Vec<Node>>;

/// Opaque node identifier, minted once and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for compact display.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Structural intent relative to a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Preceding sibling of the target.
    Before,
    /// Following sibling of the target.
    After,
    /// Child of the target.
    Inside,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Position::Before => "before",
            Position::After => "after",
            Position::Inside => "inside",
        };
        f.write_str(s)
    }
}

/// One element of the component tree.
///
/// `children` and `slots` are the only ownership edges. Fields are crate-private:
/// external code reads through accessors and changes a tree only through the
/// mutation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub(crate) id: NodeId,
    #[serde(rename = "type")]
    pub(crate) node_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) properties: PropertyMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) style_overrides: PropertyMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) slots: Option<SlotMap>,
}

impl Node {
    /// Bare node with no payload, children or slots.
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: PropertyMap::new(),
            style_overrides: PropertyMap::new(),
            children: Vec::new(),
            slots: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style_overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>, nodes: Vec<Node>) -> Self {
        self.slots
            .get_or_insert_with(SlotMap::new)
            .insert(name.into(), nodes);
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn style_overrides(&self) -> &PropertyMap {
        &self.style_overrides
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn slots(&self) -> Option<&SlotMap> {
        self.slots.as_ref()
    }

    /// Contents of a slot; empty when the slot is absent.
    pub fn slot(&self, name: &str) -> &[Node] {
        self.slots
            .as_ref()
            .and_then(|slots| slots.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every owned sequence: `children` first, then each slot in name order.
    pub(crate) fn sequences(&self) -> impl Iterator<Item = &Vec<Node>> {
        std::iter::once(&self.children).chain(self.slots.iter().flat_map(|s| s.values()))
    }

    pub(crate) fn sequences_mut(&mut self) -> impl Iterator<Item = &mut Vec<Node>> {
        std::iter::once(&mut self.children)
            .chain(self.slots.iter_mut().flat_map(|s| s.values_mut()))
    }

    /// True if `id` is this node or anywhere in its owned subtree.
    pub fn contains_id(&self, id: &NodeId) -> bool {
        self.walk().any(|(_, node)| node.id == *id)
    }

    /// Pre-order walk over this node and its owned subtree, with depth relative to `self`.
    pub fn walk(&self) -> NodeIter<'_> {
        NodeIter::new(std::slice::from_ref(self))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        self.walk().count()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.node_type, self.id.short())
    }
}

/// Pre-order iterator over a forest, children before slots.
pub struct NodeIter<'a> {
    stack: Vec<(usize, &'a Node)>,
}

impl<'a> NodeIter<'a> {
    pub(crate) fn new(roots: &'a [Node]) -> Self {
        // Push in reverse order for left-to-right traversal
        let stack = roots.iter().rev().map(|node| (0, node)).collect();
        Self { stack }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        let owned: Vec<&'a Node> = node.sequences().flat_map(|seq| seq.iter()).collect();
        for child in owned.into_iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, node))
    }
}

/// Partial update for a node's payload; topology is never part of a patch.
///
/// A JSON `null` value removes the key instead of storing `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodePatch {
    pub properties: PropertyMap,
    pub style_overrides: PropertyMap,
}

impl NodePatch {
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style_overrides.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.style_overrides.is_empty()
    }

    /// Merge into `node`; returns whether anything changed.
    pub(crate) fn apply_to(&self, node: &mut Node) -> bool {
        let props = merge_map(&mut node.properties, &self.properties);
        let styles = merge_map(&mut node.style_overrides, &self.style_overrides);
        props || styles
    }
}

fn merge_map(target: &mut PropertyMap, overlay: &PropertyMap) -> bool {
    let mut changed = false;
    for (key, value) in overlay {
        if value.is_null() {
            changed |= target.remove(key).is_some();
        } else if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::new("acc", "accordionItem")
            .with_slot("header", vec![Node::new("h", "heading")])
            .with_slot("content", vec![Node::new("t1", "text"), Node::new("t2", "text")])
    }

    #[test]
    fn given_node_with_slots_when_walking_then_visits_children_before_slots_in_name_order() {
        let node = Node::new("root", "section")
            .with_child(Node::new("c", "text"))
            .with_slot("a", vec![Node::new("s", "text")]);

        let ids: Vec<&str> = node.walk().map(|(_, n)| n.id().as_str()).collect();
        assert_eq!(ids, vec!["root", "c", "s"]);
    }

    #[test]
    fn given_slot_tree_when_walking_then_reports_depth() {
        let node = sample();
        let depths: Vec<(usize, &str)> = node.walk().map(|(d, n)| (d, n.id().as_str())).collect();
        // content sorts before header
        assert_eq!(depths, vec![(0, "acc"), (1, "t1"), (1, "t2"), (1, "h")]);
    }

    #[test]
    fn given_missing_slot_when_reading_then_returns_empty() {
        assert!(sample().slot("footer").is_empty());
        assert_eq!(sample().slot("content").len(), 2);
    }

    #[test]
    fn given_patch_with_null_when_applied_then_removes_key() {
        let mut node = Node::new("n", "text")
            .with_property("content", "hi")
            .with_property("align", "left");
        let patch = NodePatch::default()
            .property("align", Value::Null)
            .property("content", "bye")
            .style("color", "red");

        assert!(patch.apply_to(&mut node));
        assert_eq!(node.properties().get("content"), Some(&json!("bye")));
        assert!(!node.properties().contains_key("align"));
        assert_eq!(node.style_overrides().get("color"), Some(&json!("red")));
    }

    #[test]
    fn given_identical_patch_when_applied_then_reports_no_change() {
        let mut node = Node::new("n", "text").with_property("content", "hi");
        let patch = NodePatch::default().property("content", "hi");
        assert!(!patch.apply_to(&mut node));
    }

    #[test]
    fn given_node_when_serialized_then_uses_camel_case_shape() {
        let node = Node::new("n", "text").with_style("fontSize", 12);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({"id": "n", "type": "text", "styleOverrides": {"fontSize": 12}})
        );
    }

    #[test]
    fn given_generated_ids_then_they_differ() {
        assert_ne!(NodeId::generate(), NodeId::generate());
    }
}

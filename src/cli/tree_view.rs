//! Terminal tree rendering via termtree.

use termtree::Tree;

use crate::domain::{Node, PageTree};

pub trait TreeNodeConvert {
    /// `full_ids` prints complete ids instead of the 8-char prefix.
    fn to_tree_string(&self, full_ids: bool) -> Tree<String>;
}

fn label(node: &Node, full_ids: bool) -> String {
    let id = if full_ids {
        node.id().as_str()
    } else {
        node.id().short()
    };
    format!("{} [{}]", node.node_type(), id)
}

impl TreeNodeConvert for Node {
    fn to_tree_string(&self, full_ids: bool) -> Tree<String> {
        let mut tree = Tree::new(label(self, full_ids));
        for child in self.children() {
            tree.push(child.to_tree_string(full_ids));
        }
        // slots render as `#name` groups after the plain children
        if let Some(slots) = self.slots() {
            for (name, nodes) in slots {
                let leaves: Vec<_> = nodes.iter().map(|n| n.to_tree_string(full_ids)).collect();
                tree.push(Tree::new(format!("#{name}")).with_leaves(leaves));
            }
        }
        tree
    }
}

impl TreeNodeConvert for PageTree {
    fn to_tree_string(&self, full_ids: bool) -> Tree<String> {
        let leaves: Vec<_> = self
            .roots()
            .iter()
            .map(|n| n.to_tree_string(full_ids))
            .collect();
        let title = if leaves.is_empty() {
            "page (empty)".to_string()
        } else {
            format!("page ({} nodes)", self.len())
        };
        Tree::new(title).with_leaves(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_slotted_node_when_rendered_then_slot_groups_listed() {
        let node = Node::new("acc-item-1", "accordionItem")
            .with_slot("header", vec![Node::new("heading-1", "heading")])
            .with_slot("content", vec![]);
        let rendered = PageTree::from_roots(vec![node])
            .to_tree_string(false)
            .to_string();

        assert!(rendered.contains("accordionItem [acc-item]"));
        assert!(rendered.contains("#header"));
        assert!(rendered.contains("heading [heading-]"));
        assert!(rendered.contains("#content"));
    }

    #[test]
    fn given_empty_page_when_rendered_then_marked_empty() {
        let rendered = PageTree::new().to_tree_string(true).to_string();
        assert!(rendered.starts_with("page (empty)"));
    }
}

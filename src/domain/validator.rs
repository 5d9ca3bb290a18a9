//! Structural validation of whole trees against the rule registry.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::entities::{Node, NodeId};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::rules::RuleRegistry;
use crate::domain::tree::PageTree;

/// One step of a [`NodePath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Root(usize),
    Child(usize),
    Slot(String, usize),
}

/// Stable address of a node within one validation pass,
/// e.g. `root[0].children[2].slots.content[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    fn join(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Root(idx) => write!(f, "root[{idx}]")?,
                PathSegment::Child(idx) => write!(f, "children[{idx}]")?,
                PathSegment::Slot(name, idx) => write!(f, "slots.{name}[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    DuplicateId,
    UnknownType,
    ChildrenNotAccepted,
    TooFewChildren,
    TooManyChildren,
    ChildTypeNotAccepted,
    MissingRequiredSlot,
    SlotOverCapacity,
    SlotTypeNotAccepted,
    SlotNotDeclared,
}

/// A single rule violation, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub path: NodePath,
    pub node_id: NodeId,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of [`Validator::validate`]; errors are in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<Violation>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<Violation>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Gate for persist/export: `ValidationFailed` carrying every message.
    pub fn into_result(self) -> DomainResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(DomainError::ValidationFailed {
                errors: self.messages(),
            })
        }
    }
}

/// Read-only checker; always safe to call speculatively.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<RuleRegistry>,
}

impl Validator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    #[instrument(level = "debug", skip_all)]
    pub fn validate(&self, tree: &PageTree) -> ValidationReport {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for (idx, root) in tree.roots().iter().enumerate() {
            self.validate_node(
                root,
                NodePath::default().join(PathSegment::Root(idx)),
                &mut seen,
                &mut errors,
            );
        }
        debug!("validate: {} nodes, {} violations", tree.len(), errors.len());
        ValidationReport::from_errors(errors)
    }

    fn validate_node<'a>(
        &self,
        node: &'a Node,
        path: NodePath,
        seen: &mut HashSet<&'a NodeId>,
        errors: &mut Vec<Violation>,
    ) {
        let mut report = |kind: ViolationKind, path: &NodePath, id: &NodeId, message: String| {
            errors.push(Violation {
                kind,
                path: path.clone(),
                node_id: id.clone(),
                message,
            })
        };

        if !seen.insert(&node.id) {
            report(
                ViolationKind::DuplicateId,
                &path,
                &node.id,
                format!("id \"{}\" is used by more than one node", node.id),
            );
        }

        let Some(entry) = self.registry.get(&node.node_type) else {
            // Children of an unknown type are moot
            report(
                ViolationKind::UnknownType,
                &path,
                &node.id,
                format!("unknown type \"{}\"", node.node_type),
            );
            return;
        };

        let count = node.children.len();
        if count > 0 && !entry.accepts_children {
            report(
                ViolationKind::ChildrenNotAccepted,
                &path,
                &node.id,
                format!("\"{}\" cannot contain children ({count} found)", node.node_type),
            );
        } else {
            if let Some(min) = entry.min_children.filter(|&min| count < min) {
                report(
                    ViolationKind::TooFewChildren,
                    &path,
                    &node.id,
                    format!("\"{}\" needs at least {min} children, has {count}", node.node_type),
                );
            }
            if let Some(max) = entry.max_children.filter(|&max| count > max) {
                report(
                    ViolationKind::TooManyChildren,
                    &path,
                    &node.id,
                    format!("\"{}\" allows at most {max} children, has {count}", node.node_type),
                );
            }
            if let Some(accepted) = &entry.accepted_child_types {
                for (idx, child) in node.children.iter().enumerate() {
                    if !accepted.contains(&child.node_type) {
                        report(
                            ViolationKind::ChildTypeNotAccepted,
                            &path.join(PathSegment::Child(idx)),
                            &child.id,
                            self.registry.error_message(&node.node_type, &child.node_type),
                        );
                    }
                }
            }
        }

        if let Some(slot_rules) = &entry.slot_rules {
            for (name, rule) in slot_rules {
                let contents = node.slot(name);
                if rule.required && contents.is_empty() {
                    report(
                        ViolationKind::MissingRequiredSlot,
                        &path,
                        &node.id,
                        format!("required slot \"{name}\" of \"{}\" is empty", node.node_type),
                    );
                }
                if let Some(max) = rule.max_count.filter(|&max| contents.len() > max) {
                    report(
                        ViolationKind::SlotOverCapacity,
                        &path,
                        &node.id,
                        format!("slot \"{name}\" holds at most {max} node(s), has {}", contents.len()),
                    );
                }
                for (idx, child) in contents.iter().enumerate() {
                    if !rule.accepts(&child.node_type) {
                        report(
                            ViolationKind::SlotTypeNotAccepted,
                            &path.join(PathSegment::Slot(name.clone(), idx)),
                            &child.id,
                            self.registry.slot_message(&node.node_type, name, &child.node_type),
                        );
                    }
                }
            }
        }

        for (name, contents) in node.slots.iter().flatten() {
            let declared = entry.slot_rules.as_ref().is_some_and(|rules| rules.contains_key(name));
            if !declared && !contents.is_empty() {
                report(
                    ViolationKind::SlotNotDeclared,
                    &path,
                    &node.id,
                    self.registry.slot_message(&node.node_type, name, &contents[0].node_type),
                );
            }
        }

        for (idx, child) in node.children.iter().enumerate() {
            self.validate_node(child, path.join(PathSegment::Child(idx)), seen, errors);
        }
        for (name, contents) in node.slots.iter().flatten() {
            for (idx, child) in contents.iter().enumerate() {
                self.validate_node(child, path.join(PathSegment::Slot(name.clone(), idx)), seen, errors);
            }
        }
    }
}

//! Drop resolver
//!
//! Turns a pointer position over a candidate target into a structural intent and
//! refuses drops that would break the tree: self-drop, cycles, reused ids,
//! rejected types and full containers.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::services::{check_fresh_ids, MutationService};
use crate::domain::{DomainError, DomainResult, Node, NodeId, PageTree, Position};

/// Relative thresholds splitting a target's height into before / inside / after bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropZones {
    pub before: f64,
    pub after: f64,
}

impl Default for DropZones {
    fn default() -> Self {
        Self {
            before: 0.2,
            after: 0.8,
        }
    }
}

impl DropZones {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.before)
            && (0.0..=1.0).contains(&self.after)
            && self.before <= self.after
    }
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    /// A new node pulled from the component library
    Library(Node),
    /// A node already in the tree being reordered
    Existing(NodeId),
}

/// Accepted drop: where the node goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub target_id: NodeId,
    pub position: Position,
}

/// Resolves pointer drops into inserts or moves.
#[derive(Debug, Clone)]
pub struct DropResolver {
    mutation: MutationService,
    zones: DropZones,
}

impl DropResolver {
    pub fn new(mutation: MutationService, zones: DropZones) -> Self {
        Self { mutation, zones }
    }

    pub fn zones(&self) -> DropZones {
        self.zones
    }

    /// Band for a pointer `offset_y` inside a box of `height`.
    /// A degenerate box resolves to `Inside`.
    pub fn intent_for(&self, offset_y: f64, height: f64) -> Position {
        if height.is_nan() || height <= 0.0 || !offset_y.is_finite() {
            return Position::Inside;
        }
        let ratio = offset_y / height;
        if ratio < self.zones.before {
            Position::Before
        } else if ratio > self.zones.after {
            Position::After
        } else {
            Position::Inside
        }
    }

    /// Decide where a drop lands without changing anything.
    ///
    /// Checks run in order and the first failure wins: self-drop, cycle, then
    /// the destination's type and capacity rules.
    #[instrument(level = "debug", skip(self, tree, source))]
    pub fn resolve(
        &self,
        tree: &PageTree,
        source: &DragSource,
        target_id: &NodeId,
        offset_y: f64,
        height: f64,
    ) -> DomainResult<DropPlan> {
        let target = tree
            .find_by_id(target_id)
            .ok_or_else(|| DomainError::TargetNotFound(target_id.clone()))?;

        if let DragSource::Existing(dragged) = source {
            if dragged == target_id {
                debug!("drop rejected: self drop");
                return Err(DomainError::SelfDrop(dragged.clone()));
            }
        }

        let intent = self.intent_for(offset_y, height);
        let plan = if intent == Position::Inside
            && !self.mutation.registry().accepts_children(target.node_type())
        {
            self.reproject(tree, target_id)
        } else {
            DropPlan {
                target_id: target_id.clone(),
                position: intent,
            }
        };
        debug!("drop intent {} -> {} {}", intent, plan.position, plan.target_id);

        match source {
            DragSource::Existing(dragged) => {
                let node = tree
                    .find_by_id(dragged)
                    .ok_or_else(|| DomainError::NodeNotFound(dragged.clone()))?;
                if node.contains_id(target_id) || node.contains_id(&plan.target_id) {
                    debug!("drop rejected: {} is inside {}", plan.target_id, dragged);
                    return Err(DomainError::CyclicMove {
                        node: dragged.clone(),
                        target: plan.target_id.clone(),
                    });
                }
                self.mutation
                    .check_move(tree, dragged, &plan.target_id, plan.position)?;
            }
            DragSource::Library(node) => {
                check_fresh_ids(tree, node)?;
                self.mutation.check_placement(
                    tree,
                    node.node_type(),
                    &plan.target_id,
                    plan.position,
                )?;
            }
        }
        Ok(plan)
    }

    /// Carry out an accepted plan; returns the new tree and the id of the dropped node.
    #[instrument(level = "debug", skip(self, tree, source))]
    pub fn apply(
        &self,
        tree: &PageTree,
        source: DragSource,
        plan: &DropPlan,
    ) -> DomainResult<(PageTree, NodeId)> {
        match source {
            DragSource::Library(node) => {
                let id = node.id().clone();
                let next = self
                    .mutation
                    .insert(tree, node, &plan.target_id, plan.position, None)?;
                Ok((next, id))
            }
            DragSource::Existing(id) => {
                let next = self
                    .mutation
                    .move_node(tree, &id, &plan.target_id, plan.position)?;
                Ok((next, id))
            }
        }
    }

    /// Resolve and apply in one step.
    pub fn drop_node(
        &self,
        tree: &PageTree,
        source: DragSource,
        target_id: &NodeId,
        offset_y: f64,
        height: f64,
    ) -> DomainResult<(PageTree, NodeId)> {
        let plan = self.resolve(tree, &source, target_id, offset_y, height)?;
        self.apply(tree, source, &plan)
    }

    /// Middle-band drop on a node without children: go inside the nearest ancestor
    /// that takes children, else fall back to right after the target.
    fn reproject(&self, tree: &PageTree, target_id: &NodeId) -> DropPlan {
        let registry = self.mutation.registry();
        tree.ancestors(target_id)
            .into_iter()
            .find(|ancestor| registry.accepts_children(ancestor.node_type()))
            .map(|ancestor| DropPlan {
                target_id: ancestor.id().clone(),
                position: Position::Inside,
            })
            .unwrap_or_else(|| DropPlan {
                target_id: target_id.clone(),
                position: Position::After,
            })
    }
}

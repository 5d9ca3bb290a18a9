//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::NodeId;

/// Why a placement was refused by the rule registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCause {
    /// The would-be parent has a type the registry does not know.
    UnknownParent,
    /// The would-be parent never holds plain children.
    NoChildren,
    /// The child type is outside the accepted set.
    TypeNotAccepted,
    /// The sequence is already at its maximum size.
    CapacityExceeded,
    /// The named slot is not declared for the parent type.
    SlotNotDeclared,
}

/// Domain errors represent structural rule violations.
/// None of them is fatal: the tree an operation was applied to is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown component type: {0}")]
    UnknownType(String),

    #[error("placement rejected: {message}")]
    PlacementRejected { cause: RejectCause, message: String },

    #[error("target not found: {0}")]
    TargetNotFound(NodeId),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("cannot move {node} into its own descendant {target}")]
    CyclicMove { node: NodeId, target: NodeId },

    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("cannot drop {0} onto itself")]
    SelfDrop(NodeId),

    #[error("tree validation failed with {} error(s)", errors.len())]
    ValidationFailed { errors: Vec<String> },

    #[error("invalid rule registry: {0}")]
    InvalidRegistry(String),
}

impl DomainError {
    pub(crate) fn rejected(cause: RejectCause, message: impl Into<String>) -> Self {
        Self::PlacementRejected {
            cause,
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

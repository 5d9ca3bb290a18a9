//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod entities;
pub mod error;
pub mod rules;
pub mod tree;
pub mod validator;

pub use builder::{clone_with_fresh_ids, NodeBuilder};
pub use entities::*;
pub use error::{DomainError, DomainResult, RejectCause};
pub use rules::{RuleEntry, RuleRegistry, SlotRule};
pub use tree::{Container, Location, PageTree};
pub use validator::{NodePath, ValidationReport, Validator, Violation, ViolationKind};

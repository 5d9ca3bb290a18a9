//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services share the immutable rule registry through an `Arc`
//! but are themselves concrete structs, not traits.

mod drop_resolver;
mod history;
mod mutation;

pub use drop_resolver::{DragSource, DropPlan, DropResolver, DropZones};
pub use history::HistoryManager;
pub use mutation::MutationService;
pub(crate) use mutation::check_fresh_ids;

//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits, page persistence and wires up services.

pub mod di;
pub mod error;
pub mod traits;
pub mod tree_file;

pub use error::{InfraError, InfraResult};
pub use tree_file::TreeFileStore;

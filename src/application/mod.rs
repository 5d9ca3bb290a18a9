//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic: mutation, drop resolution, history and
//! the editing session that ties them together.

pub mod error;
pub mod services;
pub mod session;

pub use error::{ApplicationError, ApplicationResult};
pub use session::{EditorSession, SessionOptions};

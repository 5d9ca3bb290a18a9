//! pagetree: hierarchical tree engine for drag-and-drop page composition.
//!
//! Layers, innermost first:
//! - [`domain`]: nodes, rule registry, tree queries, validation (pure, no I/O)
//! - [`application`]: mutation service, drop resolver, history, editing session
//! - [`infrastructure`]: filesystem, page files, service wiring
//! - [`cli`]: the `pagetree` command line host

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::Position;

/// Hierarchical tree engine for drag-and-drop page composition
#[derive(Parser, Debug)]
#[command(name = "pagetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (repeat for more: -d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding `.pagetree.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where a node lands relative to its target.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionArg {
    Before,
    After,
    Inside,
}

impl From<PositionArg> for Position {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Before => Position::Before,
            PositionArg::After => Position::After,
            PositionArg::Inside => Position::Inside,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a page against the component rules
    Validate {
        /// Page file (JSON array of nodes)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show a page as a tree
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Print full node ids
        #[arg(long)]
        ids: bool,
    },

    /// Print a new node with its default children as JSON
    Create {
        /// Component type
        node_type: String,
        /// Property as KEY=VALUE (VALUE parsed as JSON, else taken as string)
        #[arg(short, long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
        /// Style override as KEY=VALUE
        #[arg(short, long = "style", value_name = "KEY=VALUE")]
        styles: Vec<String>,
    },

    /// Create a node and insert it into a page
    Insert {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Component type
        node_type: String,
        /// Target node (omit to append at root level)
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short, long, value_enum, default_value_t = PositionArg::Inside)]
        position: PositionArg,
        /// Named slot of the target to insert into
        #[arg(long, conflicts_with = "position")]
        slot: Option<String>,
        /// Index within the target's children or slot
        #[arg(short, long)]
        index: Option<usize>,
        #[arg(long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
        #[arg(long = "style", value_name = "KEY=VALUE")]
        styles: Vec<String>,
        /// Write the result back to FILE instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Move a node (with its subtree) next to or into another node
    Move {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Node to move
        node: String,
        #[arg(short, long)]
        target: String,
        #[arg(short, long, value_enum, default_value_t = PositionArg::Inside)]
        position: PositionArg,
        #[arg(short, long)]
        write: bool,
    },

    /// Remove a node and its subtree
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        #[arg(short, long)]
        write: bool,
    },

    /// Copy a node with fresh ids directly after the original
    Duplicate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        #[arg(short, long)]
        write: bool,
    },

    /// Merge properties or style overrides into a node (VALUE null removes the key)
    Update {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        #[arg(long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
        #[arg(long = "style", value_name = "KEY=VALUE")]
        styles: Vec<String>,
        #[arg(short, long)]
        write: bool,
    },

    /// Resolve a pointer drop onto a node and apply it
    #[command(group(ArgGroup::new("source").required(true).args(["node", "new"])))]
    Drop {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Existing node being dragged
        #[arg(long)]
        node: Option<String>,
        /// Component type dragged in from the library
        #[arg(long)]
        new: Option<String>,
        /// Node under the pointer
        #[arg(short, long)]
        target: String,
        /// Pointer offset from the target's top edge
        #[arg(long, allow_negative_numbers = true)]
        offset_y: f64,
        /// Rendered height of the target
        #[arg(long)]
        height: f64,
        /// Only print the resolved placement
        #[arg(long, conflicts_with = "write")]
        dry_run: bool,
        #[arg(short, long)]
        write: bool,
    },

    /// Show component rules
    Rules {
        /// Component type (omit to list all)
        node_type: Option<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a template config file
    Template,
    /// Show config file locations
    Path,
}

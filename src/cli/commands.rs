//! Command dispatch and handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::services::DragSource;
use crate::application::EditorSession;
use crate::cli::args::{Cli, Commands, ConfigCommands, PositionArg};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::tree_view::TreeNodeConvert;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::domain::{DomainError, NodeId, NodePatch, PageTree, PropertyMap, RuleEntry};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::TreeFileStore;

/// Execute the parsed CLI command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `pagetree --help`".to_string(),
        ));
    };

    // Completion needs no settings
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    let settings = Settings::load(Some(&project_dir))?;
    debug!("settings: {:?}", settings);

    if let Commands::Config { command } = command {
        return cmd_config(command, &settings, &project_dir);
    }

    let container = ServiceContainer::new(settings)?;

    match command {
        Commands::Validate { file } => cmd_validate(&container, file),
        Commands::Tree { file, ids } => cmd_tree(&container, file, *ids),
        Commands::Create {
            node_type,
            props,
            styles,
        } => cmd_create(&container, node_type, props, styles),
        Commands::Insert {
            file,
            node_type,
            target,
            position,
            slot,
            index,
            props,
            styles,
            write,
        } => cmd_insert(
            &container,
            file,
            InsertArgs {
                node_type,
                target: target.as_deref(),
                position: *position,
                slot: slot.as_deref(),
                index: *index,
                props,
                styles,
            },
            *write,
        ),
        Commands::Move {
            file,
            node,
            target,
            position,
            write,
        } => cmd_move(&container, file, node, target, *position, *write),
        Commands::Remove { file, node, write } => cmd_remove(&container, file, node, *write),
        Commands::Duplicate { file, node, write } => {
            cmd_duplicate(&container, file, node, *write)
        }
        Commands::Update {
            file,
            node,
            props,
            styles,
            write,
        } => cmd_update(&container, file, node, props, styles, *write),
        Commands::Drop {
            file,
            node,
            new,
            target,
            offset_y,
            height,
            dry_run,
            write,
        } => cmd_drop(
            &container,
            file,
            DropArgs {
                node: node.as_deref(),
                new: new.as_deref(),
                target,
                offset_y: *offset_y,
                height: *height,
            },
            *dry_run,
            *write,
        ),
        Commands::Rules { node_type } => cmd_rules(&container, node_type.as_deref()),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn resolve_project_dir(project_dir: Option<&Path>) -> CliResult<PathBuf> {
    match project_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(crate::infrastructure::InfraError::io("get cwd", e))),
    }
}

// ============================================================
// Helpers
// ============================================================

/// Parse `KEY=VALUE` pairs; VALUE is JSON when it parses, a plain string otherwise.
pub fn parse_assignments(pairs: &[String]) -> CliResult<PropertyMap> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| CliError::InvalidArgs(format!("expected KEY=VALUE, got '{pair}'")))?;
            if key.is_empty() {
                return Err(CliError::InvalidArgs(format!("empty key in '{pair}'")));
            }
            let value =
                serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
            Ok((key.to_string(), value))
        })
        .collect()
}

fn build_patch(props: &[String], styles: &[String]) -> CliResult<NodePatch> {
    Ok(NodePatch {
        properties: parse_assignments(props)?,
        style_overrides: parse_assignments(styles)?,
    })
}

fn ensure_known_type(container: &ServiceContainer, node_type: &str) -> CliResult<()> {
    if container.registry.contains(node_type) {
        Ok(())
    } else {
        Err(DomainError::UnknownType(node_type.to_string()).into())
    }
}

fn open_session(container: &ServiceContainer, file: &Path) -> CliResult<EditorSession> {
    let tree = container.tree_files().load(file)?;
    Ok(container.session(tree))
}

/// Print the tree as JSON, or write it back to `file`.
fn emit(container: &ServiceContainer, file: &Path, tree: &PageTree, write: bool) -> CliResult<()> {
    if write {
        container.tree_files().save(file, tree)?;
        output::action("Wrote", &file.display());
    } else {
        print!("{}", TreeFileStore::to_json(tree)?);
    }
    Ok(())
}

// ============================================================
// Handlers
// ============================================================

#[instrument(skip(container))]
fn cmd_validate(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let tree = container.tree_files().load(file)?;
    let report = container.validator().validate(&tree);
    if report.valid {
        output::success(&format!("{}: valid ({} nodes)", file.display(), tree.len()));
        return Ok(());
    }
    output::header(&format!("{}: {} violation(s)", file.display(), report.errors.len()));
    for violation in &report.errors {
        output::failure(violation);
    }
    Err(DomainError::ValidationFailed {
        errors: report.messages(),
    }
    .into())
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, file: &Path, full_ids: bool) -> CliResult<()> {
    let tree = container.tree_files().load(file)?;
    output::info(&tree.to_tree_string(full_ids));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_create(
    container: &ServiceContainer,
    node_type: &str,
    props: &[String],
    styles: &[String],
) -> CliResult<()> {
    ensure_known_type(container, node_type)?;
    let patch = build_patch(props, styles)?;
    let node = container.mutation().create_node(node_type, Some(&patch));
    let json = serde_json::to_string_pretty(&node)
        .map_err(|e| crate::infrastructure::InfraError::json("serialize node", e))?;
    output::info(&json);
    Ok(())
}

#[derive(Debug)]
struct InsertArgs<'a> {
    node_type: &'a str,
    target: Option<&'a str>,
    position: PositionArg,
    slot: Option<&'a str>,
    index: Option<usize>,
    props: &'a [String],
    styles: &'a [String],
}

#[instrument(skip(container))]
fn cmd_insert(
    container: &ServiceContainer,
    file: &Path,
    args: InsertArgs<'_>,
    write: bool,
) -> CliResult<()> {
    ensure_known_type(container, args.node_type)?;
    let patch = build_patch(args.props, args.styles)?;
    let mut session = open_session(container, file)?;
    let node = session.create_node(args.node_type, Some(&patch));

    let id = match (args.target, args.slot) {
        (None, Some(_)) => {
            return Err(CliError::InvalidArgs(
                "--slot requires --target".to_string(),
            ))
        }
        (None, None) => session.insert_root(node, args.index)?,
        (Some(target), Some(slot)) => {
            session.insert_into_slot(node, &NodeId::from(target), slot, args.index)?
        }
        (Some(target), None) => session.insert(
            node,
            &NodeId::from(target),
            args.position.into(),
            args.index,
        )?,
    };
    output::action("Inserted", &format!("{} [{}]", args.node_type, id));
    emit(container, file, session.tree(), write)
}

#[instrument(skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    file: &Path,
    node: &str,
    target: &str,
    position: PositionArg,
    write: bool,
) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    session.move_node(&NodeId::from(node), &NodeId::from(target), position.into())?;
    emit(container, file, session.tree(), write)
}

#[instrument(skip(container))]
fn cmd_remove(container: &ServiceContainer, file: &Path, node: &str, write: bool) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    if !session.remove(&NodeId::from(node)) {
        output::warning(&format!("node {node} not found, nothing removed"));
    }
    emit(container, file, session.tree(), write)
}

#[instrument(skip(container))]
fn cmd_duplicate(
    container: &ServiceContainer,
    file: &Path,
    node: &str,
    write: bool,
) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    let copy = session.duplicate(&NodeId::from(node))?;
    output::action("Duplicated", &format!("{node} as {copy}"));
    emit(container, file, session.tree(), write)
}

#[instrument(skip(container))]
fn cmd_update(
    container: &ServiceContainer,
    file: &Path,
    node: &str,
    props: &[String],
    styles: &[String],
    write: bool,
) -> CliResult<()> {
    let patch = build_patch(props, styles)?;
    if patch.is_empty() {
        return Err(CliError::InvalidArgs(
            "nothing to update, pass --prop or --style".to_string(),
        ));
    }
    let mut session = open_session(container, file)?;
    let id = NodeId::from(node);
    if session.tree().find_by_id(&id).is_none() {
        return Err(DomainError::NodeNotFound(id).into());
    }
    if !session.update(&id, &patch) {
        output::warning(&format!("node {node} already up to date"));
    }
    emit(container, file, session.tree(), write)
}

#[derive(Debug)]
struct DropArgs<'a> {
    node: Option<&'a str>,
    new: Option<&'a str>,
    target: &'a str,
    offset_y: f64,
    height: f64,
}

#[instrument(skip(container))]
fn cmd_drop(
    container: &ServiceContainer,
    file: &Path,
    args: DropArgs<'_>,
    dry_run: bool,
    write: bool,
) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    let source = match (args.node, args.new) {
        (Some(id), _) => DragSource::Existing(NodeId::from(id)),
        (None, Some(node_type)) => {
            ensure_known_type(container, node_type)?;
            DragSource::Library(session.create_node(node_type, None))
        }
        (None, None) => {
            return Err(CliError::InvalidArgs(
                "one of --node or --new is required".to_string(),
            ))
        }
    };
    let target = NodeId::from(args.target);

    if dry_run {
        let plan = session.resolve_drop(&source, &target, args.offset_y, args.height)?;
        output::info(&format!("{} {}", plan.position, plan.target_id));
        return Ok(());
    }

    let id = session.drop_node(source, &target, args.offset_y, args.height)?;
    output::action("Dropped", &id);
    emit(container, file, session.tree(), write)
}

#[instrument(skip(container))]
fn cmd_rules(container: &ServiceContainer, node_type: Option<&str>) -> CliResult<()> {
    let registry = &container.registry;
    match node_type {
        Some(name) => {
            let entry = registry
                .get(name)
                .ok_or_else(|| DomainError::UnknownType(name.to_string()))?;
            output::header(name);
            print_rule(entry);
        }
        None => {
            output::header(&format!("{} component types", registry.len()));
            for name in registry.known_types() {
                let kind = match registry.get(name) {
                    Some(e) if e.slot_rules.is_some() => "slotted",
                    Some(e) if e.accepts_children => "container",
                    _ => "leaf",
                };
                output::detail(&format!("{name:<16} {kind}"));
            }
        }
    }
    Ok(())
}

fn print_rule(entry: &RuleEntry) {
    output::detail(&format!("accepts children: {}", entry.accepts_children));
    if let Some(types) = &entry.accepted_child_types {
        output::detail(&format!("accepted types:   {}", types.iter().join(", ")));
    }
    let bound = |b: Option<usize>| b.map_or_else(|| "-".to_string(), |n| n.to_string());
    output::detail(&format!(
        "children:         min {} / max {}",
        bound(entry.min_children),
        bound(entry.max_children)
    ));
    if !entry.default_children.is_empty() {
        output::detail(&format!("defaults:         {}", entry.default_children.join(", ")));
    }
    if let Some(slots) = &entry.slot_rules {
        for (name, rule) in slots {
            let accepts = rule
                .accepted_types
                .as_ref()
                .map_or_else(|| "any".to_string(), |t| t.iter().join(", "));
            output::detail(&format!(
                "slot #{name}: accepts {accepts}, max {}{}",
                bound(rule.max_count),
                if rule.required { ", required" } else { "" }
            ));
        }
    }
}

fn cmd_config(command: &ConfigCommands, settings: &Settings, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => {
            print!("{}", Settings::template());
        }
        ConfigCommands::Path => {
            let mark = |p: &Path| if p.exists() { "(exists)" } else { "(not found)" };
            match global_config_path() {
                Some(p) => output::info(&format!("global:  {} {}", p.display(), mark(&p))),
                None => output::info("global:  (no config directory)"),
            }
            let local = project_config_path(project_dir);
            output::info(&format!("project: {} {}", local.display(), mark(&local)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_assignments_when_parsed_then_json_or_string_values() {
        let pairs = vec![
            "level=2".to_string(),
            "text=Hello world".to_string(),
            "visible=true".to_string(),
            "gone=null".to_string(),
        ];
        let map = parse_assignments(&pairs).expect("parse");
        assert_eq!(map["level"], json!(2));
        assert_eq!(map["text"], json!("Hello world"));
        assert_eq!(map["visible"], json!(true));
        assert_eq!(map["gone"], Value::Null);
    }

    #[test]
    fn given_missing_equals_when_parsed_then_invalid_args() {
        let err = parse_assignments(&["level".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgs(_)));
    }
}

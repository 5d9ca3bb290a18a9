//! Tests for page persistence and the service container wiring.

use std::fs;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use pagetree::config::Settings;
use pagetree::domain::{DomainError, Node, NodeId, PageTree};
use pagetree::infrastructure::di::ServiceContainer;
use pagetree::infrastructure::traits::RealFileSystem;
use pagetree::infrastructure::{InfraError, TreeFileStore};
use pagetree::application::ApplicationError;

fn store() -> TreeFileStore {
    TreeFileStore::new(Arc::new(RealFileSystem))
}

#[test]
fn given_page_when_saved_and_loaded_then_equal() {
    // Arrange
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pages/home.json");
    let tree = PageTree::from_roots(vec![Node::new("s", "section")
        .with_child(Node::new("h", "heading").with_property("text", "Hi"))
        .with_style("padding", "2rem")]);

    // Act
    store().save(&path, &tree).expect("save");
    let loaded = store().load(&path).expect("load");

    // Assert
    assert_eq!(loaded, tree);
}

#[test]
fn given_saved_page_when_read_raw_then_wire_format_is_camel_case_array() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("page.json");
    let tree = PageTree::from_roots(vec![Node::new("b", "button").with_style("color", "red")]);

    store().save(&path, &tree).expect("save");
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(
        raw,
        json!([{ "id": "b", "type": "button", "styleOverrides": { "color": "red" } }])
    );
}

#[test]
fn given_slotted_json_when_loaded_then_slots_preserved() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("page.json");
    fs::write(
        &path,
        r#"[{"id":"i","type":"accordionItem","slots":{"header":[{"id":"h","type":"heading"}],"content":[]}}]"#,
    )
    .unwrap();

    let tree = store().load(&path).expect("load");

    let item = tree.find_by_id(&NodeId::from("i")).expect("item");
    assert_eq!(item.slot("header").len(), 1);
    assert!(item.slot("content").is_empty());
}

#[test]
fn given_missing_file_when_loaded_then_io_error() {
    let tmp = TempDir::new().unwrap();

    let err = store().load(&tmp.path().join("nope.json")).unwrap_err();

    assert!(matches!(err, InfraError::Io { .. }));
}

#[test]
fn given_garbage_when_loaded_then_serialization_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("page.json");
    fs::write(&path, "{ not json").unwrap();

    let err = store().load(&path).unwrap_err();

    assert!(matches!(err, InfraError::Serialization { .. }));
}

// ============================================================
// ServiceContainer
// ============================================================

#[test]
fn given_rules_file_and_disabled_types_when_container_built_then_registry_adjusted() {
    // Arrange
    let tmp = TempDir::new().unwrap();
    let rules = tmp.path().join("rules.toml");
    fs::write(
        &rules,
        r#"
[types.banner]
accepts_children = true
accepted_child_types = ["heading", "text"]
max_children = 2
"#,
    )
    .unwrap();
    let settings = Settings {
        rules_file: Some(rules),
        disabled_types: vec!["video".into()],
        ..Settings::default()
    };

    // Act
    let container = ServiceContainer::new(settings).expect("container");

    // Assert
    assert!(container.registry.can_add_child("banner", "heading"));
    assert!(!container.registry.can_add_more_children("banner", 2));
    assert!(!container.registry.contains("video"));
}

#[test]
fn given_rules_referencing_unknown_type_when_container_built_then_invalid_registry() {
    let tmp = TempDir::new().unwrap();
    let rules = tmp.path().join("rules.toml");
    fs::write(
        &rules,
        r#"
[types.banner]
accepts_children = true
accepted_child_types = ["marquee"]
"#,
    )
    .unwrap();
    let settings = Settings {
        rules_file: Some(rules),
        ..Settings::default()
    };

    let err = ServiceContainer::new(settings).err().expect("must fail");

    assert!(matches!(
        err,
        InfraError::Application(ApplicationError::Domain(DomainError::InvalidRegistry(_)))
    ));
}

//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Project: scalars override, `disabled_types` UNION with `!negation`
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests pass explicit global paths (temp directories only),
//! so the developer's own config never leaks in.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use pagetree::application::services::DropZones;
use pagetree::config::Settings;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn given_project_config_when_load_then_overrides_defaults() {
    // Arrange
    let project = TempDir::new().unwrap();
    write(
        &project,
        ".pagetree.toml",
        r#"
history_limit = 50
disabled_types = ["video"]

[drop_zones]
before = 0.25
after = 0.75
"#,
    );

    // Act
    let settings = Settings::load_from(None, Some(project.path())).expect("load settings");

    // Assert
    assert_eq!(settings.history_limit, Some(50));
    assert_eq!(settings.disabled_types, vec!["video".to_string()]);
    assert_eq!(settings.drop_zones, DropZones { before: 0.25, after: 0.75 });
}

#[test]
fn given_global_and_project_when_load_then_disabled_types_union_with_negation() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let global = write(
        &global_dir,
        "pagetree.toml",
        r#"
disabled_types = ["video", "modal"]
history_limit = 10
"#,
    );
    let project = TempDir::new().unwrap();
    write(
        &project,
        ".pagetree.toml",
        r#"disabled_types = ["!modal", "navbar"]"#,
    );

    // Act
    let settings = Settings::load_from(Some(global.as_path()), Some(project.path())).expect("load");

    // Assert
    assert_eq!(
        settings.disabled_types,
        vec!["navbar".to_string(), "video".to_string()]
    );
    assert_eq!(settings.history_limit, Some(10), "global scalar kept");
}

#[test]
fn given_relative_rules_file_when_load_then_resolved_against_project_dir() {
    let project = TempDir::new().unwrap();
    write(&project, ".pagetree.toml", r#"rules_file = "rules/site.toml""#);

    let settings = Settings::load_from(None, Some(project.path())).expect("load");

    assert_eq!(
        settings.rules_file,
        Some(project.path().join("rules/site.toml"))
    );
}

#[test]
fn given_inverted_drop_zones_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    write(
        &project,
        ".pagetree.toml",
        r#"
[drop_zones]
before = 0.9
after = 0.1
"#,
    );

    let err = Settings::load_from(None, Some(project.path())).unwrap_err();

    assert!(err.to_string().contains("drop_zones"));
}

#[test]
fn given_malformed_toml_when_load_then_config_error_names_file() {
    let project = TempDir::new().unwrap();
    write(&project, ".pagetree.toml", "history_limit = [");

    let err = Settings::load_from(None, Some(project.path())).unwrap_err();

    assert!(err.to_string().contains(".pagetree.toml"));
}

#[test]
fn given_settings_when_to_toml_then_roundtrips_through_loader() {
    // Arrange
    let settings = Settings {
        history_limit: Some(42),
        disabled_types: vec!["video".into()],
        ..Settings::default()
    };
    let project = TempDir::new().unwrap();
    write(&project, ".pagetree.toml", &settings.to_toml().expect("toml"));

    // Act
    let loaded = Settings::load_from(None, Some(project.path())).expect("load");

    // Assert
    assert_eq!(loaded, settings);
}

//! Rule registry: built-in table, TOML overlays, disabling types.

use rstest::rstest;

use pagetree::domain::{DomainError, RuleRegistry};

#[rstest]
#[case("row", "column", true)]
#[case("row", "text", false)]
#[case("grid", "gridItem", true)]
#[case("card", "tab", false)]
#[case("card", "heading", true)]
#[case("form", "input", true)]
#[case("form", "section", false)]
#[case("section", "anything", true)]
#[case("text", "text", false)]
#[case("unknown", "text", false)]
fn given_builtin_when_can_add_child_then_matches_table(
    #[case] parent: &str,
    #[case] child: &str,
    #[case] expected: bool,
) {
    assert_eq!(RuleRegistry::builtin().can_add_child(parent, child), expected);
}

#[test]
fn given_builtin_when_listing_defaults_then_structural_types_prefilled() {
    let registry = RuleRegistry::builtin();

    assert_eq!(registry.default_children_types("row"), ["column", "column"]);
    assert_eq!(registry.default_children_types("tabs"), ["tab", "tab"]);
    assert!(registry.default_children_types("form").is_empty());
    assert!(registry.default_children_types("nope").is_empty());
}

#[test]
fn given_builtin_when_checking_minimum_then_accordion_needs_one_item() {
    let registry = RuleRegistry::builtin();

    assert!(!registry.has_minimum_children("accordion", 0));
    assert!(registry.has_minimum_children("accordion", 1));
    assert!(registry.has_minimum_children("section", 0));
}

#[test]
fn given_toml_table_with_slots_when_parsed_then_slot_rules_available() {
    // Arrange
    let content = r#"
[types.text]

[types.panel]
accepts_children = true
max_children = 3

[types.panel.slots.title]
accepted_types = ["text"]
max_count = 1
required = true
"#;

    // Act
    let registry = RuleRegistry::from_toml_str(content).expect("valid table");

    // Assert
    let rule = registry.slot_rule("panel", "title").expect("title slot");
    assert!(rule.required);
    assert!(rule.accepts("text"));
    assert!(!rule.accepts("panel"));
    assert!(registry.can_add_more_children("panel", 2));
    assert!(!registry.can_add_more_children("panel", 3));
}

#[test]
fn given_default_children_cycle_when_building_then_invalid_registry() {
    let content = r#"
[types.a]
accepts_children = true
default_children = ["b"]

[types.b]
accepts_children = true
default_children = ["a"]
"#;

    let err = RuleRegistry::from_toml_str(content).unwrap_err();

    match err {
        DomainError::InvalidRegistry(msg) => assert!(msg.contains("cycle")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn given_disabled_type_when_removed_then_scrubbed_everywhere() {
    let registry = RuleRegistry::builtin()
        .without_types(&["video".to_string(), "icon".to_string()])
        .expect("still consistent");

    assert!(!registry.contains("video"));
    assert!(!registry.can_add_child("card", "video"));
    assert!(!registry
        .slot_rule("accordionItem", "header")
        .expect("header")
        .accepts("icon"));
}

#[test]
fn given_override_when_applied_then_replaces_builtin_entry() {
    let overrides = RuleRegistry::parse_table(
        r#"
[types.card]
accepts_children = true
accepted_child_types = ["text"]
"#,
    )
    .expect("parse");

    let registry = RuleRegistry::builtin().with_overrides(overrides).expect("valid");

    assert!(registry.can_add_child("card", "text"));
    assert!(!registry.can_add_child("card", "heading"));
    assert_eq!(registry.len(), RuleRegistry::builtin().len());
}

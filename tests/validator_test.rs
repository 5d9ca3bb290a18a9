//! Validator scenarios over realistic pages.

use std::sync::Arc;

use pagetree::domain::{
    DomainError, Node, PageTree, RuleRegistry, ValidationReport, Validator, ViolationKind,
};

fn validate(roots: Vec<Node>) -> ValidationReport {
    Validator::new(Arc::new(RuleRegistry::builtin())).validate(&PageTree::from_roots(roots))
}

fn two_columns_row(id: &str) -> Node {
    Node::new(id, "row")
        .with_child(Node::new(format!("{id}-c1"), "column"))
        .with_child(Node::new(format!("{id}-c2"), "column"))
}

#[test]
fn given_empty_page_when_validating_then_valid() {
    let report = validate(vec![]);
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

#[test]
fn given_well_formed_page_when_validating_then_valid() {
    // Arrange
    let page = vec![
        Node::new("hero", "hero")
            .with_child(Node::new("h1", "heading").with_property("text", "Welcome"))
            .with_child(Node::new("t1", "text")),
        Node::new("section", "section").with_child(two_columns_row("row")),
        Node::new("form", "form")
            .with_child(Node::new("email", "input"))
            .with_child(Node::new("send", "button")),
    ];

    // Act
    let report = validate(page);

    // Assert
    assert!(report.valid, "unexpected errors: {:?}", report.messages());
}

#[test]
fn given_accordion_item_without_header_when_validating_then_exactly_one_error() {
    // Arrange: header slot is required, content is optional
    let item = Node::new("item", "accordionItem")
        .with_slot("header", vec![])
        .with_slot("content", vec![Node::new("t", "text")]);
    let page = vec![Node::new("acc", "accordion").with_child(item)];

    // Act
    let report = validate(page);

    // Assert
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    let violation = &report.errors[0];
    assert_eq!(violation.kind, ViolationKind::MissingRequiredSlot);
    assert_eq!(violation.node_id.as_str(), "item");
    assert_eq!(violation.path.to_string(), "root[0].children[0]");
}

#[test]
fn given_card_with_tab_when_validating_then_child_type_error_at_child_path() {
    let page = vec![Node::new("card", "card")
        .with_child(Node::new("h", "heading"))
        .with_child(Node::new("tab", "tab"))];

    let report = validate(page);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ViolationKind::ChildTypeNotAccepted);
    assert_eq!(report.errors[0].path.to_string(), "root[0].children[1]");
    assert!(report.errors[0].message.contains("card"));
}

#[test]
fn given_row_over_capacity_when_validating_then_too_many_children() {
    let mut row = Node::new("row", "row");
    for i in 0..13 {
        row = row.with_child(Node::new(format!("c{i}"), "column"));
    }

    let report = validate(vec![row]);

    let kinds: Vec<_> = report.errors.iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::TooManyChildren]);
}

#[test]
fn given_empty_tabs_when_validating_then_too_few_children() {
    let report = validate(vec![Node::new("tabs", "tabs")]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ViolationKind::TooFewChildren);
}

#[test]
fn given_nested_violations_when_validating_then_reported_in_pre_order() {
    // Arrange: bad slot content deep inside, plus an unknown root after it
    let modal = Node::new("modal", "modal")
        .with_slot("body", vec![Node::new("b", "text")])
        .with_slot(
            "footer",
            vec![Node::new("img", "image")],
        );
    let page = vec![
        Node::new("s", "section").with_child(modal),
        Node::new("x", "carousel"),
    ];

    // Act
    let report = validate(page);

    // Assert
    let paths: Vec<_> = report.errors.iter().map(|v| v.path.to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "root[0].children[0].slots.footer[0]".to_string(),
            "root[1]".to_string(),
        ]
    );
    assert_eq!(report.errors[0].kind, ViolationKind::SlotTypeNotAccepted);
    assert_eq!(report.errors[1].kind, ViolationKind::UnknownType);
}

#[test]
fn given_modal_footer_over_capacity_when_validating_then_slot_over_capacity() {
    // Arrange: footer holds at most 3 nodes
    let buttons = (0..4).map(|i| Node::new(format!("btn{i}"), "button")).collect();
    let modal = Node::new("modal", "modal")
        .with_slot("body", vec![Node::new("b", "text")])
        .with_slot("footer", buttons);

    // Act
    let report = validate(vec![modal]);

    // Assert
    assert_eq!(report.errors.len(), 1);
    let violation = &report.errors[0];
    assert_eq!(violation.kind, ViolationKind::SlotOverCapacity);
    assert_eq!(violation.node_id.as_str(), "modal");
    assert_eq!(violation.path.to_string(), "root[0]");
    assert!(violation.message.contains("footer"));
}

#[test]
fn given_id_used_twice_when_validating_then_second_occurrence_reported() {
    let page = vec![
        Node::new("s", "section").with_child(Node::new("t", "text")),
        Node::new("t", "text"),
    ];

    let report = validate(page);

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ViolationKind::DuplicateId);
    assert_eq!(report.errors[0].path.to_string(), "root[1]");
}

#[test]
fn given_content_in_undeclared_slot_when_validating_then_slot_not_declared() {
    // Arrange: an empty undeclared slot is harmless
    let page = vec![
        Node::new("t", "text").with_slot("bogus", vec![Node::new("v", "video")]),
        Node::new("t2", "text").with_slot("extra", vec![]),
    ];

    // Act
    let report = validate(page);

    // Assert
    assert_eq!(report.errors.len(), 1);
    let violation = &report.errors[0];
    assert_eq!(violation.kind, ViolationKind::SlotNotDeclared);
    assert_eq!(violation.path.to_string(), "root[0]");
    assert!(violation.message.contains("bogus"));
}

#[test]
fn given_invalid_report_when_into_result_then_validation_failed_with_messages() {
    let report = validate(vec![Node::new("x", "carousel")]);

    let err = report.into_result().unwrap_err();

    match err {
        DomainError::ValidationFailed { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("root[0]: "));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

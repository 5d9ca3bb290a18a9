//! Rule registry: per-type structural capabilities.
//!
//! Built once at startup (compiled table, optionally overlaid with a TOML rule
//! file) and shared read-only by the validator, mutation service and drop resolver.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

/// Constraints on one named slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotRule {
    /// `None` accepts any type
    pub accepted_types: Option<BTreeSet<String>>,
    pub max_count: Option<usize>,
    pub required: bool,
}

impl SlotRule {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn accepting(types: &[&str]) -> Self {
        Self {
            accepted_types: Some(types.iter().map(|t| t.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn max(mut self, count: usize) -> Self {
        self.max_count = Some(count);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn accepts(&self, child_type: &str) -> bool {
        self.accepted_types
            .as_ref()
            .map_or(true, |set| set.contains(child_type))
    }
}

/// Structural configuration of one component type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEntry {
    pub accepts_children: bool,
    /// `None` accepts any type
    pub accepted_child_types: Option<BTreeSet<String>>,
    pub min_children: Option<usize>,
    pub max_children: Option<usize>,
    #[serde(rename = "slots")]
    pub slot_rules: Option<BTreeMap<String, SlotRule>>,
    pub default_children: Vec<String>,
}

impl RuleEntry {
    /// Type that never holds children.
    pub fn leaf() -> Self {
        Self::default()
    }

    /// Type that holds children of any type.
    pub fn container() -> Self {
        Self {
            accepts_children: true,
            ..Self::default()
        }
    }

    pub fn accepting(mut self, types: &[&str]) -> Self {
        self.accepts_children = true;
        self.accepted_child_types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn min(mut self, count: usize) -> Self {
        self.min_children = Some(count);
        self
    }

    pub fn max(mut self, count: usize) -> Self {
        self.max_children = Some(count);
        self
    }

    pub fn defaults(mut self, types: &[&str]) -> Self {
        self.default_children = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn slot(mut self, name: &str, rule: SlotRule) -> Self {
        self.slot_rules
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), rule);
        self
    }
}

/// On-disk shape of a rule file: `[types.<name>]` tables.
#[derive(Debug, Default, Deserialize)]
struct RuleTable {
    #[serde(default)]
    types: BTreeMap<String, RuleEntry>,
}

/// Immutable lookup table from type tag to [`RuleEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRegistry {
    entries: BTreeMap<String, RuleEntry>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleRegistry {
    /// Build a registry, rejecting tables that reference unknown types or whose
    /// default children could never be materialized.
    pub fn new(entries: BTreeMap<String, RuleEntry>) -> DomainResult<Self> {
        let registry = Self { entries };
        registry.check()?;
        Ok(registry)
    }

    /// The compiled page-builder component table.
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }

    /// Parse a TOML rule table into entries.
    pub fn parse_table(content: &str) -> DomainResult<BTreeMap<String, RuleEntry>> {
        let table: RuleTable = toml::from_str(content)
            .map_err(|e| DomainError::InvalidRegistry(format!("parse rule table: {e}")))?;
        Ok(table.types)
    }

    /// Registry made of exactly the entries in a TOML rule table.
    pub fn from_toml_str(content: &str) -> DomainResult<Self> {
        Self::new(Self::parse_table(content)?)
    }

    /// Replace or add entries, then re-check the whole table.
    #[instrument(level = "debug", skip(self, overrides))]
    pub fn with_overrides(self, overrides: BTreeMap<String, RuleEntry>) -> DomainResult<Self> {
        let mut entries = self.entries;
        for (name, entry) in overrides {
            debug!("rule override: {}", name);
            entries.insert(name, entry);
        }
        Self::new(entries)
    }

    /// Drop types entirely, scrubbing them from every accepted set and default list.
    #[instrument(level = "debug", skip(self))]
    pub fn without_types(self, disabled: &[String]) -> DomainResult<Self> {
        if disabled.is_empty() {
            return Ok(self);
        }
        let disabled: HashSet<&str> = disabled.iter().map(String::as_str).collect();
        let mut entries = self.entries;
        entries.retain(|name, _| !disabled.contains(name.as_str()));
        for entry in entries.values_mut() {
            if let Some(set) = entry.accepted_child_types.as_mut() {
                set.retain(|t| !disabled.contains(t.as_str()));
            }
            entry
                .default_children
                .retain(|t| !disabled.contains(t.as_str()));
            for rule in entry.slot_rules.iter_mut().flat_map(|s| s.values_mut()) {
                if let Some(set) = rule.accepted_types.as_mut() {
                    set.retain(|t| !disabled.contains(t.as_str()));
                }
            }
        }
        Self::new(entries)
    }

    pub fn get(&self, node_type: &str) -> Option<&RuleEntry> {
        self.entries.get(node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    pub fn known_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// False for unknown types.
    pub fn accepts_children(&self, node_type: &str) -> bool {
        self.get(node_type).is_some_and(|e| e.accepts_children)
    }

    pub fn accepted_child_types(&self, node_type: &str) -> Option<&BTreeSet<String>> {
        self.get(node_type)?.accepted_child_types.as_ref()
    }

    pub fn can_add_child(&self, parent_type: &str, child_type: &str) -> bool {
        match self.get(parent_type) {
            Some(entry) if entry.accepts_children => entry
                .accepted_child_types
                .as_ref()
                .map_or(true, |set| set.contains(child_type)),
            _ => false,
        }
    }

    /// True while one more child still fits under `maxChildren`.
    pub fn can_add_more_children(&self, parent_type: &str, current_count: usize) -> bool {
        self.get(parent_type)
            .and_then(|e| e.max_children)
            .map_or(true, |max| current_count < max)
    }

    pub fn has_minimum_children(&self, parent_type: &str, current_count: usize) -> bool {
        self.get(parent_type)
            .and_then(|e| e.min_children)
            .map_or(true, |min| current_count >= min)
    }

    pub fn default_children_types(&self, node_type: &str) -> &[String] {
        self.get(node_type)
            .map(|e| e.default_children.as_slice())
            .unwrap_or(&[])
    }

    pub fn slot_rules(&self, node_type: &str) -> Option<&BTreeMap<String, SlotRule>> {
        self.get(node_type)?.slot_rules.as_ref()
    }

    pub fn slot_rule(&self, node_type: &str, slot: &str) -> Option<&SlotRule> {
        self.slot_rules(node_type)?.get(slot)
    }

    /// Human-readable reason why `child_type` cannot go under `parent_type`.
    /// Diagnostics only; never branch on the text.
    pub fn error_message(&self, parent_type: &str, child_type: &str) -> String {
        match self.get(parent_type) {
            None => format!("unknown parent type \"{parent_type}\""),
            Some(entry) if !entry.accepts_children => {
                format!("\"{parent_type}\" cannot contain children")
            }
            Some(entry) => match &entry.accepted_child_types {
                Some(set) if !set.contains(child_type) => format!(
                    "\"{parent_type}\" does not accept \"{child_type}\"; accepted types: {}",
                    set.iter().join(", ")
                ),
                _ => format!("\"{child_type}\" can be placed in \"{parent_type}\""),
            },
        }
    }

    pub fn capacity_message(&self, parent_type: &str) -> String {
        match self.get(parent_type).and_then(|e| e.max_children) {
            Some(max) => format!("\"{parent_type}\" allows at most {max} children"),
            None => format!("\"{parent_type}\" has no child limit"),
        }
    }

    pub fn slot_message(&self, parent_type: &str, slot: &str, child_type: &str) -> String {
        match self.slot_rule(parent_type, slot) {
            None => format!("\"{parent_type}\" has no slot \"{slot}\""),
            Some(rule) => match &rule.accepted_types {
                Some(set) if !set.contains(child_type) => format!(
                    "slot \"{slot}\" of \"{parent_type}\" does not accept \"{child_type}\"; accepted types: {}",
                    set.iter().join(", ")
                ),
                _ => match rule.max_count {
                    Some(max) => {
                        format!("slot \"{slot}\" of \"{parent_type}\" holds at most {max} node(s)")
                    }
                    None => format!("\"{child_type}\" can be placed in slot \"{slot}\""),
                },
            },
        }
    }

    fn check(&self) -> DomainResult<()> {
        for (name, entry) in &self.entries {
            let referenced = entry
                .accepted_child_types
                .iter()
                .flatten()
                .chain(entry.default_children.iter())
                .chain(
                    entry
                        .slot_rules
                        .iter()
                        .flat_map(|s| s.values())
                        .flat_map(|r| r.accepted_types.iter().flatten()),
                );
            for child in referenced {
                if !self.contains(child) {
                    return Err(invalid(format!("\"{name}\" references unknown type \"{child}\"")));
                }
            }

            if let (Some(min), Some(max)) = (entry.min_children, entry.max_children) {
                if min > max {
                    return Err(invalid(format!(
                        "\"{name}\" has min_children {min} > max_children {max}"
                    )));
                }
            }
            if !entry.accepts_children
                && (entry.min_children.is_some_and(|m| m > 0) || !entry.default_children.is_empty())
            {
                return Err(invalid(format!(
                    "\"{name}\" requires children but does not accept them"
                )));
            }
            for child in &entry.default_children {
                if !self.can_add_child(name, child) {
                    return Err(invalid(format!(
                        "default child \"{child}\" is not accepted by \"{name}\""
                    )));
                }
            }
            if entry
                .max_children
                .is_some_and(|max| entry.default_children.len() > max)
            {
                return Err(invalid(format!(
                    "\"{name}\" has more default children than max_children"
                )));
            }
        }
        self.check_default_cycles()
    }

    /// Default-children expansion must terminate.
    fn check_default_cycles(&self) -> DomainResult<()> {
        let mut done: HashSet<&str> = HashSet::new();
        for name in self.entries.keys() {
            let mut visiting = Vec::new();
            self.visit_defaults(name, &mut visiting, &mut done)?;
        }
        Ok(())
    }

    fn visit_defaults<'a>(
        &'a self,
        name: &'a str,
        visiting: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> DomainResult<()> {
        if done.contains(name) {
            return Ok(());
        }
        if visiting.contains(&name) {
            visiting.push(name);
            return Err(invalid(format!(
                "default children form a cycle: {}",
                visiting.iter().join(" -> ")
            )));
        }
        visiting.push(name);
        for child in self.default_children_types(name) {
            self.visit_defaults(child, visiting, done)?;
        }
        visiting.pop();
        done.insert(name);
        Ok(())
    }
}

fn invalid(message: String) -> DomainError {
    DomainError::InvalidRegistry(message)
}

fn builtin_entries() -> BTreeMap<String, RuleEntry> {
    const INLINE: &[&str] = &["heading", "text", "icon"];
    let entries = [
        ("section", RuleEntry::container()),
        ("container", RuleEntry::container()),
        ("row", RuleEntry::leaf().accepting(&["column"]).min(1).max(12).defaults(&["column", "column"])),
        ("column", RuleEntry::container()),
        ("grid", RuleEntry::leaf().accepting(&["gridItem"]).min(1).max(24).defaults(&["gridItem", "gridItem"])),
        ("gridItem", RuleEntry::container()),
        (
            "card",
            RuleEntry::leaf().accepting(&[
                "heading", "text", "image", "video", "button", "link", "list", "divider", "spacer", "icon",
            ]),
        ),
        ("tabs", RuleEntry::leaf().accepting(&["tab"]).min(1).max(10).defaults(&["tab", "tab"])),
        ("tab", RuleEntry::container()),
        ("accordion", RuleEntry::leaf().accepting(&["accordionItem"]).min(1).defaults(&["accordionItem"])),
        (
            "accordionItem",
            RuleEntry::leaf()
                .slot("header", SlotRule::accepting(INLINE).max(1).required())
                .slot("content", SlotRule::any()),
        ),
        (
            "form",
            RuleEntry::leaf().accepting(&[
                "input", "textarea", "select", "checkbox", "button", "text", "heading", "divider", "spacer", "row",
            ]),
        ),
        ("input", RuleEntry::leaf()),
        ("textarea", RuleEntry::leaf()),
        ("select", RuleEntry::leaf()),
        ("checkbox", RuleEntry::leaf()),
        ("button", RuleEntry::leaf()),
        ("text", RuleEntry::leaf()),
        ("heading", RuleEntry::leaf()),
        ("image", RuleEntry::leaf()),
        ("video", RuleEntry::leaf()),
        ("link", RuleEntry::leaf()),
        ("list", RuleEntry::leaf().accepting(&["listItem"]).defaults(&["listItem"])),
        ("listItem", RuleEntry::leaf().accepting(&["text", "link", "icon", "image", "list"])),
        ("divider", RuleEntry::leaf()),
        ("spacer", RuleEntry::leaf()),
        ("icon", RuleEntry::leaf()),
        ("navbar", RuleEntry::leaf().accepting(&["link", "button", "image", "icon", "text", "list"]).max(20)),
        ("footer", RuleEntry::container()),
        ("hero", RuleEntry::container().defaults(&["heading", "text", "button"])),
        (
            "modal",
            RuleEntry::leaf()
                .slot("header", SlotRule::accepting(INLINE).max(1))
                .slot("body", SlotRule::any().required())
                .slot("footer", SlotRule::accepting(&["button", "link", "text"]).max(3)),
        ),
    ];
    entries
        .into_iter()
        .map(|(name, entry)| (name.to_string(), entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn given_builtin_table_when_checked_then_is_consistent() {
        RuleRegistry::builtin().check().expect("builtin table must pass its own checks");
    }

    #[rstest]
    #[case("gridItem", "form", true)]
    #[case("card", "tab", false)]
    #[case("text", "text", false)]
    #[case("unknown", "text", false)]
    #[case("tabs", "tab", true)]
    #[case("section", "anything", true)]
    fn given_parent_and_child_when_can_add_child_then_matches_rules(
        #[case] parent: &str,
        #[case] child: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(RuleRegistry::builtin().can_add_child(parent, child), expected);
    }

    #[rstest]
    #[case("tabs", 9, true)]
    #[case("tabs", 10, false)]
    #[case("section", 10_000, true)]
    fn given_count_when_can_add_more_children_then_respects_max(
        #[case] parent: &str,
        #[case] count: usize,
        #[case] expected: bool,
    ) {
        assert_eq!(RuleRegistry::builtin().can_add_more_children(parent, count), expected);
    }

    #[test]
    fn given_rejected_child_when_error_message_then_lists_accepted_types() {
        let msg = RuleRegistry::builtin().error_message("card", "tab");
        assert!(msg.contains("does not accept \"tab\""), "{msg}");
        assert!(msg.contains("heading"), "{msg}");
    }

    #[test]
    fn given_leaf_parent_when_error_message_then_says_no_children() {
        let msg = RuleRegistry::builtin().error_message("text", "heading");
        assert_eq!(msg, "\"text\" cannot contain children");
        let msg = RuleRegistry::builtin().error_message("nope", "heading");
        assert!(msg.contains("unknown parent type"));
    }

    #[test]
    fn given_cyclic_defaults_when_building_then_rejects() {
        let mut entries = BTreeMap::new();
        entries.insert("a".into(), RuleEntry::container().defaults(&["b"]));
        entries.insert("b".into(), RuleEntry::container().defaults(&["a"]));

        let err = RuleRegistry::new(entries).unwrap_err();
        assert!(matches!(err, DomainError::InvalidRegistry(ref m) if m.contains("cycle")), "{err}");
    }

    #[test]
    fn given_unknown_reference_when_building_then_rejects() {
        let mut entries = BTreeMap::new();
        entries.insert("a".into(), RuleEntry::leaf().accepting(&["ghost"]));
        assert!(RuleRegistry::new(entries).is_err());
    }

    #[test]
    fn given_toml_table_when_parsed_then_reads_slots_and_defaults() {
        let registry = RuleRegistry::from_toml_str(
            r#"
[types.panel]
accepts_children = true
accepted_child_types = ["label"]
max_children = 2
default_children = ["label"]

[types.panel.slots.title]
accepted_types = ["label"]
max_count = 1
required = true

[types.label]
"#,
        )
        .unwrap();

        assert!(registry.can_add_child("panel", "label"));
        assert!(!registry.can_add_more_children("panel", 2));
        assert_eq!(registry.default_children_types("panel"), &["label".to_string()]);
        let rule = registry.slot_rule("panel", "title").unwrap();
        assert!(rule.required);
        assert_eq!(rule.max_count, Some(1));
        assert!(!registry.accepts_children("label"));
    }

    #[test]
    fn given_disabled_type_when_removed_then_scrubbed_from_references() {
        let registry = RuleRegistry::builtin()
            .without_types(&["tab".to_string()])
            .unwrap_or_else(|e| panic!("{e}"));
        // tabs defaults were tab, tab; now nothing is referenced
        assert!(!registry.contains("tab"));
        assert!(registry.default_children_types("tabs").is_empty());
        assert!(!registry.can_add_child("tabs", "tab"));
    }
}

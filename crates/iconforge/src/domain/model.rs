//! Domain models for design nodes, variant groups, and generation outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A node of the remote design document. Read-only input to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RawNode>) -> Self {
        self.children = children;
        self
    }
}

/// Value of a single variant property after rename substitution and coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Str(String),
}

impl PropValue {
    pub fn is_bool(&self) -> bool {
        matches!(self, PropValue::Bool(_))
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Str(value) => f.write_str(value),
        }
    }
}

/// One `key=value` pair taken from a variant label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAssignment {
    pub key: String,
    pub value: PropValue,
}

impl PropertyAssignment {
    pub fn new(key: impl Into<String>, value: PropValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A child of a group node together with its positional property assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantNode {
    pub id: String,
    pub name: String,
    pub assignments: Vec<PropertyAssignment>,
}

impl VariantNode {
    /// Flattened JSX attribute string for this variant.
    ///
    /// Boolean-true keys are rendered bare, boolean-false keys are omitted and string keys become
    /// `key="value"`.
    pub fn attribute_string(&self) -> String {
        self.assignments
            .iter()
            .filter_map(|assignment| match &assignment.value {
                PropValue::Bool(true) => Some(assignment.key.clone()),
                PropValue::Bool(false) => None,
                PropValue::Str(value) => Some(jsx_attribute(&assignment.key, value)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// JavaScript string literal for `value`, escaped the way JSON escapes strings.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// `key="value"`, or `key={"..."}` when the value needs escaping.
fn jsx_attribute(key: &str, value: &str) -> String {
    let quoted = js_string(value);
    if quoted.len() == value.len() + 2 {
        format!("{key}={quoted}")
    } else {
        format!("{key}={{{quoted}}}")
    }
}

/// Inferred type of a schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Every observed value was a boolean.
    Boolean,
    /// At least one observed value was a string.
    StringEnum,
}

/// Observed values for a single property key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub key: String,
    pub values: Vec<PropValue>,
}

impl SchemaEntry {
    pub fn kind(&self) -> SchemaKind {
        if self.values.iter().all(PropValue::is_bool) {
            SchemaKind::Boolean
        } else {
            SchemaKind::StringEnum
        }
    }
}

/// Ordered mapping from property key to its deduplicated observed values.
///
/// Keys and values keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySchema {
    entries: Vec<SchemaEntry>,
}

impl PropertySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `key` unless it was already observed.
    pub fn observe(&mut self, key: &str, value: &PropValue) {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                if !entry.values.contains(value) {
                    entry.values.push(value.clone());
                }
            }
            None => self.entries.push(SchemaEntry {
                key: key.to_owned(),
                values: vec![value.clone()],
            }),
        }
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One generated component: a group node, its parsed variants, and its resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantGroup {
    pub id: String,
    pub raw_name: String,
    /// Named captures of the first inclusion pattern matching `raw_name`.
    pub matches: BTreeMap<String, String>,
    pub resolved_name: String,
    pub schema: PropertySchema,
    /// Variants in document order.
    pub variants: Vec<VariantNode>,
}

impl VariantGroup {
    pub fn variant_ids(&self) -> Vec<String> {
        self.variants.iter().map(|variant| variant.id.clone()).collect()
    }
}

/// A variant that produced no branch, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedVariant {
    pub node_id: String,
    pub attributes: String,
    pub reason: String,
}

/// Successful generation of one component file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub component_name: String,
    pub prop_variants: Vec<String>,
    pub source_text: String,
    pub file_path: PathBuf,
    pub skipped: Vec<SkippedVariant>,
}

/// A group that did not produce a component, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub group: String,
    pub reason: String,
}

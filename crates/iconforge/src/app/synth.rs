//! Component synthesis: a typed props interface plus guarded branches over fetched fragments.
//!
//! Synthesis builds a [`ComponentIr`] first and renders it to TSX text only in
//! [`ComponentIr::render`], so callers can assert on structure instead of formatting.

use std::fmt::Write as _;

use crate::app::schedule::FetchResults;
use crate::domain::errors::FetchFailure;
use crate::domain::model::{
    PropValue, SchemaKind, SkippedVariant, VariantGroup, VariantNode, js_string,
};

const INDENT: &str = "    ";

/// TypeScript type of a props interface field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// `key?: boolean`
    OptionalBoolean,
    /// `key: "a" | "b"`; boolean members of a mixed key render as bare literals.
    Union(Vec<PropValue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropField {
    pub name: String,
    pub ty: FieldType,
}

/// Runtime condition selecting one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// A variant without assignments matches unconditionally.
    Always,
    Truthy(String),
    Falsy(String),
    Equals { key: String, value: String },
    /// Conjunction in the variant's positional assignment order.
    All(Vec<Guard>),
}

impl Guard {
    /// Build the guard for `variant` from its assignments, keeping their order.
    pub fn for_variant(variant: &VariantNode) -> Self {
        let mut terms: Vec<Guard> = variant
            .assignments
            .iter()
            .map(|assignment| match &assignment.value {
                PropValue::Bool(true) => Guard::Truthy(assignment.key.clone()),
                PropValue::Bool(false) => Guard::Falsy(assignment.key.clone()),
                PropValue::Str(value) => Guard::Equals {
                    key: assignment.key.clone(),
                    value: value.clone(),
                },
            })
            .collect();

        match terms.len() {
            0 => Guard::Always,
            1 => terms.remove(0),
            _ => Guard::All(terms),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Guard::Always => "true".to_owned(),
            Guard::Truthy(key) => key.clone(),
            Guard::Falsy(key) => format!("!{key}"),
            Guard::Equals { key, value } => format!("{key} === {}", js_string(value)),
            Guard::All(terms) => terms
                .iter()
                .map(Guard::render)
                .collect::<Vec<_>>()
                .join(" && "),
        }
    }
}

/// One `if (guard) { return (...) }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub node_id: String,
    pub guard: Guard,
    pub body: String,
}

/// Structured form of a generated component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentIr {
    pub name: String,
    pub fields: Vec<PropField>,
    /// Branches in document order. Evaluation is first-match-wins.
    pub branches: Vec<Branch>,
}

impl ComponentIr {
    pub fn props_name(&self) -> String {
        format!("{}Props", self.name)
    }

    /// Render the component as TSX source.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let props_name = self.props_name();

        out.push_str("import React from 'react';\n\n");
        let _ = writeln!(out, "export interface {props_name} {{");
        for field in &self.fields {
            match &field.ty {
                FieldType::OptionalBoolean => {
                    let _ = writeln!(out, "{INDENT}{}?: boolean;", field.name);
                }
                FieldType::Union(values) => {
                    let members = values.iter().map(literal).collect::<Vec<_>>().join(" | ");
                    let _ = writeln!(out, "{INDENT}{}: {members};", field.name);
                }
            }
        }
        out.push_str("}\n\n");

        let mut destructured: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        destructured.push("...props");
        let _ = writeln!(
            out,
            "export const {}: React.FC<{props_name}> = ({{ {} }}) => {{",
            self.name,
            destructured.join(", ")
        );

        for branch in &self.branches {
            let _ = writeln!(out, "{INDENT}if ({}) {{", branch.guard.render());
            let _ = writeln!(out, "{INDENT}{INDENT}return (");
            for line in branch.body.trim_end().lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "{INDENT}{INDENT}{INDENT}{line}");
                }
            }
            let _ = writeln!(out, "{INDENT}{INDENT});");
            let _ = writeln!(out, "{INDENT}}}\n");
        }

        let _ = writeln!(out, "{INDENT}return null;");
        out.push_str("};\n");
        out
    }
}

/// Result of synthesizing one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub component: ComponentIr,
    /// Attribute strings for every emitted branch, in branch order.
    pub prop_variants: Vec<String>,
    /// Variants that produced no branch because their fragment is missing.
    pub skipped: Vec<SkippedVariant>,
}

impl Synthesis {
    pub fn source_text(&self) -> String {
        self.component.render()
    }
}

/// Build the component for `group` from already fetched fragments.
///
/// A variant without a fragment yields no branch; its siblings keep their document order.
pub fn synthesize(group: &VariantGroup, component_name: &str, results: &FetchResults) -> Synthesis {
    let fields = group
        .schema
        .entries()
        .iter()
        .map(|entry| PropField {
            name: entry.key.clone(),
            ty: match entry.kind() {
                SchemaKind::Boolean => FieldType::OptionalBoolean,
                SchemaKind::StringEnum => FieldType::Union(entry.values.clone()),
            },
        })
        .collect();

    let mut branches = Vec::with_capacity(group.variants.len());
    let mut prop_variants = Vec::with_capacity(group.variants.len());
    let mut skipped = Vec::new();

    for variant in &group.variants {
        let fragment = results
            .get(&variant.id)
            .cloned()
            .unwrap_or(Err(FetchFailure::MissingUrl));

        match fragment {
            Ok(body) => {
                branches.push(Branch {
                    node_id: variant.id.clone(),
                    guard: Guard::for_variant(variant),
                    body,
                });
                prop_variants.push(variant.attribute_string());
            }
            Err(reason) => skipped.push(SkippedVariant {
                node_id: variant.id.clone(),
                attributes: variant.attribute_string(),
                reason: reason.to_string(),
            }),
        }
    }

    Synthesis {
        component: ComponentIr {
            name: component_name.to_owned(),
            fields,
            branches,
        },
        prop_variants,
        skipped,
    }
}

fn literal(value: &PropValue) -> String {
    match value {
        PropValue::Bool(flag) => flag.to_string(),
        PropValue::Str(text) => js_string(text),
    }
}

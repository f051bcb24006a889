//! Variant aggregation: parsed children folded into a property schema plus group identity.

use std::collections::BTreeMap;

use regex::Regex;

use crate::domain::errors::DomainError;
use crate::domain::model::{PropertySchema, RawNode, VariantGroup, VariantNode};
use crate::domain::naming::{RenameMap, parse_label};

/// Caller-ordered list of inclusion regexes. The first pattern that matches a group wins.
#[derive(Debug, Clone)]
pub struct InclusionPatterns {
    patterns: Vec<Regex>,
}

impl InclusionPatterns {
    /// Compile the provided patterns, preserving their order.
    pub fn new<I, S>(patterns: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|err| DomainError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }

    /// Return the first pattern matching `name`, if any.
    pub fn first_match(&self, name: &str) -> Option<&Regex> {
        self.patterns.iter().find(|pattern| pattern.is_match(name))
    }

    /// Keep only the nodes whose name matches at least one pattern, in input order.
    pub fn filter<'a>(&self, nodes: &'a [RawNode]) -> Vec<&'a RawNode> {
        nodes.iter().filter(|node| self.is_match(&node.name)).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Build the [`VariantGroup`] for `group` from its children.
pub fn aggregate(
    group: &RawNode,
    patterns: &InclusionPatterns,
    renames: &RenameMap,
) -> Result<VariantGroup, DomainError> {
    let (matches, resolved_name) = resolve_identity(&group.name, patterns)?;

    let variants = group
        .children
        .iter()
        .map(|child| {
            Ok(VariantNode {
                id: child.id.clone(),
                name: child.name.clone(),
                assignments: parse_label(&child.name, renames)?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    let mut schema = PropertySchema::new();
    for variant in &variants {
        for assignment in &variant.assignments {
            schema.observe(&assignment.key, &assignment.value);
        }
    }

    tracing::debug!(
        group = %group.name,
        name = %resolved_name,
        variants = variants.len(),
        properties = schema.len(),
        "aggregated variant group"
    );

    Ok(VariantGroup {
        id: group.id.clone(),
        raw_name: group.name.clone(),
        matches,
        resolved_name,
        schema,
        variants,
    })
}

fn resolve_identity(
    raw_name: &str,
    patterns: &InclusionPatterns,
) -> Result<(BTreeMap<String, String>, String), DomainError> {
    let pattern = patterns
        .first_match(raw_name)
        .ok_or_else(|| DomainError::NoMatchingPattern(raw_name.to_owned()))?;
    let captures = pattern
        .captures(raw_name)
        .ok_or_else(|| DomainError::NoMatchingPattern(raw_name.to_owned()))?;

    let matches: BTreeMap<String, String> = pattern
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|capture| (name.to_owned(), capture.as_str().to_owned()))
        })
        .collect();

    let name = matches
        .get("name")
        .map(String::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(raw_name);
    let resolved_name = strip_non_alpha(name);
    Ok((matches, resolved_name))
}

/// Drop every character outside `[a-zA-Z]`.
pub fn strip_non_alpha(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphabetic).collect()
}

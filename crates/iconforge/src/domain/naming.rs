//! Parsing of the `Key=Value, Key=Value` variant naming convention.
//!
//! The convention has no escaping: a value can never contain `", "` or `=`. A label that breaks
//! this is rejected as [`DomainError::MalformedVariantLabel`] rather than guessed at.

use std::collections::BTreeMap;

use crate::domain::errors::DomainError;
use crate::domain::model::{PropValue, PropertyAssignment};

/// Exact-match substitutions applied to raw values before boolean coercion.
pub type RenameMap = BTreeMap<String, String>;

const TOKEN_SEPARATOR: &str = ", ";

/// Parse a variant label into its positional property assignments.
///
/// Labels without `=` describe nodes with no variant dimensions and yield an empty list.
pub fn parse_label(
    label: &str,
    renames: &RenameMap,
) -> Result<Vec<PropertyAssignment>, DomainError> {
    if !label.contains('=') {
        return Ok(Vec::new());
    }

    label
        .split(TOKEN_SEPARATOR)
        .map(|token| parse_token(label, token, renames))
        .collect()
}

fn parse_token(
    label: &str,
    token: &str,
    renames: &RenameMap,
) -> Result<PropertyAssignment, DomainError> {
    let malformed = || DomainError::MalformedVariantLabel {
        label: label.to_owned(),
        token: token.to_owned(),
    };

    let (key, raw_value) = token.split_once('=').ok_or_else(malformed)?;
    if key.is_empty() || raw_value.contains('=') {
        return Err(malformed());
    }

    let value = renames
        .get(raw_value)
        .map(String::as_str)
        .unwrap_or(raw_value);

    Ok(PropertyAssignment::new(lower_camel(key), coerce(value)))
}

fn coerce(value: &str) -> PropValue {
    match value {
        "true" => PropValue::Bool(true),
        "false" => PropValue::Bool(false),
        other => PropValue::Str(other.to_owned()),
    }
}

/// Lowercase the first character only; the remainder is kept as written.
pub fn lower_camel(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

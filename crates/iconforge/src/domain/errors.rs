//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed variant label '{label}': token '{token}' is not a single key=value pair")]
    MalformedVariantLabel { label: String, token: String },
    #[error("group '{0}' matches none of the inclusion patterns")]
    NoMatchingPattern(String),
    #[error("invalid inclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("template key '{{{key}}}' is not captured by the pattern matching '{group}'")]
    UnknownTemplateKey { key: String, group: String },
}

/// Per-variant failure recorded by the scheduler instead of aborting the group.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("no asset url returned for node")]
    MissingUrl,
    #[error("dispatch limiter closed")]
    Dispatch,
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("transform failed: {0}")]
    Transform(String),
}

//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree invariants or failed lookups.
/// These are independent of persistence and I/O concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("invalid value type: {0} is not a scalar")]
    InvalidValueType(String),

    #[error("cannot set a value on '{label}': it has {count} child item(s)")]
    HasChildren { label: String, count: usize },

    #[error("path not found: {path}: {reason}")]
    PathNotFound { path: String, reason: String },

    #[error("not a leaf: '{0}' has no value")]
    NotALeaf(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unknown node: the item no longer exists in the tree")]
    UnknownNode,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

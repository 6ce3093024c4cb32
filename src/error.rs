//! Error types for schema construction and record loading.

use std::io;

use thiserror::Error;

/// Failures detected while declaring fields or item types.
///
/// These are always fatal to construction.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("conflicting options: {0}")]
    ConflictingOption(String),
    #[error("option '{option}' is not supported by {kind} fields")]
    UnsupportedOption { option: &'static str, kind: &'static str },
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("transform not found: {0}")]
    UnknownTransform(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to parse schema: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Fatal, whole-record extraction failure.
///
/// The `Display` text is the human-readable reason and always names the field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DropItem {
    #[error("\"{field}\": invalid choice \"{value}\"")]
    InvalidChoice { field: String, value: String },
    #[error("\"{field}\": {expected} expected, not \"{value}\"")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        value: String,
    },
    #[error("\"{field}\": {reason}")]
    Rejected { field: String, reason: String },
    #[error("\"{field}\": extraction failed: {reason}")]
    Extraction { field: String, reason: String },
}

impl DropItem {
    /// Name of the field that dropped the record
    pub fn field(&self) -> &str {
        match self {
            DropItem::InvalidChoice { field, .. }
            | DropItem::TypeMismatch { field, .. }
            | DropItem::Rejected { field, .. }
            | DropItem::Extraction { field, .. } => field,
        }
    }

    pub fn reason(&self) -> String {
        self.to_string()
    }
}

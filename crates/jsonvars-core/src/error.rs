//! Error types for jsonvars-core

use std::path::PathBuf;

/// Result type for jsonvars-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assigning, importing or reading variables
///
/// An absent variable is never an error; lookups return `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A dotted variable path could not be split into segments
    #[error("Invalid variable path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A placeholder refers back to a name already being resolved
    #[error("Reference cycle detected at '{name}' (via {})", .chain.join(" -> "))]
    CycleDetected { name: String, chain: Vec<String> },

    /// A value resolved to a different kind than the caller asked for
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The context was created for another variables processor
    #[error("Invalid context: context bound to a different variables processor")]
    ForeignContext,

    /// A required key is absent from a configuration object
    #[error("{scope} is missing required element '{key}'")]
    MissingElement { scope: String, key: String },

    /// A required key holds a value of the wrong kind
    #[error("{scope} had invalid value for {key} (expected {expected} value)")]
    InvalidElement {
        scope: String,
        key: String,
        expected: &'static str,
    },

    /// A configuration file is not valid JSON or not a JSON object
    #[error("Failed to parse JSON config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

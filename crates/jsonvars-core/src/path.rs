//! Dotted variable path utilities
//!
//! Variables are addressed by dot-separated segment names such as
//! `server.http.port`. Segment identity is case-insensitive: `Server.HTTP`
//! and `server.http` name the same variable, while the spelling used when a
//! variable was first created is kept for display.
//!
//! # Examples
//!
//! ```
//! use jsonvars_core::path::{fold, join, parse_path};
//!
//! assert_eq!(parse_path("server.http.port").unwrap(), vec!["server", "http", "port"]);
//! assert_eq!(fold("Server.HTTP"), "server.http");
//! assert_eq!(join("server", "port"), "server.port");
//! assert_eq!(join("", "port"), "port");
//! ```

use crate::{Error, Result};

/// Deepest path a context accepts. Matches the nesting limit `serde_json`
/// applies when parsing documents.
pub const MAX_SEGMENTS: usize = 128;

/// Parse a dotted path into its segments.
///
/// Rejects empty paths, empty segments (`a..b`, `.a`, `a.`), segments
/// containing placeholder braces (such a variable could never be referenced
/// by a `{name}` placeholder) and paths deeper than [`MAX_SEGMENTS`].
///
/// # Examples
///
/// ```
/// use jsonvars_core::path::parse_path;
///
/// assert_eq!(parse_path("a").unwrap(), vec!["a"]);
/// assert_eq!(parse_path("a.b.c").unwrap(), vec!["a", "b", "c"]);
/// assert!(parse_path("a..b").is_err());
/// assert!(parse_path("").is_err());
/// ```
pub fn parse_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }

    let mut segments = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(Error::invalid_path(path, "path contains an empty segment"));
        }
        if segment.contains(['{', '}']) {
            return Err(Error::invalid_path(
                path,
                format!("segment '{}' contains a placeholder brace", segment),
            ));
        }
        segments.push(segment);
        if segments.len() > MAX_SEGMENTS {
            return Err(Error::invalid_path(
                path,
                format!("path is deeper than {} segments", MAX_SEGMENTS),
            ));
        }
    }

    Ok(segments)
}

/// Case-folded identity of a path or segment.
pub fn fold(path: &str) -> String {
    path.to_lowercase()
}

/// Join a base key and a child name with a `.`, ignoring an empty base and
/// any trailing dots on it.
pub fn join(base: &str, name: &str) -> String {
    let base = trim_base(base);
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// Strip the trailing dots a caller may leave on a base key (`"server."`).
pub fn trim_base(base: &str) -> &str {
    base.trim_end_matches('.')
}

//! JSON configuration loading and required-field access
//!
//! Configuration documents are plain JSON files whose top level is an
//! object. The `require_*` helpers read fields of such an object (raw or
//! wrapped) and report missing or mistyped fields with the scope they were
//! looked up in, e.g. `server config is missing required element 'port'`.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::element::{ArrayRef, Element, ObjectRef};
use crate::{Error, Result};

/// Load a JSON configuration file. The top level must be an object.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be read, [`Error::ConfigParse`] if it is
/// not valid JSON or not an object.
pub fn load_config(path: impl AsRef<Path>) -> Result<Element> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading JSON config");

    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(Error::ConfigParse {
            path: path.to_path_buf(),
            message: "top-level value is not a JSON object".to_string(),
        });
    }
    Ok(value.into())
}

/// Turn a type mismatch into a scoped invalid-element error; other errors
/// (such as reference cycles) pass through.
fn invalid(err: Error, scope: &str, key: &str, expected: &'static str) -> Error {
    match err {
        Error::TypeMismatch { .. } => Error::InvalidElement {
            scope: scope.to_string(),
            key: key.to_string(),
            expected,
        },
        other => other,
    }
}

impl ObjectRef {
    /// A field that must be present.
    pub fn require(&self, scope: &str, key: &str) -> Result<Element> {
        self.get(key).ok_or_else(|| Error::MissingElement {
            scope: scope.to_string(),
            key: key.to_string(),
        })
    }

    pub fn require_string(&self, scope: &str, key: &str) -> Result<String> {
        self.require(scope, key)?
            .as_string()
            .map_err(|e| invalid(e, scope, key, "String"))
    }

    pub fn require_i64(&self, scope: &str, key: &str) -> Result<i64> {
        self.require(scope, key)?
            .as_i64()
            .map_err(|e| invalid(e, scope, key, "integer"))
    }

    pub fn require_f64(&self, scope: &str, key: &str) -> Result<f64> {
        self.require(scope, key)?
            .as_f64()
            .map_err(|e| invalid(e, scope, key, "floating point"))
    }

    pub fn require_bool(&self, scope: &str, key: &str) -> Result<bool> {
        self.require(scope, key)?
            .as_bool()
            .map_err(|e| invalid(e, scope, key, "boolean"))
    }

    pub fn require_object(&self, scope: &str, key: &str) -> Result<ObjectRef> {
        self.require(scope, key)?
            .as_object()
            .map_err(|e| invalid(e, scope, key, "json object"))
    }

    pub fn require_array(&self, scope: &str, key: &str) -> Result<ArrayRef> {
        self.require(scope, key)?
            .as_array()
            .map_err(|e| invalid(e, scope, key, "json array"))
    }
}

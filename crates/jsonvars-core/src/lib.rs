//! Lazy, cross-referencing variable resolution for JSON configuration trees
//!
//! This crate lets a host assemble configuration from several overlapping
//! sources and lets any value refer to another by a `{name}` placeholder
//! that is resolved when it is read:
//!
//! - **Contexts**: [`VariableContext`] holds variables addressed by dotted,
//!   case-insensitive paths (`server.http.port`)
//! - **Precedence chain**: [`VariablesProcessor`] consults its root context,
//!   then every added context in order; the first definition wins
//! - **Lazy elements**: [`VariablesProcessor::wrap`] turns a JSON tree into
//!   [`Element::Lazy`] proxies whose placeholders resolve on every read
//! - **Live mirroring**: a variable's value is embedded by reference in its
//!   parent's object, so re-assignment is visible through both
//!
//! # Example
//!
//! ```
//! use jsonvars_core::VariablesProcessor;
//! use serde_json::json;
//!
//! let processor = VariablesProcessor::new();
//! let variables = processor.root_context();
//!
//! let config = processor.wrap(json!({
//!     "server": {"host": "example.org", "port": 8080},
//!     "url": "https://{server.host}:{server.port}/",
//!     "port": "{server.port}"
//! }));
//! variables.import_object("", &config).unwrap();
//!
//! let url = config.get("url").unwrap().unwrap();
//! assert_eq!(url.as_string().unwrap(), "https://example.org:8080/");
//!
//! let port = config.get("port").unwrap().unwrap();
//! assert!(port.is_number());
//!
//! variables.assign_variable("server.port", 9090).unwrap();
//! assert_eq!(url.as_string().unwrap(), "https://example.org:9090/");
//! ```

pub mod context;
pub mod element;
pub mod error;
pub mod lazy;
pub mod loader;
mod node;
pub mod path;
pub mod processor;

pub use context::VariableContext;
pub use element::{ArrayRef, Element, ElementKind, JsonMap, ObjectRef};
pub use error::{Error, Result};
pub use lazy::LazyElement;
pub use loader::load_config;
pub use processor::VariablesProcessor;

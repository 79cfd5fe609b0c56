//! Variable processor: the precedence chain and the wrapping entry point
//!
//! A [`VariablesProcessor`] owns one root [`VariableContext`] for its whole
//! lifetime and consults it first; additional contexts are appended with
//! [`VariablesProcessor::add_context`] and consulted in insertion order.
//! The first context that defines a name wins.
//!
//! # Example
//!
//! ```
//! use jsonvars_core::VariablesProcessor;
//! use serde_json::json;
//!
//! let processor = VariablesProcessor::new();
//! let defaults = processor.create_context();
//! defaults.assign_variable("host", "localhost").unwrap();
//! processor.add_context(&defaults).unwrap();
//!
//! let config = processor.wrap(json!({"url": "http://{host}:{port}"}));
//! processor.root_context().assign_variable("port", 8080).unwrap();
//!
//! let url = config.get("url").unwrap().unwrap();
//! assert_eq!(url.as_string().unwrap(), "http://localhost:8080");
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::context::VariableContext;
use crate::element::{ArrayRef, Element, ObjectRef};
use crate::lazy::LazyElement;
use crate::{Error, Result};

/// State shared between a processor handle, its contexts and its lazy
/// elements. Only processor handles hold it strongly.
pub(crate) struct ProcessorShared {
    root: VariableContext,
    chain: RwLock<Vec<VariableContext>>,
}

impl ProcessorShared {
    /// First value for `name` in chain order, root context first.
    pub(crate) fn resolve_variable(&self, name: &str) -> Option<Element> {
        if let Some(value) = self.root.get_variable(name) {
            return Some(value);
        }
        let chain = self.chain.read().clone();
        chain.iter().find_map(|context| context.get_variable(name))
    }
}

/// Handle to a variable processor. Clones share the same processor.
#[derive(Clone)]
pub struct VariablesProcessor {
    shared: Arc<ProcessorShared>,
}

impl VariablesProcessor {
    /// Create a processor with an empty root context.
    pub fn new() -> Self {
        let shared = Arc::new_cyclic(|owner: &Weak<ProcessorShared>| ProcessorShared {
            root: VariableContext::bound(owner.clone()),
            chain: RwLock::new(Vec::new()),
        });
        tracing::debug!("Created variables processor");
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<ProcessorShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn owner(&self) -> Weak<ProcessorShared> {
        Arc::downgrade(&self.shared)
    }

    /// Whether `context` was created for this processor.
    pub fn binds(&self, context: &VariableContext) -> bool {
        std::ptr::eq(context.owner().as_ptr(), Arc::as_ptr(&self.shared))
    }

    /// The root context, always consulted first.
    pub fn root_context(&self) -> VariableContext {
        self.shared.root.clone()
    }

    /// Create a context bound to this processor. It is not part of the
    /// chain until passed to [`add_context`](Self::add_context).
    pub fn create_context(&self) -> VariableContext {
        VariableContext::new(self)
    }

    /// Append a context to the chain. Adding a context twice, or adding
    /// the root context, is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::ForeignContext`] if the context belongs to another processor.
    pub fn add_context(&self, context: &VariableContext) -> Result<()> {
        if !self.binds(context) {
            return Err(Error::ForeignContext);
        }
        if *context == self.shared.root {
            return Ok(());
        }

        let mut chain = self.shared.chain.write();
        if chain.contains(context) {
            return Ok(());
        }
        chain.push(context.clone());
        tracing::debug!(contexts = chain.len() + 1, "Added variable context");
        Ok(())
    }

    /// Remove a context from the chain. The root context cannot be removed.
    pub fn remove_context(&self, context: &VariableContext) -> bool {
        let mut chain = self.shared.chain.write();
        match chain.iter().position(|c| c == context) {
            Some(index) => {
                chain.remove(index);
                tracing::debug!(contexts = chain.len() + 1, "Removed variable context");
                true
            }
            None => false,
        }
    }

    /// Contexts in the chain, excluding the root.
    pub fn contexts(&self) -> Vec<VariableContext> {
        self.shared.chain.read().clone()
    }

    /// Value of `name` from the first context in the chain that defines it.
    ///
    /// `name` is matched as one dotted path against each context's path
    /// index.
    pub fn resolve_variable(&self, name: &str) -> Option<Element> {
        self.shared.resolve_variable(name)
    }

    /// Wrap a value tree so that its placeholders resolve against this
    /// processor on read. Already wrapped input is unwrapped first, so the
    /// result carries exactly one lazy layer per tree level.
    pub fn wrap(&self, value: impl Into<Element>) -> Element {
        wrap_element(&self.owner(), value.into())
    }

    /// Wrap a single template string and resolve it.
    pub fn resolve_str(&self, template: &str) -> Result<Element> {
        self.wrap(template).resolved()
    }

    /// Dispose every added context (retained ones are kept), then the root
    /// context, and empty the chain.
    pub fn close(&self) {
        let contexts = std::mem::take(&mut *self.shared.chain.write());
        for context in &contexts {
            context.dispose();
        }
        self.shared.root.dispose();
        tracing::debug!(contexts = contexts.len() + 1, "Closed variables processor");
    }

    /// Whether both handles refer to the same processor.
    pub fn ptr_eq(&self, other: &VariablesProcessor) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Default for VariablesProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VariablesProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariablesProcessor")
            .field("root", &self.shared.root)
            .field("contexts", &self.shared.chain.read().len())
            .finish()
    }
}

/// Recursively wrap `value` for resolution against `owner`.
pub(crate) fn wrap_element(owner: &Weak<ProcessorShared>, value: Element) -> Element {
    let delegate = match value.unwrapped() {
        Element::Object(object) => Element::Object(ObjectRef::from_map(
            object
                .entries()
                .into_iter()
                .map(|(key, field)| (key, wrap_element(owner, field)))
                .collect(),
        )),
        Element::Array(array) => Element::Array(ArrayRef::from_vec(
            array
                .to_vec()
                .into_iter()
                .map(|item| wrap_element(owner, item))
                .collect(),
        )),
        primitive => primitive,
    };
    Element::Lazy(LazyElement::new(delegate, owner.clone()))
}

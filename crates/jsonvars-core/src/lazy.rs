//! Lazily-resolving element proxies
//!
//! A [`LazyElement`] wraps a raw element and defers `{name}` substitution
//! until it is read. Nothing is cached: every read walks the owning
//! processor's context chain again, so a later assignment to a referenced
//! variable is observed by every proxy that mentions it.
//!
//! Two placeholder forms are recognised in string values:
//!
//! - **Whole-value**: the string is exactly `{name}`. The read yields the
//!   referenced value with its own type (number, object, ...).
//! - **Inline**: any other `{name}` span is replaced by the text form of the
//!   referenced value. Unknown names stay in the output as written.
//!
//! Each resolution carries the chain of names it is currently expanding; a
//! name that appears twice fails with [`Error::CycleDetected`].

use std::fmt;
use std::sync::{Arc, Weak};

use crate::element::Element;
use crate::path;
use crate::processor::{ProcessorShared, VariablesProcessor};
use crate::{Error, Result};

/// Continuation receiving a resolved element while the names that produced
/// it are still on the resolution chain.
pub(crate) type Resolved<'a, T> = &'a mut dyn FnMut(Element, &mut Vec<String>) -> Result<T>;

/// A JSON element whose placeholders resolve at read time.
#[derive(Clone)]
pub struct LazyElement {
    delegate: Arc<Element>,
    owner: Weak<ProcessorShared>,
}

impl LazyElement {
    pub(crate) fn new(delegate: Element, owner: Weak<ProcessorShared>) -> Self {
        debug_assert!(!delegate.is_lazy(), "lazy elements are never nested");
        Self {
            delegate: Arc::new(delegate),
            owner,
        }
    }

    /// The wrapped element as stored.
    pub fn delegate(&self) -> &Element {
        &self.delegate
    }

    /// The processor this element resolves against, if it is still alive.
    pub fn processor(&self) -> Option<VariablesProcessor> {
        self.owner.upgrade().map(VariablesProcessor::from_shared)
    }

    /// Whether the owning processor has been dropped. Orphaned elements
    /// read as their raw delegate.
    pub fn is_orphaned(&self) -> bool {
        self.owner.strong_count() == 0
    }

    /// Raw deep copy of the wrapped tree without any lazy layers.
    pub fn to_raw(&self) -> Element {
        self.delegate.detached()
    }

    /// Resolve this element once. The result is never lazy.
    pub fn resolve(&self) -> Result<Element> {
        self.resolve_with(&mut Vec::new(), &mut |value, _| Ok(value))
    }

    pub(crate) fn resolve_with<T>(
        &self,
        chain: &mut Vec<String>,
        then: Resolved<'_, T>,
    ) -> Result<T> {
        let Element::String(text) = self.delegate.as_ref() else {
            return then((*self.delegate).clone(), chain);
        };
        if !text.contains('{') {
            return then(Element::String(text.clone()), chain);
        }
        let Some(processor) = self.owner.upgrade() else {
            tracing::trace!(%text, "Processor dropped, placeholders left unresolved");
            return then(Element::String(text.clone()), chain);
        };

        if let Some(name) = whole_value_name(text) {
            if let Some(result) = lookup(&processor, name, chain, &mut *then)? {
                return Ok(result);
            }
        }

        let substituted = substitute(&processor, text, chain)?;
        then(Element::String(substituted), chain)
    }
}

impl fmt::Debug for LazyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyElement").field(&self.delegate).finish()
    }
}

/// Name of a whole-value placeholder: exactly one `{...}` spanning the text.
fn whole_value_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    (!inner.contains(['{', '}'])).then_some(inner)
}

/// Look `name` up through the processor chain and hand its fully resolved
/// value to `then`. `Ok(None)` when no context defines the name.
fn lookup<T>(
    processor: &ProcessorShared,
    name: &str,
    chain: &mut Vec<String>,
    then: Resolved<'_, T>,
) -> Result<Option<T>> {
    let folded = path::fold(name);
    if chain.contains(&folded) {
        let mut cycle = chain.clone();
        cycle.push(folded);
        tracing::warn!(name, chain = ?cycle, "Reference cycle detected");
        return Err(Error::CycleDetected {
            name: name.to_string(),
            chain: cycle,
        });
    }

    let Some(value) = processor.resolve_variable(name) else {
        tracing::trace!(name, "Placeholder refers to an undefined variable");
        return Ok(None);
    };

    chain.push(folded);
    let result = match value {
        Element::Lazy(lazy) => lazy.resolve_with(chain, then),
        other => then(other, chain),
    };
    chain.pop();
    result.map(Some)
}

/// Replace every resolvable `{name}` span in `text`.
fn substitute(processor: &ProcessorShared, text: &str, chain: &mut Vec<String>) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            output.push_str(&rest[open..]);
            return Ok(output);
        };

        let name = &after[..close];
        match lookup(processor, name, chain, &mut |value, chain| render(&value, chain))? {
            Some(text) => output.push_str(&text),
            None => {
                output.push('{');
                output.push_str(name);
                output.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Text form of a resolved value for inline substitution.
fn render(value: &Element, chain: &mut Vec<String>) -> Result<String> {
    match value {
        Element::String(text) => Ok(text.clone()),
        Element::Number(number) => Ok(number.to_string()),
        Element::Bool(flag) => Ok(flag.to_string()),
        Element::Null => Ok("null".to_string()),
        structural => Ok(serde_json::to_string(&structural.to_value_in(chain)?)?),
    }
}

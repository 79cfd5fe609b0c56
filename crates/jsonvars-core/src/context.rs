//! Named, path-addressable variable scopes
//!
//! A [`VariableContext`] owns a tree of variable nodes addressed by dotted,
//! case-insensitive paths. Assigning `a.b.c` creates `a` and `a.b` as empty
//! objects when they do not exist yet, and links every node into its
//! parent's object value, so reading `a` yields `{"b": {"c": ...}}`.
//!
//! A node keeps every object that embeds its value current: re-assigning
//! `a.b.c` rewrites the `c` field of the object held by `a.b` in place, and
//! any wrapped tree that captured that object sees the new value.
//!
//! Contexts are cheap handles; clones refer to the same scope.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::element::{Element, ObjectRef};
use crate::node::{NodeArena, NodeId, VariableNode};
use crate::path;
use crate::processor::{ProcessorShared, VariablesProcessor, wrap_element};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct ContextState {
    nodes: NodeArena,
    /// Folded root name -> node
    roots: IndexMap<String, NodeId>,
    /// Folded full path -> node, in creation order
    paths: IndexMap<String, NodeId>,
    retained: bool,
    /// Live object holding every root, created on first request
    view: Option<ObjectRef>,
}

impl ContextState {
    fn lookup(&self, path: &str) -> Option<NodeId> {
        self.paths.get(&path::fold(path)).copied()
    }

    /// Walk `path`, creating missing segments as empty objects, and return
    /// the node at its end.
    fn vivify(&mut self, path: &str) -> Result<NodeId> {
        let segments = path::parse_path(path)?;
        let mut parent: Option<NodeId> = None;
        let mut folded = String::with_capacity(path.len());

        for segment in segments {
            if !folded.is_empty() {
                folded.push('.');
            }
            folded.push_str(&path::fold(segment));

            let id = match self.paths.get(&folded) {
                Some(id) => *id,
                None => self.create(parent, segment, &folded),
            };
            parent = Some(id);
        }

        parent.ok_or_else(|| Error::invalid_path(path, "path is empty"))
    }

    fn create(&mut self, parent: Option<NodeId>, name: &str, folded: &str) -> NodeId {
        let display = match parent {
            Some(parent) => path::join(&self.nodes[parent].path, name),
            None => name.to_string(),
        };
        let id = self
            .nodes
            .insert(VariableNode::vivified(name, display, parent));

        let target = match parent {
            Some(parent) => {
                let parent = &mut self.nodes[parent];
                parent.children.insert(path::fold(name), id);
                parent.live_object()
            }
            None => {
                self.roots.insert(path::fold(name), id);
                self.view.clone()
            }
        };
        if let Some(target) = target {
            self.adopt(id, &target);
            self.nodes[id].mirror_into(&target, name);
        }

        self.paths.insert(folded.to_string(), id);
        tracing::debug!(path = %self.nodes[id].path, "Created variable node");
        id
    }

    /// Take over a field `target` already holds under the node's name in
    /// any case. A differently spelled key is dropped so that the object
    /// keeps one key per variable.
    fn adopt(&mut self, id: NodeId, target: &ObjectRef) {
        let name = self.nodes[id].name.clone();
        let Some(key) = target.find_key(&name) else {
            return;
        };
        let existing = if key == name {
            target.get(&key)
        } else {
            target.remove(&key)
        };
        if let Some(existing) = existing {
            let processed = existing.is_lazy();
            self.nodes[id].value = existing;
            self.nodes[id].processed = processed;
        }
    }

    fn assign(&mut self, id: NodeId, value: Element, processed: bool) {
        self.nodes[id].store(value, processed);
        tracing::debug!(path = %self.nodes[id].path, processed, "Assigned variable");

        if !self.nodes[id].children.is_empty() {
            self.relink_children(id);
        }
    }

    /// Re-attach the children of `id` to its (new) value. A child whose key
    /// the new object carries takes that value; the others are re-inserted
    /// with their current value.
    fn relink_children(&mut self, id: NodeId) {
        let target = self.nodes[id].live_object();
        let processed = self.nodes[id].processed;
        let children: Vec<NodeId> = self.nodes[id].children.values().copied().collect();

        for child in children {
            self.nodes[child].forget_mirrors();
            let Some(target) = &target else {
                continue;
            };

            let name = self.nodes[child].name.clone();
            if let Some(key) = target.find_key(&name) {
                let incoming = if key == name {
                    target.get(&key)
                } else {
                    target.remove(&key)
                };
                if let Some(incoming) = incoming {
                    self.assign(child, incoming, processed);
                }
            }
            self.nodes[child].mirror_into(target, &name);
        }
    }

    /// Drop `id` and all its descendants. Only `id` itself is removed from
    /// the objects embedding it; descendants live in objects that go away
    /// with it.
    fn detach(&mut self, id: NodeId) -> Option<VariableNode> {
        let mut node = self.nodes.remove(id)?;
        let mut stack: Vec<NodeId> = node.children.values().copied().collect();
        while let Some(child) = stack.pop() {
            if let Some(mut descendant) = self.nodes.remove(child) {
                stack.extend(descendant.children.values().copied());
                descendant.forget_mirrors();
                self.paths.shift_remove(&path::fold(&descendant.path));
            }
        }

        node.unlink();
        self.paths.shift_remove(&path::fold(&node.path));
        Some(node)
    }

    fn remove(&mut self, path: &str) -> Option<Element> {
        let id = self.lookup(path)?;
        let (parent, key) = {
            let node = &self.nodes[id];
            (node.parent, path::fold(&node.name))
        };
        match parent {
            Some(parent) => {
                self.nodes[parent].children.shift_remove(&key);
            }
            None => {
                self.roots.shift_remove(&key);
            }
        }

        let node = self.detach(id)?;
        tracing::debug!(path = %node.path, "Removed variable");
        Some(node.value)
    }

    fn child_ids(&self, path: &str) -> Vec<NodeId> {
        if path.is_empty() {
            return Vec::new();
        }
        match self.lookup(path) {
            Some(id) => self.nodes[id].children.values().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Paths of every descendant of `id`, depth first.
    fn descendants(&self, id: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.values().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            out.push(node.path.clone());
            stack.extend(node.children.values().rev().copied());
        }
        out
    }

    /// Detached copies of every node, parents before children.
    fn snapshot(&self) -> Vec<(String, Element, bool)> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.values().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            entries.push((node.path.clone(), node.value.detached(), node.processed));
            stack.extend(node.children.values().rev().copied());
        }
        entries
    }
}

/// A scope of variables bound to one [`VariablesProcessor`].
#[derive(Clone)]
pub struct VariableContext {
    state: Arc<RwLock<ContextState>>,
    owner: Weak<ProcessorShared>,
}

impl VariableContext {
    /// Create an empty context bound to `processor`.
    pub fn new(processor: &VariablesProcessor) -> Self {
        Self::bound(processor.owner())
    }

    pub(crate) fn bound(owner: Weak<ProcessorShared>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ContextState::default())),
            owner,
        }
    }

    pub(crate) fn owner(&self) -> &Weak<ProcessorShared> {
        &self.owner
    }

    /// The processor this context wraps values for, if it is still alive.
    pub fn processor(&self) -> Option<VariablesProcessor> {
        self.owner.upgrade().map(VariablesProcessor::from_shared)
    }

    /// Keep this context's variables when it is disposed.
    pub fn retain(&self) {
        self.state.write().retained = true;
    }

    pub fn is_retained(&self) -> bool {
        self.state.read().retained
    }

    /// Assign a variable, wrapping the value for placeholder resolution.
    ///
    /// An existing variable keeps its identity: every object embedding it
    /// sees the new value. Missing ancestors are created as empty objects.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPath`] if `path` has empty segments.
    pub fn assign_variable(&self, path: &str, value: impl Into<Element>) -> Result<()> {
        self.assign_variable_with(path, value, true)
    }

    /// Assign a variable verbatim, without placeholder resolution.
    pub fn assign_variable_raw(&self, path: &str, value: impl Into<Element>) -> Result<()> {
        self.assign_variable_with(path, value, false)
    }

    /// Assign a variable; `process` selects wrapping for resolution.
    pub fn assign_variable_with(
        &self,
        path: &str,
        value: impl Into<Element>,
        process: bool,
    ) -> Result<()> {
        let value = value.into();
        let value = if process {
            wrap_element(&self.owner, value)
        } else {
            value
        };

        let mut state = self.state.write();
        let id = state.vivify(path)?;
        state.assign(id, value, process);
        Ok(())
    }

    /// Current value of a variable, `None` when absent.
    pub fn get_variable(&self, path: &str) -> Option<Element> {
        let state = self.state.read();
        state.lookup(path).map(|id| state.nodes[id].value.clone())
    }

    pub fn has_variable(&self, path: &str) -> bool {
        self.state.read().lookup(path).is_some()
    }

    /// Remove a variable and its descendants, returning its last value.
    pub fn remove_variable(&self, path: &str) -> Option<Element> {
        self.state.write().remove(path)
    }

    /// Fully qualified paths of the direct children of `path`.
    ///
    /// Enumeration is always relative to an existing variable: an empty or
    /// unknown path yields nothing.
    pub fn get_child_variables(&self, path: &str) -> Vec<String> {
        let state = self.state.read();
        state
            .child_ids(path)
            .into_iter()
            .map(|id| state.nodes[id].path.clone())
            .collect()
    }

    /// Fully qualified paths of every descendant of `path`, depth first.
    pub fn get_child_variables_recursive(&self, path: &str) -> Vec<String> {
        if path.is_empty() {
            return Vec::new();
        }
        let state = self.state.read();
        state
            .lookup(path)
            .map(|id| state.descendants(id))
            .unwrap_or_default()
    }

    /// Local names of the direct children of `path`.
    pub fn get_child_variable_names(&self, path: &str) -> Vec<String> {
        let state = self.state.read();
        state
            .child_ids(path)
            .into_iter()
            .map(|id| state.nodes[id].name.clone())
            .collect()
    }

    /// Every variable path in creation order.
    pub fn variables(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .paths
            .values()
            .map(|id| state.nodes[*id].path.clone())
            .collect()
    }

    /// Names of the root variables in creation order.
    pub fn root_names(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .roots
            .values()
            .map(|id| state.nodes[*id].name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().paths.is_empty()
    }

    /// A live object holding every root variable of this context.
    pub fn root_object(&self) -> ObjectRef {
        let mut state = self.state.write();
        if let Some(view) = &state.view {
            return view.clone();
        }

        let view = ObjectRef::new();
        let roots: Vec<NodeId> = state.roots.values().copied().collect();
        for id in roots {
            let node = &mut state.nodes[id];
            let name = node.name.clone();
            node.mirror_into(&view, &name);
        }
        state.view = Some(view.clone());
        view
    }

    /// Import every leaf of `object` as a variable under `base_key`.
    ///
    /// Nested objects extend the key; every other value (including arrays)
    /// is assigned as one variable. All paths are checked before the first
    /// assignment, so a rejected document leaves the context untouched.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `object` is not an object, or
    /// [`Error::InvalidPath`] for keys that do not form a valid path.
    pub fn import_object(&self, base_key: &str, object: &Element) -> Result<()> {
        self.import_object_with(base_key, object, true)
    }

    pub fn import_object_with(&self, base_key: &str, object: &Element, process: bool) -> Result<()> {
        let base = path::trim_base(base_key);
        let Some(fields) = object.live_object() else {
            return Err(Error::TypeMismatch {
                expected: "object",
                found: object.raw_kind().name(),
            });
        };

        let leaves = flatten(base, &fields)?;
        tracing::debug!(base, variables = leaves.len(), "Importing object");

        for (full, value) in leaves {
            match value {
                Some(value) => self.assign_variable_with(&full, value, process)?,
                None => {
                    self.state.write().vivify(&full)?;
                }
            }
        }
        Ok(())
    }

    /// Copy every variable of `other` into this context under `base_key`.
    ///
    /// The copy is a snapshot: later changes on either side are not seen by
    /// the other. Wrapped values are re-wrapped for this context's processor.
    pub fn import_context(&self, base_key: &str, other: &VariableContext) -> Result<()> {
        let entries = other.state.read().snapshot();
        tracing::debug!(
            base = path::trim_base(base_key),
            variables = entries.len(),
            "Importing context snapshot"
        );

        for (variable, value, processed) in entries {
            self.assign_variable_with(&path::join(base_key, &variable), value, processed)?;
        }
        Ok(())
    }

    /// An independent copy of this context bound to `processor`.
    pub fn duplicate(&self, processor: &VariablesProcessor) -> Result<VariableContext> {
        let copy = processor.create_context();
        copy.import_context("", self)?;
        Ok(copy)
    }

    /// Remove every variable unless the context is retained. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.state.write();
        if state.retained {
            tracing::trace!("Context is retained, dispose skipped");
            return;
        }

        let roots: Vec<NodeId> = state.roots.drain(..).map(|(_, id)| id).collect();
        for id in &roots {
            state.detach(*id);
        }
        state.paths.clear();
        state.nodes.clear();
        if !roots.is_empty() {
            tracing::debug!(roots = roots.len(), "Disposed variable context");
        }
    }
}

/// Validated paths of every leaf under `base`, depth first. Empty nested
/// objects are listed with `None` so the import creates them.
fn flatten(base: &str, fields: &ObjectRef) -> Result<Vec<(String, Option<Element>)>> {
    let mut leaves = Vec::new();
    let mut stack = vec![(base.to_string(), fields.entries().into_iter())];

    while let Some((prefix, mut entries)) = stack.pop() {
        let Some((key, value)) = entries.next() else {
            continue;
        };
        let full = format_path(&prefix, &key);
        path::parse_path(&full)?;
        stack.push((prefix, entries));

        match value.live_object() {
            Some(nested) if nested.is_empty() => leaves.push((full, None)),
            Some(nested) => stack.push((full, nested.entries().into_iter())),
            None => leaves.push((full, Some(value))),
        }
    }
    Ok(leaves)
}

/// Join without trimming, so a key with a trailing dot stays invalid.
fn format_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

impl PartialEq for VariableContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for VariableContext {}

impl fmt::Debug for VariableContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("VariableContext")
            .field("variables", &state.paths.len())
            .field("retained", &state.retained)
            .finish()
    }
}

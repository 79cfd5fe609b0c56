//! Variable nodes and the arena that owns them
//!
//! Nodes refer to each other by [`NodeId`] and to the objects embedding
//! their values by weak handles, so ownership flows only from a context's
//! root map down through `children`.

use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

use crate::element::{Element, ObjectRef, WeakObjectRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// An object that embeds a node's value under `key`.
#[derive(Debug, Clone)]
struct Mirror {
    target: WeakObjectRef,
    key: String,
}

/// One slot of a context's variable tree.
#[derive(Debug)]
pub(crate) struct VariableNode {
    /// Local segment name as first written
    pub(crate) name: String,
    /// Full dotted path as first written
    pub(crate) path: String,
    pub(crate) value: Element,
    /// Whether `value` was wrapped for placeholder resolution
    pub(crate) processed: bool,
    pub(crate) parent: Option<NodeId>,
    /// Folded local name -> child
    pub(crate) children: IndexMap<String, NodeId>,
    mirrors: Vec<Mirror>,
}

impl VariableNode {
    /// A node holding an empty object, as created for missing path segments.
    pub(crate) fn vivified(name: &str, path: String, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            path,
            value: Element::object(),
            processed: false,
            parent,
            children: IndexMap::new(),
            mirrors: Vec::new(),
        }
    }

    /// Store a new value and write it into every mirror before returning.
    pub(crate) fn store(&mut self, value: Element, processed: bool) {
        self.value = value;
        self.processed = processed;

        let value = &self.value;
        self.mirrors.retain(|mirror| match mirror.target.upgrade() {
            Some(target) => {
                target.insert(mirror.key.clone(), value.clone());
                true
            }
            None => false,
        });
    }

    /// Embed the current value into `target` and keep it current from now on.
    pub(crate) fn mirror_into(&mut self, target: &ObjectRef, key: &str) {
        target.insert(key, self.value.clone());
        let known = self
            .mirrors
            .iter()
            .any(|mirror| mirror.key == key && mirror.target.points_to(target));
        if !known {
            self.mirrors.push(Mirror {
                target: target.downgrade(),
                key: key.to_string(),
            });
        }
    }

    /// Remove the node's key from every embedding object.
    pub(crate) fn unlink(&mut self) {
        for mirror in self.mirrors.drain(..) {
            if let Some(target) = mirror.target.upgrade() {
                target.remove(&mirror.key);
            }
        }
    }

    /// Stop tracking embedding objects without touching them.
    pub(crate) fn forget_mirrors(&mut self) {
        self.mirrors.clear();
    }

    pub(crate) fn live_object(&self) -> Option<ObjectRef> {
        self.value.live_object()
    }
}

/// Slot storage for nodes with reuse of freed slots.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Option<VariableNode>>,
    free: Vec<usize>,
}

impl NodeArena {
    pub(crate) fn insert(&mut self, node: VariableNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&VariableNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut VariableNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<VariableNode> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(node)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl Index<NodeId> for NodeArena {
    type Output = VariableNode;

    fn index(&self, id: NodeId) -> &VariableNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale variable node {:?}", id),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut VariableNode {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale variable node {:?}", id),
        }
    }
}

//! Output tree — arena of named nodes the engine builds targets into
//!
//! Nodes live in a slot arena and are addressed by generational [`NodeId`]s.
//! [`Tree::release`] frees a whole subtree and bumps the generation of every freed
//! slot, so a handle kept past its release reads as absent instead of aliasing
//! whatever node reuses the slot.

use serde_json::{Map, Value};
use std::fmt;

/// Handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// A node: a name, an optional text value, and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the text value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the parent node, if linked.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of output nodes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Tree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node with no value.
    pub fn create(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Node {
            name: name.into(),
            value: None,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Create a detached leaf node carrying a text value.
    pub fn create_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeId {
        self.alloc(Node {
            name: name.into(),
            value: Some(value.into()),
            parent: None,
            children: Vec::new(),
        })
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("output tree exceeds u32::MAX nodes");
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Link a detached `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` already has a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(self.contains(parent), "append_child: stale parent {parent}");
        let node = self
            .get_mut(child)
            .unwrap_or_else(|| panic!("append_child: stale child {child}"));
        assert!(node.parent.is_none(), "append_child: {child} is already linked");
        node.parent = Some(parent);
        if let Some(parent) = self.get_mut(parent) {
            parent.children.push(child);
        }
    }

    /// Set or replace the text value of a node. Does nothing on a stale handle.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.value = Some(value.into());
        }
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the node, or `None` if the handle is stale.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(Node::name)
    }

    /// Returns the node's text value.
    #[must_use]
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::value)
    }

    /// Returns the node's parent.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Returns the node's children; empty for a stale handle.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], Node::children)
    }

    /// Detach `id` from its parent and free it along with all descendants.
    ///
    /// Releasing a stale handle is a no-op.
    pub fn release(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).map(|node| node.parent) else {
            return;
        };
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
                pending.extend(node.children);
            }
        }
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no nodes are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Select descendants of `from` along a `/`-separated path of child names.
    ///
    /// Every node matching each step is followed, so repeated names fan out.
    /// An empty path selects `from` itself.
    #[must_use]
    pub fn select(&self, from: NodeId, path: &str) -> Vec<NodeId> {
        let mut current = vec![from];
        for step in path.split(crate::PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current = current
                .iter()
                .flat_map(|&id| self.children(id))
                .copied()
                .filter(|&c| self.name(c) == Some(step))
                .collect();
        }
        current.retain(|&id| self.contains(id));
        current
    }

    /// Returns the value of the first node at `path` below `from` that has one.
    #[must_use]
    pub fn value_at(&self, from: NodeId, path: &str) -> Option<&str> {
        self.select(from, path)
            .into_iter()
            .find_map(|id| self.value(id))
    }

    /// Render a subtree as JSON.
    ///
    /// A node without children renders as its value (a string), or an empty object
    /// if it has none. A node with children renders as an object keyed by child name;
    /// repeated names collect into an array in order. A subtree never renders as an
    /// array itself, so an array under a key is always an accumulator.
    #[must_use]
    pub fn to_json(&self, id: NodeId) -> Value {
        let Some(node) = self.get(id) else {
            return Value::Null;
        };
        if node.children.is_empty() {
            return match &node.value {
                Some(value) => Value::String(value.clone()),
                None => Value::Object(Map::new()),
            };
        }

        let mut object = Map::new();
        for &child in &node.children {
            let Some(name) = self.name(child) else {
                continue;
            };
            let rendered = self.to_json(child);
            match object.get_mut(name) {
                Some(Value::Array(items)) => items.push(rendered),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, rendered]);
                }
                None => {
                    object.insert(name.to_owned(), rendered);
                }
            }
        }
        Value::Object(object)
    }
}

use generational_arena::Arena;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeId, ScalarValue};
use crate::domain::resolver;
use crate::domain::signal::{ChangeSignal, SubscriptionId, TreeChange};

/// Owner of the configuration tree.
///
/// Nodes live in a generational arena; the tree shape is the ordered root
/// list plus each node's child list. Every node is reachable from exactly one
/// place, so the structure is acyclic by construction.
#[derive(Debug, Default)]
pub struct TreeStore {
    arena: Arena<Node>,
    roots: Vec<NodeId>,
    signal: ChangeSignal,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&TreeChange) + Send + Sync + 'static,
    {
        self.signal.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.signal.unsubscribe(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> DomainResult<&Node> {
        self.arena.get(id.0).ok_or(DomainError::UnknownNode)
    }

    fn get_mut(&mut self, id: NodeId) -> DomainResult<&mut Node> {
        self.arena.get_mut(id.0).ok_or(DomainError::UnknownNode)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    /// Total number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first, pre-order walk: root order, then each node's child order.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst::new(self)
    }

    /// Find the node a dotted path points at, leaf or parent.
    pub fn locate(&self, path: &str) -> DomainResult<NodeId> {
        resolver::locate(self, path)
    }

    /// Resolve a dotted path to a leaf value.
    pub fn resolve(&self, path: &str) -> DomainResult<&str> {
        resolver::resolve(self, path)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn add_root_item(&mut self, label: &str) -> DomainResult<NodeId> {
        let node = Node::create_parent(label)?;
        let id = NodeId(self.arena.insert(node));
        self.roots.push(id);
        self.signal.publish(TreeChange::Added(id));
        Ok(id)
    }

    /// Attach a new child under `parent`: a leaf when `value` is given,
    /// otherwise an empty parent.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child_to_item(
        &mut self,
        parent: NodeId,
        label: &str,
        value: Option<ScalarValue>,
    ) -> DomainResult<NodeId> {
        if !self.contains(parent) {
            return Err(DomainError::UnknownNode);
        }
        let node = match value {
            Some(v) => Node::create_leaf(label, v)?,
            None => Node::create_parent(label)?,
        };
        let id = NodeId(self.arena.insert(node));
        self.get_mut(parent)?.add_child(id);
        self.signal.publish(TreeChange::Added(id));
        Ok(id)
    }

    /// Remove a node and its whole subtree, wherever it sits in the hierarchy.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_item(&mut self, id: NodeId) -> bool {
        if let Some(pos) = self.roots.iter().position(|&r| r == id) {
            self.roots.remove(pos);
        } else {
            let Some(parent) = self.find_parent(id) else {
                return false;
            };
            match self.get_mut(parent) {
                Ok(node) => {
                    node.remove_child(id);
                }
                Err(_) => return false,
            }
        }
        self.release(id);
        self.signal.publish(TreeChange::Removed(id));
        true
    }

    /// Assign a value to a leaf or empty node.
    ///
    /// Nodes that own children are refused with `HasChildren`; their
    /// children are never silently dropped.
    #[instrument(level = "trace", skip(self))]
    pub fn set_item_value(&mut self, id: NodeId, value: ScalarValue) -> DomainResult<()> {
        let node = self.get_mut(id)?;
        if node.has_children() {
            return Err(DomainError::HasChildren {
                label: node.label().to_string(),
                count: node.children().len(),
            });
        }
        node.set_value(value);
        self.signal.publish(TreeChange::ValueSet(id));
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn rename_item(&mut self, id: NodeId, label: &str) -> DomainResult<()> {
        self.get_mut(id)?.rename(label)?;
        self.signal.publish(TreeChange::Renamed(id));
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn clear(&mut self) {
        self.arena.clear();
        self.roots.clear();
        self.signal.publish(TreeChange::Cleared);
    }

    /// Swap in the contents of a fully built store, keeping subscribers.
    ///
    /// The incoming nodes are re-inserted into this store's arena after it is
    /// cleared, so ids handed out before the swap go stale instead of
    /// aliasing imported nodes.
    pub fn replace_with(&mut self, mut other: TreeStore) {
        self.arena.clear();
        let incoming = std::mem::take(&mut other.roots);
        let roots: Vec<NodeId> = incoming
            .into_iter()
            .filter_map(|id| self.adopt(&mut other, id))
            .collect();
        self.roots = roots;
        self.signal.publish(TreeChange::Replaced);
    }

    /// Move `id` and its subtree out of `other`, returning the new id here.
    fn adopt(&mut self, other: &mut TreeStore, id: NodeId) -> Option<NodeId> {
        let mut node = other.arena.remove(id.0)?;
        let children = node.clear_children();
        let new_id = NodeId(self.arena.insert(node));
        for child in children {
            if let Some(adopted) = self.adopt(other, child) {
                if let Ok(parent) = self.get_mut(new_id) {
                    parent.add_child(adopted);
                }
            }
        }
        Some(new_id)
    }

    fn find_parent(&self, id: NodeId) -> Option<NodeId> {
        self.iter()
            .find(|visit| visit.node.children().contains(&id))
            .map(|visit| visit.id)
    }

    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(mut node) = self.arena.remove(current.0) {
                pending.extend(node.clear_children());
            }
        }
    }
}

/// One step of a [`DepthFirst`] walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    /// 0 for root items.
    pub depth: usize,
}

pub struct DepthFirst<'a> {
    store: &'a TreeStore,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> DepthFirst<'a> {
    fn new(store: &'a TreeStore) -> Self {
        let stack = store.roots.iter().rev().map(|&id| (id, 0)).collect();
        Self { store, stack }
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            if let Ok(node) = self.store.get(id) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children().iter().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some(Visit { id, node, depth });
            }
        }
        None
    }
}

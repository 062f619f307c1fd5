//! Rendering of the tree as `termtree` output.

use termtree::Tree;

use crate::domain::node::{Node, NodeId};
use crate::domain::store::TreeStore;

pub trait TreeDisplay {
    /// One `termtree::Tree` per root item.
    fn to_display_trees(&self) -> Vec<Tree<String>>;
}

/// Display caption: `label = value` for leaves, `label/` for parents.
pub fn caption(node: &Node) -> String {
    match node.value() {
        Some(value) => format!("{} = {}", node.label(), value),
        None => format!("{}/", node.label()),
    }
}

impl TreeDisplay for TreeStore {
    fn to_display_trees(&self) -> Vec<Tree<String>> {
        fn build(store: &TreeStore, id: NodeId) -> Option<Tree<String>> {
            let node = store.get(id).ok()?;
            let leaves: Vec<_> = node
                .children()
                .iter()
                .filter_map(|&child| build(store, child))
                .collect();
            Some(Tree::new(caption(node)).with_leaves(leaves))
        }

        self.roots()
            .iter()
            .filter_map(|&id| build(self, id))
            .collect()
    }
}

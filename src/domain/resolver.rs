//! Dotted-path resolution.
//!
//! Labels are matched case-insensitively at every level and the first match
//! in child order wins. Sibling labels that differ only by case alias each
//! other; the earlier sibling shadows the later one.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeId, PATH_SEPARATOR};
use crate::domain::store::TreeStore;

/// Arguments of the path resolution entry point: `{"path": "a.b.c"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveArgs {
    pub path: String,
}

/// Resolve `path` to the value of the leaf it names.
pub fn resolve<'a>(store: &'a TreeStore, path: &str) -> DomainResult<&'a str> {
    let (_, node) = walk(store, path)?;
    node.value()
        .ok_or_else(|| DomainError::NotALeaf(path.to_string()))
}

/// Find the node `path` names without requiring it to be a leaf.
pub fn locate(store: &TreeStore, path: &str) -> DomainResult<NodeId> {
    walk(store, path).map(|(id, _)| id)
}

fn walk<'a>(store: &'a TreeStore, path: &str) -> DomainResult<(NodeId, &'a Node)> {
    let not_found = |reason: String| DomainError::PathNotFound {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(not_found("empty path".into()));
    }
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let Some((last, ancestors)) = segments.split_last() else {
        return Err(not_found("empty path".into()));
    };

    let lookup = |candidates: &[NodeId], segment: &str| {
        if segment.is_empty() {
            return Err(not_found("empty segment".into()));
        }
        find_label(store, candidates, segment)
            .ok_or_else(|| not_found(format!("segment '{segment}' not found")))
    };

    let mut candidates = store.roots();
    for &segment in ancestors {
        let (_, node) = lookup(candidates, segment)?;
        if !node.has_children() {
            return Err(not_found(format!("segment '{segment}' has no children")));
        }
        candidates = node.children();
    }
    lookup(candidates, *last)
}

fn find_label<'a>(
    store: &'a TreeStore,
    candidates: &[NodeId],
    segment: &str,
) -> Option<(NodeId, &'a Node)> {
    let wanted = segment.to_lowercase();
    candidates.iter().find_map(|&id| {
        let node = store.get(id).ok()?;
        (node.label().to_lowercase() == wanted).then_some((id, node))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> TreeStore {
        let mut store = TreeStore::new();
        let env = store.add_root_item("Environment").unwrap();
        let dev = store.add_child_to_item(env, "Development", None).unwrap();
        store
            .add_child_to_item(dev, "port", Some("3000".into()))
            .unwrap();
        store
            .add_child_to_item(dev, "host", Some("localhost".into()))
            .unwrap();
        store.add_child_to_item(env, "Empty", None).unwrap();
        store
    }

    #[rstest]
    #[case("environment.development.port", "3000")]
    #[case("Environment.Development.Port", "3000")]
    #[case("ENVIRONMENT.development.HOST", "localhost")]
    fn given_leaf_path_when_resolving_then_value(
        store: TreeStore,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(resolve(&store, path).unwrap(), expected);
    }

    #[rstest]
    fn given_missing_segment_when_resolving_then_path_not_found(store: TreeStore) {
        let err = resolve(&store, "environment.staging.port").unwrap_err();
        match err {
            DomainError::PathNotFound { reason, .. } => {
                assert!(reason.contains("'staging' not found"), "{reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    fn given_descent_through_childless_node_when_resolving_then_path_not_found(store: TreeStore) {
        let err = resolve(&store, "environment.empty.port").unwrap_err();
        match err {
            DomainError::PathNotFound { reason, .. } => {
                assert!(reason.contains("'empty' has no children"), "{reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = resolve(&store, "environment.development.port.deeper").unwrap_err();
        assert!(matches!(err, DomainError::PathNotFound { .. }));
    }

    #[rstest]
    #[case("environment.development")]
    #[case("environment.empty")]
    fn given_parent_path_when_resolving_then_not_a_leaf(store: TreeStore, #[case] path: &str) {
        assert_eq!(
            resolve(&store, path).unwrap_err(),
            DomainError::NotALeaf(path.to_string())
        );
    }

    #[rstest]
    #[case("")]
    #[case("environment..port")]
    #[case(".environment")]
    fn given_malformed_path_when_resolving_then_path_not_found(store: TreeStore, #[case] path: &str) {
        assert!(matches!(
            resolve(&store, path).unwrap_err(),
            DomainError::PathNotFound { .. }
        ));
    }

    #[rstest]
    fn given_parent_path_when_locating_then_returns_node(store: TreeStore) {
        let id = locate(&store, "environment.DEVELOPMENT").unwrap();
        assert_eq!(store.get(id).unwrap().label(), "Development");
    }

    #[test]
    fn given_case_aliased_siblings_when_resolving_then_first_wins() {
        let mut store = TreeStore::new();
        let root = store.add_root_item("root").unwrap();
        store.add_child_to_item(root, "Key", Some("first".into())).unwrap();
        store.add_child_to_item(root, "key", Some("second".into())).unwrap();

        assert_eq!(resolve(&store, "root.key").unwrap(), "first");
        assert_eq!(resolve(&store, "root.KEY").unwrap(), "first");
    }
}

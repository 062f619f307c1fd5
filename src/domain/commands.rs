//! Projection of every leaf into a command descriptor.

use serde::Serialize;

use crate::domain::node::PATH_SEPARATOR;
use crate::domain::resolver::ResolveArgs;
use crate::domain::store::{DepthFirst, TreeStore};

/// Name of the resolution entry point that generated commands invoke.
pub const RESOLVE_COMMAND: &str = "cfgtree.resolve";

/// One leaf, addressed by its case-preserved dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCommand {
    pub id: String,
    pub path_args: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Command,
}

/// Descriptor handed to external snippet generators:
/// `{id, type: "command", command, args: {path}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub command: String,
    pub args: ResolveArgs,
}

impl From<LeafCommand> for CommandDescriptor {
    fn from(leaf: LeafCommand) -> Self {
        Self {
            id: leaf.id,
            kind: CommandKind::Command,
            command: RESOLVE_COMMAND.to_string(),
            args: ResolveArgs {
                path: leaf.path_args,
            },
        }
    }
}

/// Lazily walk the tree and yield one [`LeafCommand`] per leaf, depth-first.
pub fn generate_commands(store: &TreeStore) -> LeafCommands<'_> {
    LeafCommands {
        walk: store.iter(),
        segments: Vec::new(),
    }
}

pub struct LeafCommands<'a> {
    walk: DepthFirst<'a>,
    segments: Vec<&'a str>,
}

impl<'a> Iterator for LeafCommands<'a> {
    type Item = LeafCommand;

    fn next(&mut self) -> Option<Self::Item> {
        for visit in self.walk.by_ref() {
            self.segments.truncate(visit.depth);
            self.segments.push(visit.node.label());
            if visit.node.is_leaf() {
                let path = self.segments.join(PATH_SEPARATOR.to_string().as_str());
                return Some(LeafCommand {
                    id: path.clone(),
                    path_args: path,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resolver;

    fn sample() -> TreeStore {
        let mut store = TreeStore::new();
        let env = store.add_root_item("environment").unwrap();
        let dev = store.add_child_to_item(env, "development", None).unwrap();
        store
            .add_child_to_item(dev, "port", Some("3000".into()))
            .unwrap();
        store
            .add_child_to_item(dev, "host", Some("localhost".into()))
            .unwrap();
        store
    }

    #[test]
    fn given_two_leaves_when_generating_then_depth_first_ids() {
        let store = sample();

        let ids: Vec<String> = generate_commands(&store).map(|c| c.id).collect();

        assert_eq!(
            ids,
            vec!["environment.development.port", "environment.development.host"]
        );
    }

    #[test]
    fn given_mixed_depths_when_generating_then_paths_reset_between_branches() {
        let mut store = TreeStore::new();
        let a = store.add_root_item("A").unwrap();
        let b = store.add_child_to_item(a, "B", None).unwrap();
        store.add_child_to_item(b, "deep", Some("1".into())).unwrap();
        store.add_child_to_item(a, "shallow", Some("2".into())).unwrap();
        store.add_child_to_item(a, "Empty", None).unwrap();
        let top = store.add_root_item("Top").unwrap();
        store.set_item_value(top, "3".into()).unwrap();

        let ids: Vec<String> = generate_commands(&store).map(|c| c.id).collect();

        assert_eq!(ids, vec!["A.B.deep", "A.shallow", "Top"]);
    }

    #[test]
    fn given_generated_paths_when_resolving_then_every_leaf_found() {
        let store = sample();
        for command in generate_commands(&store) {
            assert!(resolver::resolve(&store, &command.path_args).is_ok());
        }
    }

    #[test]
    fn given_empty_tree_when_generating_then_nothing() {
        assert_eq!(generate_commands(&TreeStore::new()).count(), 0);
    }

    #[test]
    fn given_leaf_command_when_converting_then_descriptor_json_shape() {
        let descriptor = CommandDescriptor::from(LeafCommand {
            id: "a.b".into(),
            path_args: "a.b".into(),
        });

        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "a.b",
                "type": "command",
                "command": RESOLVE_COMMAND,
                "args": {"path": "a.b"}
            })
        );
    }
}

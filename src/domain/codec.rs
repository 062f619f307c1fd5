//! JSON representation of the tree: serialize, deserialize, export envelope
//! and import parsing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{NodeId, ScalarValue};
use crate::domain::store::TreeStore;

/// Version tag written into export envelopes.
pub const FORMAT_VERSION: &str = "1.0";

/// Most tree levels that can be written and read back: the JSON parser stops
/// at 128 nested containers and every level takes two.
pub const MAX_DEPTH: usize = 60;

/// Persisted shape of one node: `{label, value?, children?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    pub label: String,
    /// An explicit `null` is kept as `Some(Value::Null)` so it can be rejected.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeJson>>,
}

impl NodeJson {
    pub fn leaf(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(Value::String(value.into())),
            children: None,
        }
    }

    pub fn parent(label: impl Into<String>, children: Vec<NodeJson>) -> Self {
        Self {
            label: label.into(),
            value: None,
            children: (!children.is_empty()).then_some(children),
        }
    }
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// File export wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub version: String,
    pub exported_at: String,
    pub tree_state: Vec<NodeJson>,
}

impl Envelope {
    pub fn new(tree_state: Vec<NodeJson>, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            tree_state,
        }
    }
}

/// Map the whole tree to its JSON shape, preserving order.
pub fn serialize(store: &TreeStore) -> Vec<NodeJson> {
    store
        .roots()
        .iter()
        .filter_map(|&id| node_json(store, id))
        .collect()
}

fn node_json(store: &TreeStore, id: NodeId) -> Option<NodeJson> {
    let node = store.get(id).ok()?;
    let children: Vec<NodeJson> = node
        .children()
        .iter()
        .filter_map(|&child| node_json(store, child))
        .collect();
    Some(NodeJson {
        label: node.label().to_string(),
        value: node.value().map(|v| Value::String(v.to_string())),
        children: (!children.is_empty()).then_some(children),
    })
}

/// Rebuild a tree from its JSON shape.
///
/// The result is a fresh store; callers install it with
/// [`TreeStore::replace_with`] only after this succeeds, so a failure never
/// leaves a partial tree behind.
pub fn deserialize(nodes: &[NodeJson]) -> DomainResult<TreeStore> {
    let mut store = TreeStore::new();
    for json in nodes {
        let id = store.add_root_item(&json.label)?;
        fill(&mut store, id, json)?;
    }
    Ok(store)
}

fn fill(store: &mut TreeStore, id: NodeId, json: &NodeJson) -> DomainResult<()> {
    let children = json.children.as_deref().unwrap_or(&[]);
    match &json.value {
        Some(_) if !children.is_empty() => Err(DomainError::InvalidFormat(format!(
            "'{}' has both a value and children",
            json.label
        ))),
        Some(value) => store.set_item_value(id, ScalarValue::try_from(value)?),
        None => {
            for child in children {
                let child_id = store.add_child_to_item(id, &child.label, None)?;
                fill(store, child_id, child)?;
            }
            Ok(())
        }
    }
}

/// Extract the node list from an import payload: an envelope object with
/// `treeState`, or a bare array.
pub fn parse_import(text: &str) -> DomainResult<Vec<NodeJson>> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| DomainError::InvalidFormat(format!("not valid JSON: {e}")))?;
    let tree_state = match raw {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove("treeState").ok_or_else(|| {
            DomainError::InvalidFormat("object has no 'treeState' field".into())
        })?,
        _ => {
            return Err(DomainError::InvalidFormat(
                "expected an export envelope or an array of items".into(),
            ))
        }
    };
    serde_json::from_value(tree_state).map_err(|e| DomainError::InvalidFormat(e.to_string()))
}

/// Parse and validate an import payload into a fresh store.
///
/// Any validation failure in the payload is reported as `InvalidFormat`.
pub fn decode_import(text: &str) -> DomainResult<TreeStore> {
    let nodes = parse_import(text)?;
    deserialize(&nodes).map_err(|e| match e {
        DomainError::InvalidFormat(_) => e,
        other => DomainError::InvalidFormat(other.to_string()),
    })
}

fn check_depth(store: &TreeStore) -> DomainResult<()> {
    let levels = store.iter().map(|visit| visit.depth + 1).max().unwrap_or(0);
    if levels > MAX_DEPTH {
        return Err(DomainError::InvalidFormat(format!(
            "tree is {levels} levels deep, at most {MAX_DEPTH} can be written"
        )));
    }
    Ok(())
}

/// Pretty-printed export envelope.
pub fn encode_export(store: &TreeStore, exported_at: DateTime<Utc>) -> DomainResult<String> {
    check_depth(store)?;
    let envelope = Envelope::new(serialize(store), exported_at);
    serde_json::to_string_pretty(&envelope).map_err(|e| DomainError::InvalidFormat(e.to_string()))
}

/// Compact bare-array form used for the key-value state store.
pub fn encode_state(store: &TreeStore) -> DomainResult<String> {
    check_depth(store)?;
    serde_json::to_string(&serialize(store)).map_err(|e| DomainError::InvalidFormat(e.to_string()))
}

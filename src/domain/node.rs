//! Tree node: a label plus either a scalar value or an ordered child list.

use std::fmt;

use generational_arena::Index;
use serde_json::Value;

use crate::domain::error::{DomainError, DomainResult};

/// Separator between labels in a dotted path.
pub const PATH_SEPARATOR: char = '.';

/// Opaque handle to a node owned by a [`TreeStore`](crate::domain::TreeStore).
///
/// Handles are generational: once a node is removed its id goes stale and is
/// never reused for another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

/// Scalar value of a leaf, stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarValue(String);

impl ScalarValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        Self(b.to_string())
    }
}

macro_rules! scalar_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ScalarValue {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

scalar_from_number!(i32, i64, i128, u32, u64, u128, f64);

impl TryFrom<&Value> for ScalarValue {
    type Error = DomainError;

    /// Strings, numbers and booleans are accepted; null, arrays and objects are not.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self(s.clone())),
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::Bool(b) => Ok(Self::from(*b)),
            Value::Null => Err(DomainError::InvalidValueType("null".into())),
            Value::Array(_) => Err(DomainError::InvalidValueType("array".into())),
            Value::Object(_) => Err(DomainError::InvalidValueType("object".into())),
        }
    }
}

impl TryFrom<Value> for ScalarValue {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::try_from(&value)
    }
}

/// Display hint for a node, derived from whether it currently has children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionHint {
    /// Leaf or empty parent: nothing to expand.
    NonExpandable,
    /// Parent with at least one child, shown collapsed until opened.
    Collapsed,
}

/// Check that a label is usable as a path segment.
pub fn validate_label(label: &str) -> DomainResult<()> {
    if label.is_empty() {
        return Err(DomainError::InvalidLabel {
            label: label.to_string(),
            reason: "label must not be empty".into(),
        });
    }
    if label.contains(PATH_SEPARATOR) {
        return Err(DomainError::InvalidLabel {
            label: label.to_string(),
            reason: format!("label must not contain '{PATH_SEPARATOR}'"),
        });
    }
    Ok(())
}

/// A single tree element.
///
/// Holds at most one of `value` or `children`. A node with neither is an
/// empty parent. The child list is never stored empty: removing the last
/// child sets it back to absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: String,
    value: Option<ScalarValue>,
    children: Option<Vec<NodeId>>,
}

impl Node {
    /// Create a leaf holding `value`.
    pub fn create_leaf(label: impl Into<String>, value: impl Into<ScalarValue>) -> DomainResult<Self> {
        let label = label.into();
        validate_label(&label)?;
        Ok(Self {
            label,
            value: Some(value.into()),
            children: None,
        })
    }

    /// Create an empty parent (no value, no children yet).
    pub fn create_parent(label: impl Into<String>) -> DomainResult<Self> {
        let label = label.into();
        validate_label(&label)?;
        Ok(Self {
            label,
            value: None,
            children: None,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_ref().map(ScalarValue::as_str)
    }

    /// Child ids in insertion order; empty for leaves and empty parents.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }

    pub fn expansion_hint(&self) -> ExpansionHint {
        if self.has_children() {
            ExpansionHint::Collapsed
        } else {
            ExpansionHint::NonExpandable
        }
    }

    pub fn rename(&mut self, label: impl Into<String>) -> DomainResult<()> {
        let label = label.into();
        validate_label(&label)?;
        self.label = label;
        Ok(())
    }

    /// Assign a value, turning this node into a leaf.
    ///
    /// Any children are discarded and returned so the owner can release them.
    /// [`TreeStore::set_item_value`](crate::domain::TreeStore::set_item_value)
    /// refuses nodes with children before ever calling this.
    pub fn set_value(&mut self, value: impl Into<ScalarValue>) -> Vec<NodeId> {
        self.value = Some(value.into());
        self.children.take().unwrap_or_default()
    }

    /// Append a child, turning this node into a parent (any value is cleared).
    pub fn add_child(&mut self, child: NodeId) {
        self.value = None;
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    /// Remove a child by identity. Returns whether it was present.
    pub fn remove_child(&mut self, child: NodeId) -> bool {
        let Some(children) = self.children.as_mut() else {
            return false;
        };
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(pos);
        if children.is_empty() {
            self.children = None;
        }
        true
    }

    pub(crate) fn clear_children(&mut self) -> Vec<NodeId> {
        self.children.take().unwrap_or_default()
    }
}

//! Conversion of arbitrary response values into labeled display trees.
//!
//! A response is a schema-less [`ResponseValue`]. [`materialize`] walks it
//! structurally (primitive, sequence or mapping) and produces an
//! [`ObjectNode`] tree with one child per member, in the value's own
//! iteration order. No per-type rendering code is needed.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::Result;

/// An arbitrary, dynamically shaped response value.
///
/// Built with `serde_json`'s `preserve_order` feature, so mappings iterate in
/// the order their keys appeared on the wire.
pub type ResponseValue = Value;

/// What a node displays: the primitive itself, or a summary of a container.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// An ordered sequence with `len` elements.
    Sequence { len: usize },
    /// A mapping with `len` fields.
    Mapping { len: usize },
}

impl NodeValue {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => NodeValue::Null,
            Value::Bool(b) => NodeValue::Bool(*b),
            Value::Number(n) => NodeValue::Number(n.clone()),
            Value::String(s) => NodeValue::String(s.clone()),
            Value::Array(items) => NodeValue::Sequence { len: items.len() },
            Value::Object(fields) => NodeValue::Mapping { len: fields.len() },
        }
    }

    /// Returns true for primitives and empty containers.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        match self {
            NodeValue::Sequence { len } | NodeValue::Mapping { len } => *len == 0,
            _ => true,
        }
    }

    /// Locale-invariant textual form.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            NodeValue::Null => "null".to_string(),
            NodeValue::Bool(b) => b.to_string(),
            NodeValue::Number(n) => n.to_string(),
            NodeValue::String(s) => s.clone(),
            NodeValue::Sequence { len: 0 } => "[] (empty)".to_string(),
            NodeValue::Mapping { len: 0 } => "{} (empty)".to_string(),
            NodeValue::Sequence { len: 1 } => "[1 item]".to_string(),
            NodeValue::Sequence { len } => format!("[{len} items]"),
            NodeValue::Mapping { len: 1 } => "{1 field}".to_string(),
            NodeValue::Mapping { len } => format!("{{{len} fields}}"),
        }
    }
}

/// One node of a materialized display tree.
///
/// Each node owns its children. A node is a leaf iff its value is a primitive
/// or an empty container.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub label: String,
    pub value: NodeValue,
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.value.is_leaf()
    }

    /// The row text shown for this node, e.g. `"name: Seattle"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}: {}", self.label, self.value.text())
    }

    /// Direct child with the given label.
    #[must_use]
    pub fn child(&self, label: &str) -> Option<&ObjectNode> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Descendant reached by following labels from this node.
    #[must_use]
    pub fn get(&self, path: &[&str]) -> Option<&ObjectNode> {
        path.iter().try_fold(self, |node, label| node.child(label))
    }

    /// Number of leaves in this subtree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(ObjectNode::leaf_count).sum()
        }
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ObjectNode::node_count)
            .sum::<usize>()
    }
}

/// Member iterator over a container value, yielding `(label, value)` pairs.
enum Members<'a> {
    None,
    Sequence(std::iter::Enumerate<std::slice::Iter<'a, Value>>),
    Mapping(serde_json::map::Iter<'a>),
}

impl<'a> Members<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Members::Sequence(items.iter().enumerate()),
            Value::Object(fields) => Members::Mapping(fields.iter()),
            _ => Members::None,
        }
    }
}

impl<'a> Iterator for Members<'a> {
    type Item = (String, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Members::None => None,
            Members::Sequence(iter) => iter.next().map(|(i, v)| (i.to_string(), v)),
            Members::Mapping(iter) => iter.next().map(|(k, v)| (k.clone(), v)),
        }
    }
}

struct Frame<'a> {
    label: String,
    value: NodeValue,
    members: Members<'a>,
    children: Vec<ObjectNode>,
}

impl<'a> Frame<'a> {
    fn new(label: String, value: &'a Value) -> Self {
        let node_value = NodeValue::of(value);
        let capacity = match node_value {
            NodeValue::Sequence { len } | NodeValue::Mapping { len } => len,
            _ => 0,
        };
        Self {
            label,
            value: node_value,
            members: Members::of(value),
            children: Vec::with_capacity(capacity),
        }
    }

    fn finish(self) -> ObjectNode {
        ObjectNode {
            label: self.label,
            value: self.value,
            children: self.children,
        }
    }
}

/// Materialize `value` into a display tree whose root is labeled `label`.
///
/// Sequence children are labeled by zero-based index, mapping children by
/// key, both in iteration order. Every value is visited exactly once and the
/// input is never modified. The walk uses an explicit stack, so nesting depth
/// is bounded only by memory.
#[must_use]
pub fn materialize(label: impl Into<String>, value: &ResponseValue) -> ObjectNode {
    let mut current = Frame::new(label.into(), value);
    let mut parents: Vec<Frame<'_>> = Vec::new();

    loop {
        if let Some((label, child)) = current.members.next() {
            let child = Frame::new(label, child);
            parents.push(std::mem::replace(&mut current, child));
            continue;
        }

        let node = current.finish();
        match parents.pop() {
            Some(mut parent) => {
                parent.children.push(node);
                current = parent;
            }
            None => return node,
        }
    }
}

/// Materialize any serializable value.
///
/// Struct fields keep their declaration order. Fails with
/// [`Error::Materialization`](crate::Error::Materialization) when the value
/// has no JSON representation, such as a map with non-string keys.
pub fn materialize_serialize<T>(label: impl Into<String>, value: &T) -> Result<ObjectNode>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value)?;
    Ok(materialize(label, &value))
}

// Normalized value tree produced from the service's XML responses
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Index;

use crate::error::{CheddarError, Result};

static NULL: Node = Node::Null;

/// A normalized response value.
///
/// Scalars come from element text after coercion, `Map` from elements with
/// attributes or children, and `List` from repeated elements or collection
/// tags. Map keys keep the order in which they appeared in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
}

impl Node {
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    // Field lookup on a map node; None for any other shape
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Integer(value) => Some(*value),
            _ => None,
        }
    }

    // Integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Integer(value) => Some(*value as f64),
            Node::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Consumes the node as a sequence.
    ///
    /// `List` yields its items, `Null` yields nothing and any other value is
    /// treated as a single-element sequence.
    pub fn into_list(self) -> Vec<Node> {
        match self {
            Node::List(items) => items,
            Node::Null => Vec::new(),
            other => vec![other],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    /// Converts the node into a typed value through its JSON form.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json())
            .map_err(|e| CheddarError::ConversionError(e.to_string()))
    }
}

impl From<&Node> for serde_json::Value {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => serde_json::Value::Null,
            Node::Integer(value) => serde_json::Value::from(*value),
            Node::Float(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Node::Text(text) => serde_json::Value::String(text.clone()),
            Node::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Node::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Index<&str> for Node {
    type Output = Node;

    fn index(&self, key: &str) -> &Node {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Node {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        match self {
            Node::List(items) => items.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

const RADIX_PREFIXES: [(&str, u32); 6] = [
    ("0x", 16),
    ("0X", 16),
    ("0o", 8),
    ("0O", 8),
    ("0b", 2),
    ("0B", 2),
];

/// Permissive numeric check applied to element text.
///
/// Anything that reads entirely as a number becomes one: signed decimal
/// integers, `0x`/`0o`/`0b` literals, and decimal or exponent forms.
/// Leading zeros are accepted, so "007" becomes 7. `Infinity` and `NaN`
/// stay text.
pub fn parse_numeric(text: &str) -> Option<Node> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    for (prefix, radix) in RADIX_PREFIXES {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return None;
            }
            return i64::from_str_radix(digits, radix).ok().map(Node::Integer);
        }
    }

    let numeric_chars = trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !numeric_chars {
        return None;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(Node::Integer(value));
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Node::Float)
}

pub fn is_numeric(text: &str) -> bool {
    parse_numeric(text).is_some()
}

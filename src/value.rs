//! Dynamically-typed attribute values.
//!
//! Discovered resources carry their state as a string-keyed map mirroring the
//! provider schema. Values are a closed set of variants; accessors return
//! `Option` for probing and the `Attributes::require_*` helpers return typed
//! errors when a hook depends on a value being present with a given shape.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map of a resource. Ordered so rendering is deterministic.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttrValue {
    /// Absent or null value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String literal
    String(String),
    /// Ordered list
    List(Vec<AttrValue>),
    /// Nested map
    Map(AttrMap),
    /// An HCL expression written verbatim (never quoted, never substituted)
    #[serde(skip)]
    Interpolation(String),
}

impl AttrValue {
    /// Name of the variant, used in type errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Interpolation(_) => "interpolation",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Integer view. Strings holding integers are accepted because list
    /// data sources report some numeric fields as strings.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<AttrValue>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map_mut(&mut self) -> Option<&mut AttrMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for a list whose every element is a map (a nested block list).
    #[must_use]
    pub fn is_block_list(&self) -> bool {
        match self {
            Self::List(items) => !items.is_empty() && items.iter().all(|i| matches!(i, Self::Map(_))),
            _ => false,
        }
    }

    /// Build a value from a JSON document.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(obj) => Self::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) | Self::Interpolation(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{} items]", items.len()),
            Self::Map(map) => write!(f, "{{{} keys}}", map.len()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(items: Vec<AttrValue>) -> Self {
        Self::List(items)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(map: AttrMap) -> Self {
        Self::Map(map)
    }
}

/// Convert a JSON object into an attribute map. Non-object documents yield
/// an empty map.
#[must_use]
pub fn attrs_from_json(value: &serde_json::Value) -> AttrMap {
    match AttrValue::from_json(value) {
        AttrValue::Map(map) => map,
        _ => AttrMap::new(),
    }
}

/// Typed accessors over an attribute map that report which resource failed.
pub trait Attributes {
    /// Non-empty string attribute or `MissingRequiredAttribute`/`AttributeType`.
    fn require_str(&self, resource: &str, key: &str) -> Result<&str>;

    /// List attribute or `MissingRequiredAttribute`/`AttributeType`.
    fn require_list(&self, resource: &str, key: &str) -> Result<&[AttrValue]>;

    /// String attribute when present; `AttributeType` when it is not a string.
    fn optional_str(&self, resource: &str, key: &str) -> Result<Option<&str>>;

    /// String attribute when present and non-empty.
    fn get_str(&self, key: &str) -> Option<&str>;

    /// First element of a nested block list, mutably.
    fn first_block_mut(&mut self, key: &str) -> Option<&mut AttrMap>;
}

impl Attributes for AttrMap {
    fn require_str(&self, resource: &str, key: &str) -> Result<&str> {
        match self.get(key) {
            None | Some(AttrValue::Null) => Err(crate::err!(MissingRequiredAttribute {
                resource: resource.to_string(),
                attribute: key.to_string(),
            })),
            Some(AttrValue::String(s)) if s.is_empty() => Err(crate::err!(MissingRequiredAttribute {
                resource: resource.to_string(),
                attribute: key.to_string(),
            })),
            Some(AttrValue::String(s)) => Ok(s),
            Some(other) => Err(crate::err!(AttributeType {
                resource: resource.to_string(),
                attribute: key.to_string(),
                expected: "string",
                found: other.type_name(),
            })),
        }
    }

    fn require_list(&self, resource: &str, key: &str) -> Result<&[AttrValue]> {
        match self.get(key) {
            None | Some(AttrValue::Null) => Err(crate::err!(MissingRequiredAttribute {
                resource: resource.to_string(),
                attribute: key.to_string(),
            })),
            Some(AttrValue::List(items)) => Ok(items),
            Some(other) => Err(crate::err!(AttributeType {
                resource: resource.to_string(),
                attribute: key.to_string(),
                expected: "list",
                found: other.type_name(),
            })),
        }
    }

    fn optional_str(&self, resource: &str, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(AttrValue::Null) => Ok(None),
            Some(AttrValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(crate::err!(AttributeType {
                resource: resource.to_string(),
                attribute: key.to_string(),
                expected: "string",
                found: other.type_name(),
            })),
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(AttrValue::as_str)
            .filter(|s| !s.is_empty())
    }

    fn first_block_mut(&mut self, key: &str) -> Option<&mut AttrMap> {
        self.get_mut(key)
            .and_then(AttrValue::as_list_mut)
            .and_then(|items| items.first_mut())
            .and_then(AttrValue::as_map_mut)
    }
}

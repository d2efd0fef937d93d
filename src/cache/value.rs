//! Value Module
//!
//! The closed set of value kinds the cache can hold.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Resource Handle ==
/// A live resource (connection, closure, file handle...) carried inside a value.
///
/// Handles cannot be copied or persisted; the cache rejects them.
#[derive(Clone)]
pub struct ResourceHandle {
    label: String,
    resource: Arc<dyn Any + Send + Sync>,
}

impl ResourceHandle {
    /// Wraps a resource under a descriptive label.
    pub fn new(label: impl Into<String>, resource: impl Any + Send + Sync) -> Self {
        Self {
            label: label.into(),
            resource: Arc::new(resource),
        }
    }

    /// Returns the label used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrows the wrapped resource if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.resource.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Two handles are equal only when they point at the same resource.
impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

// == Value ==
/// A structured cache payload.
///
/// Serialized adjacently tagged so timestamps and records keep their kind
/// across a persistence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Sequence(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Composite record with a declared type name
    Record {
        type_name: String,
        fields: BTreeMap<String, Value>,
    },
    #[serde(skip)]
    Handle(ResourceHandle),
}

impl Value {
    /// Builds a record from a type name and `(field, value)` pairs.
    pub fn record<I, K>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Short name of the value kind, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record { .. } => "record",
            Value::Handle(_) => "handle",
        }
    }

    /// Looks up a field of a `Map` or `Record`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) | Value::Record { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Mutable access to a field of a `Map` or `Record`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Map(fields) | Value::Record { fields, .. } => fields.get_mut(name),
            _ => None,
        }
    }

    /// Describes the first part of the tree that JSON cannot carry back
    /// unchanged: a handle, or a NaN or infinite float.
    pub fn find_unpersistable(&self) -> Option<String> {
        match self {
            Value::Handle(handle) => Some(format!("handle '{}' cannot be persisted", handle.label())),
            Value::Float(f) if !f.is_finite() => Some(format!("float {f} cannot be persisted")),
            Value::Sequence(items) => items.iter().find_map(Value::find_unpersistable),
            Value::Map(fields) | Value::Record { fields, .. } => {
                fields.values().find_map(Value::find_unpersistable)
            }
            _ => None,
        }
    }

    /// Renders the value as plain JSON.
    ///
    /// Timestamps become RFC 3339 strings, records become objects of their
    /// fields, non-finite floats and handles become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null | Value::Handle(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Timestamp(t) => Json::String(t.to_rfc3339()),
            Value::Sequence(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(fields) | Value::Record { fields, .. } => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

// == Conversions ==
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Sequence(items.into_iter().map(Value::from).collect()),
            Json::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

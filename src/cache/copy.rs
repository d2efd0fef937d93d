//! Deep Copy Module
//!
//! Recursively clones values so the cache never shares structure with callers.

use crate::cache::Value;
use crate::error::{CacheError, Result};

// == Deep Copy ==
/// Produces a structurally equal value that shares no sub-structure with `value`.
///
/// Scalars are copied as-is, timestamps get a fresh instance carrying the same
/// instant, and sequences, maps and records are rebuilt element by element.
/// Records keep their type name.
///
/// # Errors
/// Returns `CacheError::UnsupportedType` when a `Handle` is reached anywhere
/// in the tree.
pub fn deep_copy(value: &Value) -> Result<Value> {
    let copied = match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Integer(n) => Value::Integer(*n),
        Value::Float(f) => Value::Float(*f),
        Value::String(s) => Value::String(s.clone()),
        Value::Timestamp(t) => Value::Timestamp(*t),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(deep_copy)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(fields) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), deep_copy(v)?)))
                .collect::<Result<_>>()?,
        ),
        Value::Record { type_name, fields } => Value::Record {
            type_name: type_name.clone(),
            fields: fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), deep_copy(v)?)))
                .collect::<Result<_>>()?,
        },
        Value::Handle(handle) => {
            return Err(CacheError::UnsupportedType(format!(
                "cannot copy {} '{}'",
                value.kind(),
                handle.label()
            )))
        }
    };

    Ok(copied)
}

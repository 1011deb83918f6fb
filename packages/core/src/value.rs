//! The Value type - a tree reconstructed from request sources.
//!
//! Form bodies, query strings and JSON payloads all end up as a `Value` before
//! they are validated against a `Schema` and handed to a resource method.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// A tree-shaped value flowing through the dispatch pipeline.
///
/// # Design Notes
///
/// - `Undefined` is distinct from `Null`: it marks an absent field or a hole
///   in a sparse array (`tags[1]` and `tags[5]` leave indices 0, 2, 3, 4 unset).
/// - Uses `BTreeMap` for deterministic ordering (cache keys hash the canonical form)
/// - `Date`, `BigInt` and `File` exist so leaf casts have somewhere to land
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value or array hole.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Integer too large for `Integer`.
    BigInt(i128),
    /// UTF-8 string.
    String(String),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Uploaded or staged file.
    File(FileHandle),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

/// A file made available to a resource method.
///
/// The file itself lives on disk; whoever staged it owns its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHandle {
    /// Location of the staged content.
    pub path: PathBuf,
    /// Original file name, if the client sent one.
    pub name: Option<String>,
    /// Declared content type.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
}

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Build a map from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a direct child of a map. Anything else yields `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Human-readable type name, as used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Bytes(_) => "bytes",
            Value::File(_) => "file",
            Value::Array(_) => "array",
            Value::Map(_) => "object",
        }
    }

    /// Render a scalar the way it would appear in a URL or form field.
    ///
    /// Returns `None` for containers, files, bytes and absent values.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::BigInt(i) => Some(i.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Date(d) => Some(d.to_rfc3339()),
            Value::Null => Some(String::new()),
            _ => None,
        }
    }

    /// Overlay the entries of `other` onto this map; colliding keys take
    /// `other`'s value. Non-map operands are replaced wholesale.
    pub fn merge(&mut self, other: Value) {
        match (self.as_map_mut(), other) {
            (Some(map), Value::Map(entries)) => {
                for (key, value) in entries {
                    if !value.is_undefined() {
                        map.insert(key, value);
                    }
                }
            }
            (_, Value::Undefined) => {}
            (_, other) => *self = other,
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::BigInt(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<FileHandle> for Value {
    fn from(v: FileHandle) -> Self {
        Value::File(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Undefined, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;

    #[test]
    fn merge_later_wins() {
        let mut base = Value::Map(btree! {
            "id".into() => Value::from("1"),
            "name".into() => Value::from("old"),
        });
        base.merge(Value::Map(btree! {
            "name".into() => Value::from("new"),
            "skipped".into() => Value::Undefined,
        }));

        assert_eq!(base.get("id"), Some(&Value::from("1")));
        assert_eq!(base.get("name"), Some(&Value::from("new")));
        assert_eq!(base.get("skipped"), None);
    }

    #[test]
    fn merge_replaces_non_map() {
        let mut base = Value::from("scalar");
        base.merge(Value::object([("a", Value::from(1i64))]));
        assert!(base.is_map());
    }

    #[test]
    fn scalar_strings() {
        assert_eq!(Value::from(42i64).to_scalar_string().as_deref(), Some("42"));
        assert_eq!(Value::from(true).to_scalar_string().as_deref(), Some("true"));
        assert_eq!(Value::map().to_scalar_string(), None);
    }

    #[test]
    fn option_conversion() {
        assert!(Value::from(None::<i64>).is_undefined());
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}

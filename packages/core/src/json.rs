//! Conversions between `Value` and `serde_json::Value`.
//!
//! JSON is the wire format for request bodies, envelopes and manifests, so
//! every `Value` has to survive the trip. Types JSON lacks are encoded:
//! dates as RFC 3339 strings, bigints as decimal strings, bytes as base64
//! and files as a `{path, name, type, size}` object.

use base64::Engine;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::value::{FileHandle, Value};

/// Convert our Value to serde_json::Value.
///
/// `Undefined` map entries are dropped; `Undefined` array slots become `null`.
pub fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::BigInt(i) => serde_json::Value::String(i.to_string()),
        Value::String(s) => serde_json::Value::String(s),
        Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        Value::Bytes(b) => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(&b))
        }
        Value::File(file) => file_to_json(file),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_undefined())
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Value::BigInt(u as i128)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

fn file_to_json(file: FileHandle) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(
        "path".to_string(),
        serde_json::Value::String(file.path.to_string_lossy().into_owned()),
    );
    if let Some(name) = file.name {
        map.insert("name".to_string(), serde_json::Value::String(name));
    }
    if let Some(content_type) = file.content_type {
        map.insert("type".to_string(), serde_json::Value::String(content_type));
    }
    map.insert("size".to_string(), serde_json::Value::Number(file.size.into()));
    serde_json::Value::Object(map)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        value_to_json(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(json_to_value)
    }
}

impl Value {
    /// Convert a Rust type to a Value via serde.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value(data).map(json_to_value)
    }

    /// Convert this Value into a Rust type via serde.
    pub fn deserialize_into<T: serde::de::DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(value_to_json(self))
    }
}

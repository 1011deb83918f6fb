//! Flat key/value records as they arrive from forms and query strings.

use std::collections::HashMap;

use isoresource_core::Value;

/// An ordered flat record.
///
/// Keys keep the order they were first seen in. A key submitted more than
/// once (`tags[]=a&tags[]=b`) collapses into a single array entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatRecord {
    entries: Vec<(String, Value)>,
    /// Position of each key in `entries`.
    index: HashMap<String, usize>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    /// Decode an `application/x-www-form-urlencoded` payload.
    pub fn from_urlencoded(input: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(input).map(|(k, v)| (k.into_owned(), v.into_owned())))
    }

    /// Add a value, collapsing repeated keys into an array.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        match self.position(key) {
            Ok(at) => {
                let existing = &mut self.entries[at].1;
                match existing {
                    Value::Array(items) => items.push(value),
                    _ => {
                        let first = std::mem::take(existing);
                        *existing = Value::Array(vec![first, value]);
                    }
                }
            }
            Err(key) => self.push(key, value),
        }
    }

    /// Set a value, replacing whatever the key held.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        match self.position(key) {
            Ok(at) => self.entries[at].1 = value,
            Err(key) => self.push(key, value),
        }
    }

    /// Apply `other` on top of this record; its keys win.
    pub fn overlay(&mut self, other: FlatRecord) {
        for (key, value) in other.entries {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&at| &self.entries[at].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Existing position of `key`, or the owned key back when it is new.
    fn position(&self, key: impl Into<String>) -> Result<usize, String> {
        let key = key.into();
        self.index.get(&key).copied().ok_or(key)
    }

    fn push(&mut self, key: String, value: Value) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }
}

impl IntoIterator for FlatRecord {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

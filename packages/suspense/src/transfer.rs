//! Values resolved during server rendering, waiting to be read once on the client.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use isoresource_core::{json_to_value, Value};

/// One-shot store of transferred reads.
///
/// [`SuspenseCache`](crate::SuspenseCache) consults it before starting a
/// producer. A taken value is gone from here and lives on in the suspense
/// cache, so a later purge leads to a real fetch.
#[derive(Default)]
pub struct TransferCache {
    values: Mutex<HashMap<String, Value>>,
}

impl fmt::Debug for TransferCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values();
        let mut keys: Vec<_> = values.keys().collect();
        keys.sort();
        f.debug_struct("TransferCache").field("keys", &keys).finish()
    }
}

impl TransferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the object the injected scripts populate (key to JSON value).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let values: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(values
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect())
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.values().insert(key.into(), value);
    }

    /// Remove and return the value of `key`.
    pub fn take(&self, key: &str) -> Option<Value> {
        self.values().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

impl FromIterator<(String, Value)> for TransferCache {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: Mutex::new(iter.into_iter().collect()),
        }
    }
}

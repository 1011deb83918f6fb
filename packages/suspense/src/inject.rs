//! Streaming resolved reads into server-rendered HTML.
//!
//! The server records every read its render resolves. Before a chunk that
//! contains the boundary marker is flushed, the pending entries are written
//! as an inline script assigning into a global object, which the client turns
//! into a [`TransferCache`](crate::TransferCache) on hydration.

use std::collections::HashSet;

use isoresource_core::{value_to_json, Value};

use crate::cache::SuspenseCache;

/// Global object the injected statements assign into.
pub const DEFAULT_GLOBAL: &str = "__ISORESOURCE_TRANSFER__";

/// Collects resolved reads and writes each key at most once per response.
#[derive(Debug)]
pub struct ScriptInjector {
    global: String,
    queued: Vec<(String, serde_json::Value)>,
    sent: HashSet<String>,
}

impl Default for ScriptInjector {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL)
    }
}

impl ScriptInjector {
    pub fn new(global: impl Into<String>) -> Self {
        Self {
            global: global.into(),
            queued: Vec::new(),
            sent: HashSet::new(),
        }
    }

    pub fn global(&self) -> &str {
        &self.global
    }

    /// Queue `value` under `key` unless it was queued or sent already.
    pub fn record(&mut self, key: &str, value: &Value) -> bool {
        if self.sent.contains(key) || self.queued.iter().any(|(queued, _)| queued == key) {
            return false;
        }
        self.queued.push((key.to_string(), value_to_json(value.clone())));
        true
    }

    /// Queue every resolved entry of `cache`.
    pub fn collect(&mut self, cache: &SuspenseCache) -> usize {
        cache
            .resolved()
            .iter()
            .filter(|(key, value)| self.record(key, value))
            .count()
    }

    pub fn has_pending(&self) -> bool {
        !self.queued.is_empty()
    }

    /// Render queued entries as one `<script>` element and mark them sent.
    pub fn take_script(&mut self) -> Option<String> {
        if self.queued.is_empty() {
            return None;
        }
        let global = escape_json(&serde_json::Value::String(self.global.clone()));
        let mut script = format!("<script>(function(g){{var t=g[{0}]=g[{0}]||{{}};", global);
        for (key, value) in self.queued.drain(..) {
            let encoded_key = escape_json(&serde_json::Value::String(key.clone()));
            script.push_str(&format!("t[{}]={};", encoded_key, escape_json(&value)));
            self.sent.insert(key);
        }
        script.push_str("})(window);</script>");
        Some(script)
    }

    /// `chunk` with queued entries written before the first `marker`.
    ///
    /// Chunks without the marker pass through untouched and keep the queue.
    pub fn inject(&mut self, chunk: &str, marker: &str) -> String {
        let Some(at) = chunk.find(marker) else {
            return chunk.to_string();
        };
        match self.take_script() {
            Some(script) => {
                let mut out = String::with_capacity(chunk.len() + script.len());
                out.push_str(&chunk[..at]);
                out.push_str(&script);
                out.push_str(&chunk[at..]);
                out
            }
            None => chunk.to_string(),
        }
    }
}

/// JSON that is safe inside an HTML `<script>` element.
fn escape_json(value: &serde_json::Value) -> String {
    let mut escaped = String::new();
    for c in value.to_string().chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

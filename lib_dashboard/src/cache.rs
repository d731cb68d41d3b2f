//! Keyed query cache with stale marking.
//!
//! Views cache REST responses under string keys ("projects",
//! "analysis:7", ...). A notification handler does not receive fresh data; it
//! marks the affected keys stale so the next read misses and the view
//! refetches. The realtime layer knows nothing about this module; the
//! coupling runs one way, from consumers.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

struct CacheEntry {
    value: Value,
    stale: bool,
}

/// Process-wide fetch cache, shared by `Arc` from the composition root.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly fetched value, clearing any stale mark.
    pub fn put(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .expect("query cache lock poisoned")
            .insert(
                key.to_string(),
                CacheEntry {
                    value,
                    stale: false,
                },
            );
    }

    /// Returns the cached value unless the key is absent or marked stale.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().expect("query cache lock poisoned");
        entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    /// Marks one key stale. No-op if absent.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        if let Some(entry) = entries.get_mut(key) {
            entry.stale = true;
            log::debug!("Cache key '{key}' invalidated");
        }
    }

    /// Marks every key starting with `prefix` stale, e.g. `analysis:` when
    /// any project's analysis progresses.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                log::debug!("Cache key '{key}' invalidated");
            }
        }
    }
}

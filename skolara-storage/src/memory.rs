//! In-memory key-value store for tests and sandboxed runtimes.

use crate::KeyValueStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// A `KeyValueStore` backed by a process-local map.
///
/// Used in tests and in runtimes where no writable data directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry in a scope. Test helper for simulating a wiped
    /// store.
    pub fn clear_scope(&self, scope: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(s, _), _| s != scope);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: &str, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(scope.to_string(), key.to_string())).cloned()
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((scope.to_string(), key.to_string()), value.to_string());
        true
    }

    fn remove(&self, scope: &str, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&(scope.to_string(), key.to_string()));
    }
}

//! JSON-file-backed key-value store.
//!
//! Each scope is one JSON object stored as `<data_dir>/<scope>.json`.
//! Writes are read-modify-write of the whole document; the subsystem has a
//! single logical writer, so last-write-wins is sufficient.

use crate::error::{StorageError, StorageResult};
use crate::KeyValueStore;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A `KeyValueStore` persisting each scope as a JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Opens a store rooted at `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        // Scope names are internal identifiers; sanitize anyway so a bad
        // scope cannot escape the data directory.
        let safe: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("{safe}.json"))
    }

    fn read_scope(&self, path: &Path) -> StorageResult<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::InvalidScope(format!(
                "expected object, found {other}"
            ))),
        }
    }

    fn write_scope(&self, path: &Path, map: &Map<String, Value>) -> StorageResult<()> {
        let contents = serde_json::to_string(&Value::Object(map.clone()))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, scope: &str, key: &str) -> Option<String> {
        let path = self.scope_path(scope);
        match self.read_scope(&path) {
            Ok(map) => map.get(key).and_then(|v| v.as_str().map(String::from)),
            Err(err) => {
                warn!(scope, key, %err, "scope document unreadable, treating as absent");
                None
            }
        }
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> bool {
        let path = self.scope_path(scope);
        // An unreadable document is replaced rather than propagated; losing
        // a corrupt scope file is the recovery path here.
        let mut map = self.read_scope(&path).unwrap_or_default();
        map.insert(key.to_string(), Value::String(value.to_string()));
        match self.write_scope(&path, &map) {
            Ok(()) => true,
            Err(err) => {
                warn!(scope, key, %err, "dropping write, persistence unavailable");
                false
            }
        }
    }

    fn remove(&self, scope: &str, key: &str) {
        let path = self.scope_path(scope);
        let Ok(mut map) = self.read_scope(&path) else {
            return;
        };
        if map.remove(key).is_some() {
            if let Err(err) = self.write_scope(&path, &map) {
                warn!(scope, key, %err, "failed to persist removal");
            }
        }
    }
}

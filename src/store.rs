//! Persisted key-value store and typed, versioned collections on top of it.
//!
//! Every collection is written as `{"version": N, "data": ...}`. Values written
//! before the envelope existed (a bare array or object) are read as version 0
//! and migrated on the next write.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u64 = 1;

/// Keys of the persisted collections.
pub mod keys {
    pub const ALERTS: &str = "alerts";
    pub const PORTFOLIO: &str = "portfolio";
    pub const WATCHLIST: &str = "watchlist";
}

/// A string-keyed JSON blob store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default data directory (e.g. `~/.local/share/tickerwatch`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("tickerwatch"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let content = serde_json::to_string_pretty(&value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;

        // Write-then-rename so a crash never leaves a half-written blob.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

/// A value that can be persisted as a versioned collection.
pub trait Versioned: Serialize + DeserializeOwned {
    /// Decode a value written before the envelope existed.
    fn from_legacy(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Reject decoded data that breaks collection invariants.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Typed view over one key of a [`KeyValueStore`].
///
/// Read-modify-write cycles are serialized by an internal lock, so two
/// mutations through the same collection never lose each other's update.
pub struct Collection<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Versioned + Clone + PartialEq,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Read the current value, `None` if the key was never written.
    pub fn load(&self) -> Result<Option<T>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read()
    }

    /// Apply `f` to the current value (or `default()` if absent) and write it
    /// back if it changed.
    pub fn update<R>(
        &self,
        default: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let before = self.read()?;
        let mut value = before.clone().unwrap_or_else(default);
        let result = f(&mut value);
        if before.as_ref() != Some(&value) {
            self.write(&value)?;
        }
        Ok(result)
    }

    fn read(&self) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.store.get(self.key)? else {
            return Ok(None);
        };
        let value = self.decode(raw)?;
        value.check().map_err(|reason| self.malformed(reason))?;
        Ok(Some(value))
    }

    fn decode(&self, raw: Value) -> Result<T, StoreError> {
        match raw {
            Value::Object(mut map) if map.contains_key("version") && map.contains_key("data") => {
                let version = map
                    .get("version")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| self.malformed("version is not a number".to_string()))?;
                if version > SCHEMA_VERSION {
                    return Err(StoreError::UnsupportedVersion {
                        key: self.key.to_string(),
                        version,
                    });
                }
                let data = map.remove("data").unwrap_or(Value::Null);
                serde_json::from_value(data).map_err(|e| self.malformed(e.to_string()))
            }
            legacy => {
                tracing::debug!(key = self.key, "migrating unversioned collection");
                T::from_legacy(legacy).map_err(|e| self.malformed(e.to_string()))
            }
        }
    }

    fn write(&self, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: self.key.to_string(),
            source,
        })?;
        self.store
            .set(self.key, json!({ "version": SCHEMA_VERSION, "data": data }))
    }

    fn malformed(&self, reason: String) -> StoreError {
        tracing::warn!(key = self.key, %reason, "rejecting malformed collection");
        StoreError::Malformed {
            key: self.key.to_string(),
            reason,
        }
    }
}

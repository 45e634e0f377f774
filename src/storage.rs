// storage.rs - Key-value persistence used by the settings store and the cache
// MemoryStore lives for the process (session scope); JsonFileStore keeps one
// pretty-printed JSON object on disk (local scope).

use async_trait::async_trait;
use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SummarizeError};

pub type Entries = HashMap<String, Value>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Values for the requested keys; absent keys are simply missing from the map.
    async fn get(&self, keys: &[String]) -> Result<Entries>;

    async fn get_all(&self) -> Result<Entries>;

    async fn set(&self, entries: Entries) -> Result<()>;

    async fn remove(&self, keys: &[String]) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[String]) -> Result<Entries> {
        let items = self.items.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| items.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<Entries> {
        Ok(self.items.read().await.clone())
    }

    async fn set(&self, entries: Entries) -> Result<()> {
        self.items.write().await.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.write().await;
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}

/// Whole-file JSON store. Every operation reads and rewrites under one lock,
/// so concurrent callers see serialized reads and writes.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| SummarizeError::Storage(format!("read {}: {}", self.path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SummarizeError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(SummarizeError::Storage(format!("parse {}: {}", self.path.display(), e))),
        }
    }

    fn write_file(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SummarizeError::Storage(e.to_string()))?;
            }
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| SummarizeError::Storage(e.to_string()))?;
        let mut handle = std::fs::File::create(&self.path)
            .map_err(|e| SummarizeError::Storage(format!("write {}: {}", self.path.display(), e)))?;
        handle
            .write_all(json.as_bytes())
            .map_err(|e| SummarizeError::Storage(e.to_string()))?;
        trace!("[TRACE][STORE] wrote {} keys to {}", map.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[String]) -> Result<Entries> {
        let _guard = self.lock.lock().await;
        let map = self.read_file()?;
        Ok(keys
            .iter()
            .filter_map(|k| map.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<Entries> {
        let _guard = self.lock.lock().await;
        Ok(self.read_file()?.into_iter().collect())
    }

    async fn set(&self, entries: Entries) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_file()?;
        map.extend(entries);
        self.write_file(&map)
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_file()?;
        let before = map.len();
        for key in keys {
            map.remove(key);
        }
        if map.len() == before {
            return Ok(());
        }
        debug!("🗑️ Removed {} keys from {}", before - map.len(), self.path.display());
        self.write_file(&map)
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use super::Storage;

/// Session file name in the state directory
pub const SESSION_FILE: &str = "session.json";

/// Key/value pairs kept in a single pretty-printed JSON object on disk.
///
/// Every write rewrites the whole file; the mutex serializes read-modify-write
/// cycles within one process.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by `<state_dir>/session.json`
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self::at(state_dir.as_ref().join(SESSION_FILE))
    }

    /// Store backed by an explicit file path
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file {}", self.path.display()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("file store lock poisoned"))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl Storage for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("file store lock poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, "Persisting session value");
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        debug!(key, "Removing session value");
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

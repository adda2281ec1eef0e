//! Per-user history of submitted analysis filters, stored as one JSON blob
//! per user in a key/value store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use sentinel_common::{AnalysisInput, SentinelError};

/// Entries kept per user.
pub const MAX_HISTORY: usize = 20;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SentinelError>;
    fn put(&self, key: &str, value: &str) -> Result<(), SentinelError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SentinelError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SentinelError::Storage("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SentinelError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SentinelError::Storage("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Percent-encoded key, so distinct keys never share a file and no key
    /// can escape `dir`.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SentinelError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SentinelError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Most-recent-first list of a user's submitted filters, capped at `MAX_HISTORY`.
pub struct RunHistory<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RunHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn key(user_id: &str) -> String {
        format!("analysis_history_{user_id}")
    }

    pub fn load(&self, user_id: &str) -> Result<Vec<AnalysisInput>, SentinelError> {
        match self.store.get(&Self::key(user_id))? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    /// Put `input` at the front and drop anything past the cap.
    pub fn record(
        &self,
        user_id: &str,
        input: &AnalysisInput,
    ) -> Result<Vec<AnalysisInput>, SentinelError> {
        let mut entries = self.load(user_id)?;
        entries.insert(0, input.clone());
        entries.truncate(MAX_HISTORY);
        self.save(user_id, &entries)?;
        info!(user_id, entries = entries.len(), "Recorded analysis in history");
        Ok(entries)
    }

    pub fn save(&self, user_id: &str, entries: &[AnalysisInput]) -> Result<(), SentinelError> {
        let entries = &entries[..entries.len().min(MAX_HISTORY)];
        let blob = serde_json::to_string(entries)?;
        debug!(user_id, bytes = blob.len(), "Saving history");
        self.store.put(&Self::key(user_id), &blob)
    }

    pub fn clear(&self, user_id: &str) -> Result<(), SentinelError> {
        self.save(user_id, &[])
    }
}

//! Persistence collaborator for [`TrackFile`] records
//!
//! The ingestion core only needs to insert, overwrite and read whole records, so the
//! trait stays that small. Two implementations are provided:
//!
//! - [`MemoryStore`]: a concurrent map, for tests and embedding
//! - [`FileStore`]: a single JSON document mapping ids to records, read once on open
//!   and flushed back to disk after every write

use crate::{TrackFile, TrackFileId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for track file records.
///
/// Every write replaces the whole record at once.
pub trait TrackFileStore: Send + Sync {
    /// Store a new record (or replace one with the same id)
    fn save(&self, file: &TrackFile) -> StoreResult<()>;

    /// Read a record. Returns Ok(None) when the id is unknown.
    fn load(&self, id: &TrackFileId) -> StoreResult<Option<TrackFile>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<TrackFileId, TrackFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TrackFileStore for MemoryStore {
    fn save(&self, file: &TrackFile) -> StoreResult<()> {
        self.records.insert(file.id, file.clone());
        Ok(())
    }

    fn load(&self, id: &TrackFileId) -> StoreResult<Option<TrackFile>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }
}

/// JSON-file backed store
pub struct FileStore {
    /// Path to the backing JSON file.
    path: PathBuf,
    /// In-memory copy of id -> record
    inner: Mutex<HashMap<TrackFileId, TrackFile>>,
}

impl FileStore {
    /// Open (or create) the store at `path`, creating parent directories as needed
    pub fn new_with_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create store parent directory: {e}"))
            })?;
        }

        let mut records = HashMap::new();
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| StoreError::Io(format!("Failed to read store file: {e}")))?;
            if !contents.trim().is_empty() {
                records = serde_json::from_str(&contents)
                    .map_err(|e| StoreError::Json(format!("Failed to parse store JSON: {e}")))?;
            }
        }

        tracing::debug!(path = %path.display(), records = records.len(), "Opened track file store");

        Ok(Self {
            path,
            inner: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_locked(&self, locked: &HashMap<TrackFileId, TrackFile>) -> StoreResult<()> {
        let s = serde_json::to_string_pretty(locked).map_err(|e| StoreError::Json(e.to_string()))?;
        fs::write(&self.path, s).map_err(|e| StoreError::Io(format!("write failed: {e}")))
    }
}

impl TrackFileStore for FileStore {
    fn save(&self, file: &TrackFile) -> StoreResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        guard.insert(file.id, file.clone());
        self.flush_locked(&guard)
    }

    fn load(&self, id: &TrackFileId) -> StoreResult<Option<TrackFile>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

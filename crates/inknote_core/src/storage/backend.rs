//! Storage backends for the notes document.
//!
//! # Responsibility
//! - Read and atomically replace the document on local disk.
//! - Offer an in-memory backend with write accounting and failure injection.
//!
//! # Invariants
//! - File writes go to a sibling temp file, are fsynced, then renamed over
//!   the target.
//! - A failed file write leaves the previous document untouched.

use super::{NoteStorage, StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// File name of the notes document inside the app data directory.
pub const DOCUMENT_FILE_NAME: &str = "notes.json";

const TEMP_SUFFIX: &str = ".tmp";

/// Notes document stored as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `DOCUMENT_FILE_NAME` inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(DOCUMENT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_else(|| DOCUMENT_FILE_NAME.into());
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }

    fn write_temp_then_rename(&self, temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(temp_path, &self.path)
    }
}

impl NoteStorage for JsonFileStorage {
    fn read_document(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn write_document(&mut self, bytes: &[u8]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        if let Err(err) = self.write_temp_then_rename(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "file"
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    document: Option<Vec<u8>>,
    write_count: usize,
    fail_writes: bool,
}

/// In-memory backend. Clones share the same underlying document, so a
/// caller can keep a handle to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an existing document, as if loaded from disk.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        let storage = Self::new();
        storage.lock().document = Some(bytes.into());
        storage
    }

    /// Current document bytes, if any.
    pub fn document(&self) -> Option<Vec<u8>> {
        self.lock().document.clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// When set, every write fails and the stored document is left unchanged.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NoteStorage for MemoryStorage {
    fn read_document(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock().document.clone())
    }

    fn write_document(&mut self, bytes: &[u8]) -> StorageResult<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StorageError::WriteRejected(
                "memory storage configured to fail writes".to_string(),
            ));
        }
        state.document = Some(bytes.to_vec());
        state.write_count += 1;
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "memory"
    }
}

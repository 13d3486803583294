//! Persisted document storage.
//!
//! # Responsibility
//! - Define the byte-level storage contract the note store writes through.
//! - Provide file-backed and in-memory backends.
//! - Encode/decode the notes document, including the legacy flat-list shape.
//!
//! # Invariants
//! - A write replaces the whole document atomically; readers never observe a
//!   partially written document.
//! - A missing document is not an error (`read_document` returns `None`).

use std::error::Error;
use std::fmt::{Display, Formatter};

mod backend;
pub mod document;

pub use backend::{JsonFileStorage, MemoryStorage, DOCUMENT_FILE_NAME};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    /// Serializing the in-memory catalogs failed.
    Encode(serde_json::Error),
    /// Stored bytes are not valid JSON or do not match the note schema.
    Decode(serde_json::Error),
    /// Stored JSON parsed but its top-level shape is not recognized.
    UnexpectedShape(&'static str),
    /// Backend refused the write (used by the in-memory backend).
    WriteRejected(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode notes document: {err}"),
            Self::Decode(err) => write!(f, "failed to decode notes document: {err}"),
            Self::UnexpectedShape(found) => {
                write!(f, "notes document has unexpected top-level {found}")
            }
            Self::WriteRejected(reason) => write!(f, "write rejected: {reason}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::UnexpectedShape(_) | Self::WriteRejected(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Byte-level persistence contract for the single notes document.
pub trait NoteStorage {
    /// Reads the whole document, or `None` when nothing was written yet.
    fn read_document(&self) -> StorageResult<Option<Vec<u8>>>;
    /// Atomically replaces the whole document.
    fn write_document(&mut self, bytes: &[u8]) -> StorageResult<()>;
    /// Short backend label used in log events (`file`, `memory`).
    fn mode(&self) -> &'static str;
}

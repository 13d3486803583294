//! Notes document codec.
//!
//! # Responsibility
//! - Serialize the active and recently-deleted catalogs as one JSON document.
//! - Accept the legacy flat-array shape and partition it by `deletedAt`.
//!
//! # Invariants
//! - Output object keys are sorted and pretty-printed.
//! - Legacy notes with `deletedAt` land in `recently_deleted`, others in
//!   `notes`; ordering is left to the store.

use super::{StorageError, StorageResult};
use crate::model::note::Note;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Owned form of the persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub recently_deleted: Vec<Note>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocumentRef<'a> {
    notes: &'a [Note],
    recently_deleted: &'a [Note],
}

/// Shape the document was stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// `{ "notes": [...], "recentlyDeleted": [...] }`
    Current,
    /// Bare array of notes; soft-deleted notes carry `deletedAt`.
    LegacyFlatList,
}

impl DocumentShape {
    pub fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::LegacyFlatList => "legacy_flat_list",
        }
    }
}

/// Decoded document plus the shape it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    pub document: StoreDocument,
    pub shape: DocumentShape,
}

/// Encodes both catalogs into document bytes without cloning them.
pub fn encode_document(notes: &[Note], recently_deleted: &[Note]) -> StorageResult<Vec<u8>> {
    let borrowed = StoreDocumentRef {
        notes,
        recently_deleted,
    };
    // Round-tripping through `Value` sorts object keys (BTreeMap-backed map).
    let value = serde_json::to_value(&borrowed).map_err(StorageError::Encode)?;
    serde_json::to_vec_pretty(&value).map_err(StorageError::Encode)
}

/// Decodes document bytes in either the current or the legacy shape.
pub fn decode_document(bytes: &[u8]) -> StorageResult<DecodedDocument> {
    let value: Value = serde_json::from_slice(bytes).map_err(StorageError::Decode)?;
    match value {
        Value::Object(_) => {
            let document =
                serde_json::from_value::<StoreDocument>(value).map_err(StorageError::Decode)?;
            Ok(DecodedDocument {
                document,
                shape: DocumentShape::Current,
            })
        }
        Value::Array(_) => {
            let notes = serde_json::from_value::<Vec<Note>>(value).map_err(StorageError::Decode)?;
            Ok(DecodedDocument {
                document: split_legacy_notes(notes),
                shape: DocumentShape::LegacyFlatList,
            })
        }
        Value::Null => Err(StorageError::UnexpectedShape("null")),
        Value::Bool(_) => Err(StorageError::UnexpectedShape("boolean")),
        Value::Number(_) => Err(StorageError::UnexpectedShape("number")),
        Value::String(_) => Err(StorageError::UnexpectedShape("string")),
    }
}

/// Partitions a legacy flat list by presence of `deleted_at`.
pub fn split_legacy_notes(notes: Vec<Note>) -> StoreDocument {
    let (recently_deleted, notes): (Vec<Note>, Vec<Note>) =
        notes.into_iter().partition(Note::is_deleted);
    StoreDocument {
        notes,
        recently_deleted,
    }
}

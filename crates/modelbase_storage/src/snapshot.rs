//! Whole-store snapshots using `MessagePack`.
//!
//! A [`StoreSnapshot`] captures the in-memory document store, blob store and
//! model state so a model can be saved to and reloaded from a single file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use modelbase_foundation::{Error, Result};

use crate::blob::MemoryBlobStore;
use crate::document::Document;
use crate::model_state::{ModelEntry, ModelState};
use crate::store::MemoryDocumentStore;

/// Serializable image of the in-memory stores.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Every stored document version.
    pub documents: Vec<Document>,
    /// Every blob, as `(key, bytes)`.
    pub blobs: Vec<(Vec<u8>, Vec<u8>)>,
    /// Tracked model entries.
    pub model_state: Vec<ModelEntry>,
}

impl StoreSnapshot {
    /// Captures the current contents of the stores.
    #[must_use]
    pub fn capture(
        documents: &MemoryDocumentStore,
        blobs: &MemoryBlobStore,
        model_state: &ModelState,
    ) -> Self {
        Self {
            documents: documents.export(),
            blobs: blobs.export(),
            model_state: model_state.export(),
        }
    }

    /// Rebuilds the stores from this snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is internally inconsistent.
    pub fn restore(self) -> Result<(MemoryDocumentStore, MemoryBlobStore, ModelState)> {
        Ok((
            MemoryDocumentStore::import(self.documents)?,
            MemoryBlobStore::import(self.blobs),
            ModelState::import(self.model_state)?,
        ))
    }
}

/// Serializes a snapshot to bytes using `MessagePack` format.
///
/// Uses named serialization to preserve struct field names.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes(snapshot: &StoreSnapshot) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(snapshot).map_err(|e| Error::serialization(e.to_string()))
}

/// Deserializes a snapshot from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails.
pub fn from_bytes(bytes: &[u8]) -> Result<StoreSnapshot> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}

/// Saves a snapshot to a file, creating or overwriting it.
///
/// # Errors
///
/// Returns an error if the file cannot be written or serialization fails.
pub fn save_to_file<P: AsRef<Path>>(snapshot: &StoreSnapshot, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::io(format!("failed to create file '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    let bytes = to_bytes(snapshot)?;

    writer
        .write_all(&bytes)
        .map_err(|e| Error::io(format!("failed to write to file '{}': {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| Error::io(format!("failed to flush file '{}': {e}", path.display())))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "store snapshot saved");
    Ok(())
}

/// Loads a snapshot from a `MessagePack` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or deserialization fails.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<StoreSnapshot> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::io(format!("failed to open file '{}': {e}", path.display())))?;

    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(format!("failed to read file '{}': {e}", path.display())))?;

    from_bytes(&bytes)
}

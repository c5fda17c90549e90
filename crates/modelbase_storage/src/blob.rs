//! Raw blob storage for payloads too large to embed in documents.
//!
//! Blobs are arbitrary byte sequences stored by key. The overflow store keys
//! its chunks by blob id and chunk index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use modelbase_foundation::{Error, Result};

/// Backend for blob storage.
pub trait BlobStore: Send + Sync {
    /// Stores `blob` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot write.
    fn put(&self, key: &[u8], blob: &[u8]) -> Result<()>;

    /// Retrieves the blob under `key`; `Ok(None)` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot read.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Deletes the blob under `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot delete.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Returns true if a blob exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot read.
    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.get(key).map(|blob| blob.is_some())
    }
}

/// In-memory [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blob is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Returns a copy of every `(key, blob)` pair, ordered by key.
    #[must_use]
    pub fn export(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut pairs: Vec<_> = self
            .blobs
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    /// Builds a store from exported pairs.
    #[must_use]
    pub fn import(pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            blobs: RwLock::new(pairs.into_iter().collect()),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &[u8], blob: &[u8]) -> Result<()> {
        self.blobs.write().insert(key.to_vec(), blob.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.blobs.read().contains_key(key))
    }
}

/// File-based [`BlobStore`].
///
/// Each blob is one file named by the hex-encoded key, in a two-level
/// directory layout (`a1/b2/a1b2c3...`) so no directory grows too large.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    base_path: PathBuf,
}

impl FileBlobStore {
    /// Opens a store rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            Error::io(format!(
                "failed to create blob directory '{}': {e}",
                base_path.display()
            ))
        })?;
        Ok(Self { base_path })
    }

    /// Returns the directory this store writes to.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &[u8]) -> PathBuf {
        let hex_key = hex::encode(key);
        if hex_key.len() >= 4 {
            self.base_path
                .join(&hex_key[0..2])
                .join(&hex_key[2..4])
                .join(&hex_key)
        } else {
            self.base_path.join(&hex_key)
        }
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, key: &[u8], blob: &[u8]) -> Result<()> {
        let path = self.key_to_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("failed to create '{}': {e}", parent.display())))?;
        }

        // Write then rename so a reader never sees a half-written blob.
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, blob)
            .map_err(|e| Error::io(format!("failed to write '{}': {e}", temp_path.display())))?;
        std::fs::rename(&temp_path, &path)
            .map_err(|e| Error::io(format!("failed to rename '{}': {e}", path.display())))?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = self.key_to_path(key);
        match std::fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(format!("failed to read '{}': {e}", path.display()))),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let path = self.key_to_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("failed to delete '{}': {e}", path.display()))),
        }
    }
}

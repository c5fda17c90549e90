//! Inline-or-chunked storage of binary payloads.
//!
//! A payload up to the configured threshold is embedded in the owner's own
//! document as hex text. A larger payload is split into fixed-size chunks in a
//! [`BlobStore`] and the document holds only a [`BinaryRef::Blob`] reference.
//!
//! Stored form of a reference:
//!
//! ```text
//! {"Inline": "48656c6c6f"}
//! {"Blob": {"id": 4294967297, "length": 52428800, "chunks": 201}}
//! ```

use std::sync::Arc;

use serde_json::{Map, Value as Json};

use modelbase_foundation::{Error, IdentityCell, Result, StoreConfig};

use crate::blob::BlobStore;

/// Reference to a binary payload, embedded in the owner's document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinaryRef {
    /// The payload itself.
    Inline(Vec<u8>),
    /// A payload stored as chunks in the blob store.
    Blob {
        /// Blob identifier, issued by the identity generator.
        id: u64,
        /// Total payload length in bytes.
        length: u64,
        /// Number of chunks.
        chunks: u32,
    },
}

impl BinaryRef {
    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Inline(bytes) => bytes.len() as u64,
            Self::Blob { length, .. } => *length,
        }
    }

    /// Returns true for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the payload is embedded.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// Converts the reference to its stored JSON form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut object = Map::new();
        match self {
            Self::Inline(bytes) => {
                object.insert("Inline".into(), Json::from(hex::encode(bytes)));
            }
            Self::Blob { id, length, chunks } => {
                let mut blob = Map::new();
                blob.insert("id".into(), Json::from(*id));
                blob.insert("length".into(), Json::from(*length));
                blob.insert("chunks".into(), Json::from(*chunks));
                object.insert("Blob".into(), Json::Object(blob));
            }
        }
        Json::Object(object)
    }

    /// Reads a reference from its stored JSON form; `field` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns an invalid field error for any other shape.
    pub fn from_json(field: &str, json: &Json) -> Result<Self> {
        let invalid = || Error::invalid_field(field, "binary reference");
        let object = json.as_object().ok_or_else(invalid)?;

        if let Some(text) = object.get("Inline") {
            let bytes = text
                .as_str()
                .and_then(|t| hex::decode(t).ok())
                .ok_or_else(invalid)?;
            return Ok(Self::Inline(bytes));
        }

        let blob = object
            .get("Blob")
            .and_then(Json::as_object)
            .ok_or_else(invalid)?;
        let number = |key: &str| blob.get(key).and_then(Json::as_u64).ok_or_else(invalid);
        Ok(Self::Blob {
            id: number("id")?,
            length: number("length")?,
            chunks: u32::try_from(number("chunks")?).map_err(|_| invalid())?,
        })
    }
}

/// Key of one overflow chunk in the blob store.
#[must_use]
pub fn chunk_key(blob_id: u64, chunk: u32) -> [u8; 12] {
    let mut key = [0_u8; 12];
    key[..8].copy_from_slice(&blob_id.to_be_bytes());
    key[8..].copy_from_slice(&chunk.to_be_bytes());
    key
}

/// Decides per payload between inline and chunked storage.
pub struct BinaryOverflowStore {
    blobs: Arc<dyn BlobStore>,
    identities: Arc<IdentityCell>,
    inline_threshold: usize,
    chunk_size: usize,
}

impl std::fmt::Debug for BinaryOverflowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryOverflowStore")
            .field("inline_threshold", &self.inline_threshold)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl BinaryOverflowStore {
    /// Creates an overflow store over `blobs`, drawing blob ids from `identities`.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `config` is invalid.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        identities: Arc<IdentityCell>,
        config: &StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            blobs,
            identities,
            inline_threshold: config.inline_threshold,
            chunk_size: config.chunk_size,
        })
    }

    /// Returns the inline threshold in bytes.
    #[must_use]
    pub fn inline_threshold(&self) -> usize {
        self.inline_threshold
    }

    /// Returns the underlying blob store.
    #[must_use]
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Stores `bytes`, inline if they fit under the threshold.
    ///
    /// # Errors
    ///
    /// Fails if no blob id can be issued or a chunk cannot be written; chunks
    /// already written by the failed call are removed again.
    pub fn write(&self, bytes: &[u8]) -> Result<BinaryRef> {
        if bytes.len() <= self.inline_threshold {
            tracing::trace!(len = bytes.len(), "binary payload stored inline");
            return Ok(BinaryRef::Inline(bytes.to_vec()));
        }

        let id = self.identities.next()?;
        let mut chunks = 0_u32;
        for piece in bytes.chunks(self.chunk_size) {
            if let Err(e) = self.blobs.put(&chunk_key(id, chunks), piece) {
                self.remove_chunks(id, chunks);
                return Err(e);
            }
            chunks += 1;
        }

        tracing::trace!(blob = id, len = bytes.len(), chunks, "binary payload overflowed");
        Ok(BinaryRef::Blob {
            id,
            length: bytes.len() as u64,
            chunks,
        })
    }

    /// Returns the payload a reference points to.
    ///
    /// # Errors
    ///
    /// Reports a missing chunk as an I/O error and a total that disagrees
    /// with the recorded length as a length mismatch.
    pub fn read(&self, reference: &BinaryRef) -> Result<Vec<u8>> {
        match reference {
            BinaryRef::Inline(bytes) => Ok(bytes.clone()),
            BinaryRef::Blob { id, length, chunks } => {
                let expected = usize::try_from(*length)
                    .map_err(|_| Error::invalid_field("length", "payload size"))?;
                let mut bytes = Vec::with_capacity(expected);
                for chunk in 0..*chunks {
                    let piece = self.blobs.get(&chunk_key(*id, chunk))?.ok_or_else(|| {
                        Error::io(format!("overflow blob {id} is missing chunk {chunk}"))
                    })?;
                    bytes.extend_from_slice(&piece);
                }
                if bytes.len() != expected {
                    return Err(Error::length_mismatch(expected, bytes.len()));
                }
                Ok(bytes)
            }
        }
    }

    /// Removes the chunks of an overflowed payload. Inline references need nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store cannot delete.
    pub fn delete(&self, reference: &BinaryRef) -> Result<()> {
        if let BinaryRef::Blob { id, chunks, .. } = reference {
            for chunk in 0..*chunks {
                self.blobs.delete(&chunk_key(*id, chunk))?;
            }
        }
        Ok(())
    }

    fn remove_chunks(&self, id: u64, written: u32) {
        for chunk in 0..written {
            if let Err(e) = self.blobs.delete(&chunk_key(id, chunk)) {
                tracing::warn!(blob = id, chunk, error = %e, "failed to remove partial overflow chunk");
            }
        }
    }
}

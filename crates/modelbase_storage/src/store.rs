//! Versioned document storage.
//!
//! Documents are addressed by `(EntityID, Version)`. A stored version is
//! immutable: fetching it always yields the same document.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use modelbase_foundation::{EntityIdentity, Error, Result};

use crate::document::Document;

/// Backend holding entity documents.
pub trait DocumentStore: Send + Sync {
    /// Writes a document keyed by its `EntityID` and `Version` fields.
    ///
    /// Re-inserting identical content for an existing key is a no-op.
    ///
    /// # Errors
    ///
    /// - missing or invalid identity fields
    /// - a precondition violation if the key exists with different content
    /// - [`ErrorKind::StoreFailed`](modelbase_foundation::ErrorKind::StoreFailed) on backend failure
    fn insert(&self, document: Document) -> Result<EntityIdentity>;

    /// Fetches the document stored for `(id, version)`.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure; absence is `Ok(None)`.
    fn fetch(&self, id: u64, version: u64) -> Result<Option<Document>>;

    /// Returns true if a document exists for `(id, version)`.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    fn contains(&self, id: u64, version: u64) -> Result<bool> {
        self.fetch(id, version).map(|doc| doc.is_some())
    }

    /// Returns the number of stored documents.
    fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches `identity`, turning absence into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DocumentNotFound`](modelbase_foundation::ErrorKind::DocumentNotFound)
    /// if nothing is stored under `identity`.
    fn fetch_required(&self, identity: EntityIdentity) -> Result<Document> {
        self.fetch(identity.id, identity.version)?
            .ok_or_else(|| Error::document_not_found(identity.id, identity.version))
    }
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<(u64, u64), Document>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored version of `id`, ascending.
    #[must_use]
    pub fn versions(&self, id: u64) -> Vec<u64> {
        self.documents
            .read()
            .range((id, 0)..=(id, u64::MAX))
            .map(|(&(_, version), _)| version)
            .collect()
    }

    /// Returns a copy of every stored document, ordered by identity.
    #[must_use]
    pub fn export(&self) -> Vec<Document> {
        self.documents.read().values().cloned().collect()
    }

    /// Builds a store from exported documents.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`DocumentStore::insert`].
    pub fn import(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let store = Self::new();
        for document in documents {
            store.insert(document)?;
        }
        Ok(store)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, document: Document) -> Result<EntityIdentity> {
        let identity = document.identity()?;
        if !identity.is_stored() {
            return Err(Error::precondition(format!(
                "document identity {identity:?} is not assigned"
            )));
        }

        let mut documents = self.documents.write();
        if let Some(existing) = documents.get(&(identity.id, identity.version)) {
            if *existing == document {
                return Ok(identity);
            }
            return Err(Error::precondition(format!(
                "version {identity} already stored with different content"
            )));
        }

        tracing::trace!(%identity, keys = document.len(), "document inserted");
        documents.insert((identity.id, identity.version), document);
        Ok(identity)
    }

    fn fetch(&self, id: u64, version: u64) -> Result<Option<Document>> {
        Ok(self.documents.read().get(&(id, version)).cloned())
    }

    fn len(&self) -> usize {
        self.documents.read().len()
    }
}

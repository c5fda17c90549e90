//! The collaborators one process persists entities through.

use std::sync::Arc;

use modelbase_foundation::{IdentityCell, IdentityGenerator, Result, StoreConfig};
use modelbase_storage::{
    BinaryOverflowStore, BlobStore, DocumentStore, MemoryBlobStore, MemoryDocumentStore, ModelState,
};

use crate::registry::{EntityFactory, EntityRegistry};

/// Bundle of stores, identity source, model state and factory.
///
/// Cheap to clone; every part is shared.
#[derive(Clone)]
pub struct Session {
    documents: Arc<dyn DocumentStore>,
    overflow: Arc<BinaryOverflowStore>,
    model_state: Arc<ModelState>,
    identities: Arc<IdentityCell>,
    factory: Arc<dyn EntityFactory>,
    config: Arc<StoreConfig>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("documents", &self.documents.len())
            .field("model_state", &self.model_state.len())
            .field("identities_installed", &self.identities.is_installed())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over the given stores.
    ///
    /// `identities` may still be empty; it must be installed before the first
    /// entity is stored.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `config` is invalid.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        identities: Arc<IdentityCell>,
        config: StoreConfig,
    ) -> Result<Self> {
        let overflow = BinaryOverflowStore::new(blobs, Arc::clone(&identities), &config)?;
        Ok(Self {
            documents,
            overflow: Arc::new(overflow),
            model_state: Arc::new(ModelState::new()),
            identities,
            factory: Arc::new(EntityRegistry::with_builtin_types()),
            config: Arc::new(config),
        })
    }

    /// Creates a session over fresh in-memory stores with a generator
    /// installed for the configured session and service.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `config` is invalid.
    pub fn in_memory(config: StoreConfig) -> Result<Self> {
        let generator = IdentityGenerator::new(config.session_id, config.service_id)?;
        Self::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(IdentityCell::with_generator(Arc::new(generator))),
            config,
        )
    }

    /// Replaces the model state, e.g. with one shared by several sessions.
    #[must_use]
    pub fn with_model_state(mut self, model_state: Arc<ModelState>) -> Self {
        self.model_state = model_state;
        self
    }

    /// Replaces the factory used to instantiate restored entities.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn EntityFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// The document store.
    #[must_use]
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// The binary overflow store.
    #[must_use]
    pub fn overflow(&self) -> &BinaryOverflowStore {
        &self.overflow
    }

    /// The model state.
    #[must_use]
    pub fn model_state(&self) -> &Arc<ModelState> {
        &self.model_state
    }

    /// The identity cell.
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityCell> {
        &self.identities
    }

    /// The entity factory.
    #[must_use]
    pub fn factory(&self) -> &Arc<dyn EntityFactory> {
        &self.factory
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Issues the next identifier (used for both ids and versions).
    ///
    /// # Errors
    ///
    /// Returns a precondition violation before a generator is installed.
    pub fn next_id(&self) -> Result<u64> {
        self.identities.next()
    }
}

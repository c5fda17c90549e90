//! Store failures and schema checks

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use modelbase_entity::{EntityCore, EntityGraph, Session, VectorData};
use modelbase_foundation::{
    EntityIdentity, Error, ErrorKind, IdentityCell, IdentityGenerator, Result, StoreConfig,
};
use modelbase_storage::{
    Document, DocumentStore, MemoryBlobStore, MemoryDocumentStore, schema_version_key,
};

/// Document store whose writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryDocumentStore,
    failing: AtomicBool,
}

impl DocumentStore for FlakyStore {
    fn insert(&self, document: Document) -> Result<EntityIdentity> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::store_failed("write timed out"));
        }
        self.inner.insert(document)
    }

    fn fetch(&self, id: u64, version: u64) -> Result<Option<Document>> {
        self.inner.fetch(id, version)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn flaky_session() -> (Session, Arc<FlakyStore>) {
    let store = Arc::new(FlakyStore::default());
    let identities = Arc::new(IdentityCell::with_generator(Arc::new(
        IdentityGenerator::new(1, 1).unwrap(),
    )));
    let session = Session::new(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        identities,
        StoreConfig::testing(),
    )
    .unwrap();
    (session, store)
}

// =============================================================================
// Failed Stores
// =============================================================================

#[test]
fn failed_store_keeps_entity_modified_at_previous_version() {
    let (session, store) = flaky_session();
    let mut graph = EntityGraph::new(session);
    let node = graph.insert(EntityCore::new("Results/Field"), VectorData::new(&[1.0, 2.0], 0.0));
    graph.store(node).unwrap();
    let stored = graph.get(node).unwrap().identity();

    graph
        .body_mut::<VectorData>(node)
        .unwrap()
        .set_values(&[5.0, 5.0, 5.0], 0.0);
    graph.get_mut(node).unwrap().set_modified();
    store.failing.store(true, Ordering::SeqCst);

    let err = graph.store(node).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StoreFailed(_)));
    assert_eq!(graph.get(node).unwrap().identity(), stored);
    assert!(graph.get(node).unwrap().is_modified());
    assert_eq!(store.len(), 1);

    store.failing.store(false, Ordering::SeqCst);
    graph.store(node).unwrap();
    let retried = graph.get(node).unwrap().identity();
    assert_eq!(retried.id, stored.id);
    assert!(retried.version > stored.version);
    assert!(!graph.get(node).unwrap().is_modified());
    assert_eq!(store.len(), 2);
}

#[test]
fn store_failure_reports_the_entity() {
    let (session, store) = flaky_session();
    store.failing.store(true, Ordering::SeqCst);
    let mut graph = EntityGraph::new(session);
    let node = graph.insert(EntityCore::new("Results/Field"), VectorData::new(&[1.0], 0.0));

    let err = graph.store(node).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StoreFailed(_)));
    let context = err.context.unwrap().to_string();
    assert!(context.contains("EntityCompressedVector 'Results/Field'"));
    assert_eq!(graph.get(node).unwrap().version(), 0);
}

// =============================================================================
// Schema Checks
// =============================================================================

#[test]
fn newer_schema_version_is_rejected_on_restore() {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut graph = EntityGraph::new(session.clone());
    let node = graph.insert(EntityCore::new("Results/Field"), VectorData::new(&[1.0, 1.0], 0.0));
    graph.store(node).unwrap();
    let stored = graph.get(node).unwrap().identity();

    let mut doc = session.documents().fetch_required(stored).unwrap();
    let bumped = session.next_id().unwrap();
    doc.insert(schema_version_key("EntityCompressedVector"), 2_i64);
    doc.insert("Version", bumped);
    session.documents().insert(doc).unwrap();

    let mut restored = EntityGraph::new(session);
    let err = restored
        .restore(EntityIdentity::new(stored.id, bumped), None)
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::SchemaMismatch { expected: 1, found: 2, .. }
    ));
    assert!(restored.is_empty());

    // The original version still restores.
    restored.restore(stored, None).unwrap();
}

#[test]
fn restoring_an_absent_document() {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut graph = EntityGraph::new(session);
    let err = graph.restore(EntityIdentity::new(77, 78), None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DocumentNotFound { id: 77, version: 78 }));
}

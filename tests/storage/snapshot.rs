//! Integration tests for store snapshots

use std::sync::Arc;

use modelbase_foundation::EntityKind::Topology;
use modelbase_foundation::{IdentityCell, IdentityGenerator, StoreConfig};
use modelbase_storage::document::{ENTITY_ID_KEY, VERSION_KEY};
use modelbase_storage::snapshot::{from_bytes, load_from_file, save_to_file, to_bytes};
use modelbase_storage::{
    BinaryOverflowStore, Document, DocumentStore, MemoryBlobStore, MemoryDocumentStore,
    ModelState, StoreSnapshot,
};

fn populated() -> (MemoryDocumentStore, Arc<MemoryBlobStore>, ModelState, Document) {
    let documents = MemoryDocumentStore::new();
    let blobs = Arc::new(MemoryBlobStore::new());
    let identities = Arc::new(IdentityCell::with_generator(Arc::new(
        IdentityGenerator::new(1, 1).unwrap(),
    )));
    let overflow =
        BinaryOverflowStore::new(blobs.clone(), identities, &StoreConfig::testing()).unwrap();
    let reference = overflow.write(&[9; 200]).unwrap();

    let mut doc = Document::new();
    doc.insert(ENTITY_ID_KEY, 5_u64);
    doc.insert(VERSION_KEY, 6_u64);
    doc.insert("Data", reference.to_json());
    documents.insert(doc.clone()).unwrap();

    let model_state = ModelState::new();
    model_state.record(5, 0, 6, Topology).unwrap();
    (documents, blobs, model_state, doc)
}

#[test]
fn bytes_round_trip() {
    let (documents, blobs, model_state, _) = populated();
    let snapshot = StoreSnapshot::capture(&documents, &blobs, &model_state);
    let bytes = to_bytes(&snapshot).unwrap();
    assert_eq!(from_bytes(&bytes).unwrap(), snapshot);
    assert!(from_bytes(&bytes[..bytes.len() / 2]).is_err());
}

#[test]
fn file_round_trip_restores_every_store() {
    let (documents, blobs, model_state, doc) = populated();
    let path = std::env::temp_dir().join(format!("modelbase_snapshot_{}.msgpack", std::process::id()));

    save_to_file(&StoreSnapshot::capture(&documents, &blobs, &model_state), &path).unwrap();
    let (documents, blobs, model_state) = load_from_file(&path).unwrap().restore().unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(documents.fetch(5, 6).unwrap(), Some(doc.clone()));
    assert_eq!(model_state.resolve_current_version(5), Some(6));
    assert!(!model_state.is_modified());

    let identities = Arc::new(IdentityCell::with_generator(Arc::new(
        IdentityGenerator::new(1, 2).unwrap(),
    )));
    let overflow =
        BinaryOverflowStore::new(Arc::new(blobs), identities, &StoreConfig::testing()).unwrap();
    let reference =
        modelbase_storage::BinaryRef::from_json("Data", doc.get("Data").unwrap()).unwrap();
    assert_eq!(overflow.read(&reference).unwrap(), vec![9; 200]);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_file("/nonexistent/modelbase.msgpack").unwrap_err();
    assert!(matches!(err.kind, modelbase_foundation::ErrorKind::Io(_)));
}

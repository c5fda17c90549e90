//! Reopening persisted models and sharing stores between services

use std::sync::Arc;

use modelbase_entity::{
    Container, EntityCore, EntityGraph, MeshFaceList, MeshItem, Session, VectorData,
};
use modelbase_foundation::{Extent, IdentityCell, IdentityGenerator, StoreConfig};
use modelbase_storage::{
    DocumentStore, MemoryBlobStore, MemoryDocumentStore, ModelState, StoreSnapshot, snapshot,
};

fn identities(session: u16, service: u16) -> Arc<IdentityCell> {
    Arc::new(IdentityCell::with_generator(Arc::new(
        IdentityGenerator::new(session, service).unwrap(),
    )))
}

fn temp_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("modelbase_{name}_{}.msgpack", std::process::id()))
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn model_survives_a_snapshot_file() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let session = Session::new(
        documents.clone(),
        blobs.clone(),
        identities(1, 1),
        StoreConfig::testing(),
    )
    .unwrap();

    let faces: Vec<[u32; 3]> = (0..20).map(|i| [i, i + 1, i + 2]).collect();
    let mut graph = EntityGraph::new(session.clone());
    let root = graph.insert(EntityCore::new("Model"), Container::new());
    let mesh = graph.insert(
        EntityCore::new("Model/Plate"),
        MeshItem::new(
            MeshFaceList::new(faces.clone()),
            Extent::new([0.0, 0.0, 0.0], [2.0, 1.0, 0.1]),
            [0.1, 0.2, 0.3],
        ),
    );
    graph.add_child(root, mesh).unwrap();
    graph.store(root).unwrap();
    let root_id = graph.get(root).unwrap().id();
    assert!(!blobs.is_empty());

    let path = temp_file("reopen");
    let captured = StoreSnapshot::capture(&documents, &blobs, session.model_state());
    snapshot::save_to_file(&captured, &path).unwrap();
    let (documents, blobs, model_state) = snapshot::load_from_file(&path).unwrap().restore().unwrap();
    let _ = std::fs::remove_file(&path);

    let reopened = Session::new(
        Arc::new(documents),
        Arc::new(blobs),
        identities(1, 2),
        StoreConfig::testing(),
    )
    .unwrap()
    .with_model_state(Arc::new(model_state));
    let mut restored = EntityGraph::new(reopened.clone());
    let copy = restored.restore_current(root_id, None).unwrap();
    assert_eq!(restored.extent(copy).unwrap(), Extent::new([0.0, 0.0, 0.0], [2.0, 1.0, 0.1]));

    let plate = restored.find_by_name("Model/Plate").unwrap();
    let item = restored.body_mut::<MeshItem>(plate).unwrap();
    assert_eq!(item.triangle_count(), 20);
    let loaded = item.faces_mut().ensure_loaded(&reopened).unwrap();
    assert_eq!(loaded.get().faces(), faces.as_slice());
}

#[test]
fn reopened_model_accepts_new_versions() {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut graph = EntityGraph::new(session.clone());
    let field = graph.insert(EntityCore::new("Field"), VectorData::new(&[1.0, 2.0], 0.0));
    let root = graph.insert(EntityCore::new("Model"), Container::visualizable());
    graph.add_child(root, field).unwrap();
    graph.store(root).unwrap();
    let root_identity = graph.get(root).unwrap().identity();

    let model_state = ModelState::import(session.model_state().export()).unwrap();
    let reopened = Session::new(
        session.documents().clone(),
        session.overflow().blobs().clone(),
        identities(1, 2),
        StoreConfig::testing(),
    )
    .unwrap()
    .with_model_state(Arc::new(model_state));

    let mut restored = EntityGraph::new(reopened.clone());
    let copy = restored.restore_current(root_identity.id, None).unwrap();
    restored.set_modified(copy).unwrap();
    restored.store(copy).unwrap();

    let stored = restored.get(copy).unwrap().identity();
    assert_eq!(stored.id, root_identity.id);
    assert!(stored.version > root_identity.version);
    assert_eq!(
        reopened.model_state().resolve_current_version(stored.id),
        Some(stored.version)
    );
}

// =============================================================================
// Shared Stores
// =============================================================================

#[test]
fn services_sharing_a_store_never_collide() {
    let documents: Arc<MemoryDocumentStore> = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let model_state = Arc::new(ModelState::new());

    let mut graphs: Vec<EntityGraph> = (1..=3)
        .map(|service| {
            let session = Session::new(
                documents.clone(),
                blobs.clone(),
                identities(4, service),
                StoreConfig::testing(),
            )
            .unwrap()
            .with_model_state(model_state.clone());
            EntityGraph::new(session)
        })
        .collect();

    let mut ids = Vec::new();
    for (service, graph) in graphs.iter_mut().enumerate() {
        for i in 0..10 {
            let node = graph.insert(
                EntityCore::new(format!("Service{service}/Field{i}")),
                VectorData::new(&[f64::from(i)], 0.0),
            );
            graph.store(node).unwrap();
            ids.push(graph.get(node).unwrap().id());
        }
    }

    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
    assert_eq!(documents.len(), 30);
}

#[test]
fn lower_numbered_service_can_update_a_shared_entity() {
    let documents: Arc<MemoryDocumentStore> = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let model_state = Arc::new(ModelState::new());
    let session_for = |service| {
        Session::new(
            documents.clone(),
            blobs.clone(),
            identities(4, service),
            StoreConfig::testing(),
        )
        .unwrap()
        .with_model_state(model_state.clone())
    };

    let mut writer = EntityGraph::new(session_for(3));
    let root = writer.insert(EntityCore::new("Model"), Container::visualizable());
    writer.store(root).unwrap();
    let original = writer.get(root).unwrap().identity();
    let stored_documents = documents.len();

    let mut editor = EntityGraph::new(session_for(1));
    let copy = editor.restore_current(original.id, None).unwrap();
    editor.get_mut(copy).unwrap().set_name("Renamed");
    editor.store(copy).unwrap();

    let updated = editor.get(copy).unwrap().identity();
    assert_eq!(updated.id, original.id);
    assert!(updated.version > original.version);
    assert_eq!(model_state.resolve_current_version(original.id), Some(updated.version));
    assert_eq!(documents.len(), stored_documents + 1);

    let mut reader = EntityGraph::new(session_for(2));
    let latest = reader.restore_current(original.id, None).unwrap();
    assert_eq!(reader.get(latest).unwrap().name(), "Renamed");
}

//! Integration tests for lazily loaded sub-objects

use modelbase_entity::{
    EntityCore, EntityGraph, LazySlot, MeshFaceList, MeshItem, Session, TableData,
};
use modelbase_foundation::{EntityIdentity, ErrorKind, Extent, StoreConfig};
use modelbase_storage::DocumentStore;

fn mesh_graph() -> (EntityGraph, modelbase_foundation::NodeId) {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut graph = EntityGraph::new(session);
    let mesh = graph.insert(
        EntityCore::new("Part/Surface"),
        MeshItem::new(
            MeshFaceList::new(vec![[0, 1, 2], [2, 3, 0], [4, 5, 6]]),
            Extent::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            [0.8, 0.1, 0.1],
        ),
    );
    graph.store(mesh).unwrap();
    (graph, mesh)
}

// =============================================================================
// Release and Reload
// =============================================================================

#[test]
fn released_payload_reloads_equal() {
    let (mut graph, mesh) = mesh_graph();
    let session = graph.session().clone();
    let original = graph
        .body::<MeshItem>(mesh)
        .unwrap()
        .faces()
        .loaded()
        .unwrap()
        .body()
        .clone();

    let item = graph.body_mut::<MeshItem>(mesh).unwrap();
    item.faces_mut().release(&session).unwrap();
    assert!(!item.faces().is_loaded());

    let loaded = item.faces_mut().ensure_loaded(&session).unwrap();
    assert_eq!(loaded.get(), &original);
    assert_eq!(loaded.get().faces(), &[[0, 1, 2], [2, 3, 0], [4, 5, 6]]);
}

#[test]
fn release_of_unmodified_payload_writes_nothing() {
    let (mut graph, mesh) = mesh_graph();
    let session = graph.session().clone();
    let before = session.documents().len();

    let item = graph.body_mut::<MeshItem>(mesh).unwrap();
    let identity = item.faces().identity();
    item.faces_mut().release(&session).unwrap();

    assert_eq!(session.documents().len(), before);
    assert_eq!(item.faces().identity(), identity);
}

#[test]
fn edited_payload_gets_a_new_version_with_its_owner() {
    let (mut graph, mesh) = mesh_graph();
    let session = graph.session().clone();
    let owner_before = graph.get(mesh).unwrap().identity();
    let faces_before = graph.body::<MeshItem>(mesh).unwrap().faces().identity();

    {
        let item = graph.body_mut::<MeshItem>(mesh).unwrap();
        let mut faces = item.faces_mut().ensure_loaded(&session).unwrap();
        faces.get_mut().push([7, 8, 9]);
    }
    graph.store(mesh).unwrap();

    let owner_after = graph.get(mesh).unwrap().identity();
    let item = graph.body::<MeshItem>(mesh).unwrap();
    let faces_after = item.faces().identity();
    assert_eq!(owner_after.id, owner_before.id);
    assert!(owner_after.version > owner_before.version);
    assert_eq!(faces_after.id, faces_before.id);
    assert!(faces_after.version > faces_before.version);
    assert_eq!(item.triangle_count(), 4);

    // The old face list version is still readable.
    let old = session.documents().fetch_required(faces_before).unwrap();
    assert_eq!(old.identity().unwrap(), faces_before);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn missing_payload_fails_to_load() {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut slot = LazySlot::<MeshFaceList>::unloaded(EntityIdentity::new(123, 456));

    let err = slot.ensure_loaded(&session).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::SubobjectLoadFailed { id: 123, version: 456, .. }
    ));
    assert!(!slot.is_loaded());
    assert_eq!(slot.identity(), EntityIdentity::new(123, 456));
}

#[test]
fn unassigned_slot_loads_an_empty_payload() {
    let session = Session::in_memory(StoreConfig::testing()).unwrap();
    let mut slot = LazySlot::<TableData>::default();

    let loaded = slot.ensure_loaded(&session).unwrap();
    assert!(loaded.get().rows().is_empty());
    assert!(!loaded.identity().is_assigned());
}

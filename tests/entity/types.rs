//! Integration tests for the built-in entity types

use modelbase_entity::{
    Annotation, AnnotationData, BinaryData, EntityCore, EntityGraph, FileText, ResultTable,
    Session, TableData, TextData, VectorData,
};
use modelbase_foundation::{EntityKind, Extent, NodeId, StoreConfig};
use modelbase_storage::{BinaryRef, DocumentStore};

fn graph() -> EntityGraph {
    EntityGraph::new(Session::in_memory(StoreConfig::testing()).unwrap())
}

/// Stores `node` and restores it into a second graph over the same session.
fn reopen(graph: &mut EntityGraph, node: NodeId) -> (EntityGraph, NodeId) {
    graph.store(node).unwrap();
    let identity = graph.get(node).unwrap().identity();
    let mut restored = EntityGraph::new(graph.session().clone());
    let copy = restored.restore(identity, None).unwrap();
    (restored, copy)
}

// =============================================================================
// Annotations
// =============================================================================

#[test]
fn annotation_restores_with_lazy_triangles() {
    let mut graph = graph();
    let triangles = vec![
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        [[0.0, 0.0, 2.0], [1.0, 0.0, 2.0], [0.0, -1.0, 2.0]],
    ];
    let node = graph.insert(
        EntityCore::new("Ports/Port1"),
        Annotation::new(AnnotationData::new(triangles.clone()), [1.0, 0.0, 0.0]),
    );

    let (mut restored, copy) = reopen(&mut graph, node);
    assert_eq!(restored.kind(copy).unwrap(), EntityKind::Topology);
    assert_eq!(
        restored.extent(copy).unwrap(),
        Extent::new([0.0, -1.0, 0.0], [1.0, 1.0, 2.0])
    );

    let session = restored.session().clone();
    let annotation = restored.body_mut::<Annotation>(copy).unwrap();
    assert_eq!(annotation.edge_color(), [1.0, 0.0, 0.0]);
    assert!(!annotation.data().is_loaded());
    let data = annotation.data_mut().ensure_loaded(&session).unwrap();
    assert_eq!(data.get().triangles(), triangles.as_slice());
}

// =============================================================================
// Result Tables
// =============================================================================

#[test]
fn result_table_keeps_dimensions_without_loading_cells() {
    let mut graph = graph();
    let table = TableData::new(
        vec!["Frequency".to_owned(), "S11".to_owned()],
        vec![
            vec!["1.0".to_owned(), "-12.5".to_owned()],
            vec!["2.0".to_owned(), "-18.1".to_owned()],
            vec!["3.0".to_owned(), "-9.7".to_owned(), "note".to_owned()],
        ],
    );
    let node = graph.insert(EntityCore::new("Results/S11"), ResultTable::new(table.clone()));

    let (mut restored, copy) = reopen(&mut graph, node);
    let session = restored.session().clone();
    let result = restored.body_mut::<ResultTable>(copy).unwrap();
    assert_eq!(result.row_count(), 3);
    assert_eq!(result.column_count(), 3);
    assert!(!result.table().is_loaded());

    let cells = result.table_mut().ensure_loaded(&session).unwrap();
    assert_eq!(cells.get(), &table);
}

// =============================================================================
// Text Files
// =============================================================================

#[test]
fn file_text_round_trip() {
    let mut graph = graph();
    let node = graph.insert(
        EntityCore::new("Scripts/setup.py"),
        FileText::new("setup.py", TextData::new("print('hello')\n")),
    );

    let (mut restored, copy) = reopen(&mut graph, node);
    let session = restored.session().clone();
    let file = restored.body_mut::<FileText>(copy).unwrap();
    assert_eq!(file.file_name(), "setup.py");
    assert_eq!(file.encoding(), "UTF-8");
    let text = file.text_mut().ensure_loaded(&session).unwrap();
    assert_eq!(text.get().text(), "print('hello')\n");
}

// =============================================================================
// Binary Data and Vectors
// =============================================================================

#[test]
fn small_binary_payload_is_embedded() {
    let mut graph = graph();
    let node = graph.insert(EntityCore::new("Files/tiny"), BinaryData::new(vec![1, 2, 3]));
    graph.store(node).unwrap();

    let reference = graph.body::<BinaryData>(node).unwrap().reference().unwrap();
    assert_eq!(reference, &BinaryRef::Inline(vec![1, 2, 3]));
}

#[test]
fn large_binary_payload_overflows_and_restores() {
    let mut graph = graph();
    let bytes: Vec<u8> = (0..200_u8).collect();
    let node = graph.insert(EntityCore::new("Files/large"), BinaryData::new(bytes.clone()));

    let (restored, copy) = reopen(&mut graph, node);
    let data = restored.body::<BinaryData>(copy).unwrap();
    assert_eq!(data.bytes(), bytes.as_slice());
    assert!(matches!(
        data.reference(),
        Some(BinaryRef::Blob { length: 200, chunks: 13, .. })
    ));
}

#[test]
fn vector_document_carries_run_lengths() {
    let mut graph = graph();
    let node = graph.insert(
        EntityCore::new("Results/Field"),
        VectorData::new(&[1.0, 1.0, 1.0, 2.0, 3.0, 3.0], 0.0),
    );
    graph.store(node).unwrap();

    let identity = graph.get(node).unwrap().identity();
    let doc = graph.session().documents().fetch_required(identity).unwrap();
    assert_eq!(doc.schema_type().unwrap(), "EntityCompressedVector");
    assert_eq!(doc.get_i64_array("dataCount").unwrap(), vec![-3, 1, -2]);

    let (restored, copy) = reopen(&mut graph, node);
    assert_eq!(
        restored.body::<VectorData>(copy).unwrap().values().unwrap(),
        vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0]
    );
}

#[test]
fn non_finite_vector_values_survive_store_and_restore() {
    let mut graph = graph();
    let node = graph.insert(
        EntityCore::new("Results/Residual"),
        VectorData::new(&[1.0, f64::NAN, f64::INFINITY, f64::INFINITY, -2.0], 0.0),
    );

    let (restored, copy) = reopen(&mut graph, node);
    let values = restored.body::<VectorData>(copy).unwrap().values().unwrap();
    assert_eq!(values.len(), 5);
    assert_eq!(values[0], 1.0);
    assert!(values[1].is_nan());
    assert_eq!(&values[2..], &[f64::INFINITY, f64::INFINITY, -2.0]);
}

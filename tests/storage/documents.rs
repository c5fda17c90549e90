//! Integration tests for versioned documents

use modelbase_foundation::{EntityIdentity, ErrorKind};
use modelbase_storage::document::{ENTITY_ID_KEY, VERSION_KEY};
use modelbase_storage::{Document, DocumentStore, MemoryDocumentStore};

fn document(id: u64, version: u64, name: &str) -> Document {
    let mut doc = Document::new();
    doc.insert(ENTITY_ID_KEY, id);
    doc.insert(VERSION_KEY, version);
    doc.insert("Name", name);
    doc
}

#[test]
fn versions_are_immutable() {
    let store = MemoryDocumentStore::new();
    store.insert(document(7, 1, "first")).unwrap();
    store.insert(document(7, 2, "second")).unwrap();

    // Identical re-insert is accepted, different content is not.
    store.insert(document(7, 1, "first")).unwrap();
    let err = store.insert(document(7, 1, "changed")).unwrap_err();
    assert!(err.is_precondition());

    let first = store.fetch(7, 1).unwrap().unwrap();
    assert_eq!(first.get_str("Name").unwrap(), "first");
    assert_eq!(store.versions(7), vec![1, 2]);
    assert_eq!(store.len(), 2);
}

#[test]
fn fetch_required_reports_absence() {
    let store = MemoryDocumentStore::new();
    assert!(store.fetch(1, 1).unwrap().is_none());
    let err = store.fetch_required(EntityIdentity::new(1, 1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DocumentNotFound { id: 1, version: 1 }));
}

#[test]
fn unassigned_identity_rejected() {
    let store = MemoryDocumentStore::new();
    assert!(store.insert(document(0, 0, "nothing")).is_err());
    assert!(store.insert(Document::new()).is_err());
    assert!(store.is_empty());
}

#[test]
fn typed_accessors_distinguish_missing_and_invalid() {
    let mut doc = document(1, 2, "x");
    doc.insert("Flags", serde_json::json!([true, false]));

    assert!(matches!(
        doc.get_u64("Absent").unwrap_err().kind,
        ErrorKind::MissingField(_)
    ));
    assert!(matches!(
        doc.get_u64("Name").unwrap_err().kind,
        ErrorKind::InvalidField { .. }
    ));
    assert_eq!(doc.get_bool_array("Flags").unwrap(), vec![true, false]);
    assert!(doc.bool_or("Absent", true).unwrap());
    assert!(doc.bool_or("Name", true).is_err());
    assert_eq!(doc.identity().unwrap(), EntityIdentity::new(1, 2));
}

#[test]
fn json_text_preserves_key_order() {
    let doc = document(3, 4, "ordered");
    let text = doc.to_json_string();
    let restored = Document::from_json_str(&text).unwrap();
    assert_eq!(restored, doc);
    let keys: Vec<&str> = restored.keys().collect();
    assert_eq!(keys, vec![ENTITY_ID_KEY, VERSION_KEY, "Name"]);
}

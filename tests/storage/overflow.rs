//! Integration tests for blob stores and binary overflow

use std::sync::Arc;

use modelbase_foundation::{IdentityCell, IdentityGenerator, StoreConfig};
use modelbase_storage::{
    BinaryOverflowStore, BinaryRef, BlobStore, FileBlobStore, MemoryBlobStore,
};

fn identities() -> Arc<IdentityCell> {
    Arc::new(IdentityCell::with_generator(Arc::new(
        IdentityGenerator::new(1, 1).unwrap(),
    )))
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("modelbase_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// =============================================================================
// Thresholds
// =============================================================================

#[test]
fn small_payload_stays_inline_with_default_config() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = BinaryOverflowStore::new(blobs.clone(), identities(), &StoreConfig::default())
        .unwrap();

    let reference = store.write(&[7; 10]).unwrap();
    assert_eq!(reference, BinaryRef::Inline(vec![7; 10]));
    assert!(blobs.is_empty());
}

#[test]
fn large_payload_overflows_with_default_config() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = BinaryOverflowStore::new(blobs.clone(), identities(), &StoreConfig::default())
        .unwrap();
    let payload: Vec<u8> = (0..50_000_000_u32).map(|i| (i % 251) as u8).collect();

    let reference = store.write(&payload).unwrap();
    let BinaryRef::Blob { length, chunks, .. } = reference else {
        panic!("expected an overflow reference");
    };
    assert_eq!(length, 50_000_000);
    assert_eq!(chunks as usize, 50_000_000_usize.div_ceil(255 * 1024));
    assert_eq!(blobs.len(), chunks as usize);
    assert_eq!(store.read(&reference).unwrap(), payload);
}

#[test]
fn threshold_is_inclusive() {
    let config = StoreConfig::default().with_inline_threshold(4).with_chunk_size(2);
    let store =
        BinaryOverflowStore::new(Arc::new(MemoryBlobStore::new()), identities(), &config).unwrap();
    assert!(store.write(&[1, 2, 3, 4]).unwrap().is_inline());
    let reference = store.write(&[1, 2, 3, 4, 5]).unwrap();
    assert!(matches!(reference, BinaryRef::Blob { chunks: 3, .. }));
}

#[test]
fn reference_json_round_trip() {
    for reference in [
        BinaryRef::Inline(vec![0xde, 0xad]),
        BinaryRef::Blob {
            id: 99,
            length: 1_000,
            chunks: 4,
        },
    ] {
        let json = reference.to_json();
        assert_eq!(BinaryRef::from_json("Data", &json).unwrap(), reference);
    }
}

// =============================================================================
// Failure Modes
// =============================================================================

#[test]
fn missing_chunk_is_an_error() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store =
        BinaryOverflowStore::new(blobs.clone(), identities(), &StoreConfig::testing()).unwrap();
    let reference = store.write(&[3; 100]).unwrap();
    let BinaryRef::Blob { id, .. } = reference else {
        panic!("expected an overflow reference");
    };

    blobs
        .delete(&modelbase_storage::overflow::chunk_key(id, 1))
        .unwrap();
    assert!(store.read(&reference).is_err());
}

#[test]
fn delete_removes_all_chunks() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store =
        BinaryOverflowStore::new(blobs.clone(), identities(), &StoreConfig::testing()).unwrap();
    let reference = store.write(&[3; 100]).unwrap();
    assert!(!blobs.is_empty());

    store.delete(&reference).unwrap();
    assert!(blobs.is_empty());
}

// =============================================================================
// File Backend
// =============================================================================

#[test]
fn file_blob_store_round_trip() {
    let dir = temp_dir("blobs");
    let blobs = Arc::new(FileBlobStore::new(&dir).unwrap());
    let store =
        BinaryOverflowStore::new(blobs.clone(), identities(), &StoreConfig::testing()).unwrap();

    let payload: Vec<u8> = (0..=255).collect();
    let reference = store.write(&payload).unwrap();
    assert!(!reference.is_inline());
    assert_eq!(store.read(&reference).unwrap(), payload);

    // A second store over the same directory sees the same blobs.
    let reopened = BinaryOverflowStore::new(
        Arc::new(FileBlobStore::new(&dir).unwrap()),
        identities(),
        &StoreConfig::testing(),
    )
    .unwrap();
    assert_eq!(reopened.read(&reference).unwrap(), payload);

    let _ = std::fs::remove_dir_all(&dir);
}

//! Integration tests for extents and configuration

use modelbase_foundation::{Extent, StoreConfig};

// =============================================================================
// Extent
// =============================================================================

#[test]
fn extent_corners_are_sorted() {
    let extent = Extent::new([1.0, -1.0, 5.0], [-2.0, 3.0, 4.0]);
    assert_eq!(extent.min(), Some([-2.0, -1.0, 4.0]));
    assert_eq!(extent.max(), Some([1.0, 3.0, 5.0]));
}

#[test]
fn empty_extent_is_neutral() {
    let mut extent = Extent::EMPTY;
    extent.extend(&Extent::EMPTY);
    assert!(extent.is_empty());

    let unit = Extent::new([0.0; 3], [1.0; 3]);
    extent.extend(&unit);
    assert_eq!(extent, unit);
}

#[test]
fn extent_json_round_trip() {
    let extent = Extent::new([0.0, 1.0, 2.0], [3.0, 4.0, 5.0]);
    let json = extent.to_json();
    assert_eq!(json, serde_json::json!([0.0, 3.0, 1.0, 4.0, 2.0, 5.0]));
    assert_eq!(Extent::from_json("BoundingBox", &json).unwrap(), extent);
    assert!(Extent::from_json("BoundingBox", &Extent::EMPTY.to_json()).unwrap().is_empty());
    assert!(Extent::from_json("BoundingBox", &serde_json::json!([1.0])).is_err());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn defaults() {
    let config = StoreConfig::default();
    assert_eq!(config.inline_threshold, 1_000_000);
    assert_eq!(config.chunk_size, 255 * 1024);
    assert_eq!(config.default_owner, "Model");
    assert!(config.validate().is_ok());
}

#[test]
fn builder_and_validation() {
    let config = StoreConfig::default()
        .with_session_id(7)
        .with_service_id(9)
        .with_inline_threshold(10)
        .with_default_owner("Solver");
    assert_eq!((config.session_id, config.service_id), (7, 9));
    assert_eq!(config.inline_threshold, 10);
    assert_eq!(config.default_owner, "Solver");

    assert!(StoreConfig::default().with_chunk_size(0).validate().is_err());
    assert!(StoreConfig::default().with_session_id(u16::MAX).validate().is_err());
    assert!(StoreConfig::default().with_default_tolerance(-1.0).validate().is_err());
}

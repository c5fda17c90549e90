//! Integration tests for property bags

use modelbase_foundation::{ErrorKind, Property, PropertyBag, PropertyType, PropertyValue};

fn sample_bag() -> PropertyBag {
    let mut bag = PropertyBag::new();
    bag.create(Property::new("Length", 2.5).with_group("Dimensions"))
        .unwrap();
    bag.create(Property::new("Count", 3_i64)).unwrap();
    bag.create(Property::new("Enabled", true)).unwrap();
    bag.create(Property::new("Label", "body")).unwrap();
    bag.create(Property::new(
        "Material",
        PropertyValue::selection(["Copper", "Steel"], "Steel"),
    ))
    .unwrap();
    bag
}

// =============================================================================
// Editing
// =============================================================================

#[test]
fn duplicate_names_rejected() {
    let mut bag = sample_bag();
    let err = bag.create(Property::new("Count", 4_i64)).unwrap_err();
    assert!(err.is_precondition());

    bag.update(Property::new("Count", 4_i64));
    assert_eq!(bag.get("Count").unwrap().value().as_integer(), Some(4));
    assert_eq!(bag.len(), 5);
}

#[test]
fn set_value_checks_type_and_flags() {
    let mut bag = sample_bag();
    bag.set_value("Length", 4.0).unwrap();
    assert_eq!(bag.get("Length").unwrap().value().as_double(), Some(4.0));
    assert_eq!(bag.needing_update(), vec!["Length"]);

    let err = bag.set_value("Enabled", "yes").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));

    let err = bag.set_value("Missing", 1.0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingField(_)));

    bag.update(Property::new("Locked", 1.0).with_read_only(true));
    let err = bag.set_value("Locked", 2.0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadOnlyProperty(_)));
}

#[test]
fn selection_value_must_be_an_option() {
    let mut bag = sample_bag();
    assert!(bag.set_value("Material", PropertyValue::selection(["Copper", "Steel"], "Wood")).is_err());
    assert_eq!(bag.get("Material").unwrap().value().as_str(), Some("Steel"));
}

#[test]
fn changed_flag_tracks_edits() {
    let mut bag = sample_bag();
    assert!(bag.is_changed());
    bag.clear_changed();
    assert!(!bag.is_changed());
    bag.delete("Label");
    assert!(bag.is_changed());
    assert!(!bag.contains("Label"));
}

// =============================================================================
// Stored form
// =============================================================================

#[test]
fn json_round_trip() {
    let bag = sample_bag();
    let json = bag.to_json();
    let restored = PropertyBag::from_json(&json).unwrap();

    assert_eq!(restored.to_json(), json);
    assert_eq!(restored.len(), bag.len());
    let length = restored.get_in("Dimensions", "Length").unwrap();
    assert_eq!(length.value_type(), PropertyType::Double);
    assert_eq!(length.value().as_double(), Some(2.5));
}

#[test]
fn malformed_json_rejected() {
    assert!(PropertyBag::from_json(&serde_json::json!({"Name": "x"})).is_err());
    assert!(PropertyBag::from_json(&serde_json::json!([{"Name": "x", "Type": "nonsense"}])).is_err());
}

//! Integration tests for the model state

use std::sync::Arc;
use std::thread;

use modelbase_foundation::EntityKind::{Data, Topology};
use modelbase_storage::ModelState;

#[test]
fn versions_strictly_increase() {
    let state = ModelState::new();
    state.record(10, 0, 5, Topology).unwrap();
    assert!(state.record(10, 0, 5, Topology).unwrap_err().is_precondition());
    assert!(state.record(10, 0, 4, Topology).unwrap_err().is_precondition());
    state.record(10, 0, 6, Topology).unwrap();
    assert_eq!(state.resolve_current_version(10), Some(6));
}

#[test]
fn removed_ids_cannot_go_back_in_time() {
    let state = ModelState::new();
    state.record(10, 0, 5, Topology).unwrap();
    state.remove(10, false);
    assert!(state.record(10, 0, 3, Topology).is_err());
    state.record(10, 0, 7, Topology).unwrap();
}

#[test]
fn reparenting_moves_the_child() {
    let state = ModelState::new();
    state.record(1, 0, 1, Topology).unwrap();
    state.record(2, 0, 1, Topology).unwrap();
    state.record(3, 1, 1, Topology).unwrap();
    assert_eq!(state.children_of(1), vec![3]);

    state.record(3, 2, 2, Topology).unwrap();
    assert!(state.children_of(1).is_empty());
    assert_eq!(state.children_of(2), vec![3]);
    assert_eq!(state.current_parent(3), Some(2));
}

#[test]
fn remove_with_and_without_children() {
    let state = ModelState::new();
    state.record(1, 0, 1, Topology).unwrap();
    state.record(2, 1, 1, Topology).unwrap();
    state.record(3, 2, 1, Data).unwrap();
    state.record(4, 0, 1, Topology).unwrap();
    state.record(5, 4, 1, Topology).unwrap();

    assert_eq!(state.remove(1, true), vec![1, 2, 3]);
    assert_eq!(state.len(), 2);

    assert_eq!(state.remove(4, false), vec![4]);
    assert_eq!(state.current_parent(5), Some(0));
    assert!(state.remove(99, true).is_empty());
    assert_eq!(state.topology_entities(), vec![5]);
}

#[test]
fn checkpoints_keep_snapshots() {
    let state = ModelState::new();
    state.record(1, 0, 1, Topology).unwrap();
    assert!(state.is_modified());
    let first = state.checkpoint("initial");
    assert!(!state.is_modified());

    state.record(1, 0, 2, Topology).unwrap();
    state.record(2, 1, 3, Topology).unwrap();
    assert_eq!(state.added_or_modified(), vec![1, 2]);
    let second = state.checkpoint("second");
    assert!(second > first);

    assert_eq!(state.snapshot(first).unwrap().get(&1).unwrap().version, 1);
    assert_eq!(state.snapshot(second).unwrap().len(), 2);
    assert!(state.snapshot(second + 1).is_none());

    let checkpoints = state.checkpoints();
    assert_eq!(checkpoints.len(), 2);
    assert_eq!(checkpoints[0].description, "initial");
    assert_eq!(checkpoints[1].entries, 2);
}

#[test]
fn concurrent_readers_see_whole_entries() {
    let state = Arc::new(ModelState::new());
    state.record(1, 0, 1, Topology).unwrap();

    let writer = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            for version in 2..2_000 {
                state.record(1, 0, version, Topology).unwrap();
            }
        })
    };
    let reader = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..2_000 {
                let entry = state.entry(1).unwrap();
                assert!(entry.version >= last);
                assert_eq!(entry.parent_id, 0);
                last = entry.version;
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(state.resolve_current_version(1), Some(1_999));
}

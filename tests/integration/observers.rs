//! Change notifications

use std::sync::Arc;

use modelbase_entity::{Container, EntityCore, EntityGraph, EntityObserver, Session, VectorData, observe};
use modelbase_foundation::{EntityIdentity, StoreConfig};
use parking_lot::Mutex;

#[derive(Default)]
struct Journal {
    modified: Mutex<Vec<EntityIdentity>>,
    removed: Mutex<Vec<EntityIdentity>>,
}

impl EntityObserver for Journal {
    fn entity_modified(&self, entity: EntityIdentity) {
        self.modified.lock().push(entity);
    }

    fn entity_removed(&self, entity: EntityIdentity) {
        self.removed.lock().push(entity);
    }
}

fn observed_graph(journal: &Arc<Journal>) -> EntityGraph {
    EntityGraph::new(Session::in_memory(StoreConfig::testing()).unwrap())
        .with_observer(observe(journal))
}

// =============================================================================
// Notifications
// =============================================================================

#[test]
fn hierarchy_edits_notify_the_parent() {
    let journal = Arc::new(Journal::default());
    let mut graph = observed_graph(&journal);
    let root = graph.insert(EntityCore::new("Model"), Container::new());
    graph.store(root).unwrap();
    let root_identity = graph.get(root).unwrap().identity();

    let field = graph.insert(EntityCore::new("Model/Field"), VectorData::new(&[1.0], 0.0));
    graph.add_child(root, field).unwrap();
    assert_eq!(journal.modified.lock().as_slice(), &[root_identity]);

    graph.remove_child(root, field).unwrap();
    assert_eq!(journal.modified.lock().len(), 2);
}

#[test]
fn removal_notifies_each_entity() {
    let journal = Arc::new(Journal::default());
    let mut graph = observed_graph(&journal);
    let root = graph.insert(EntityCore::new("Model"), Container::new());
    let a = graph.insert(EntityCore::new("Model/A"), VectorData::new(&[1.0], 0.0));
    let b = graph.insert(EntityCore::new("Model/B"), VectorData::new(&[2.0], 0.0));
    graph.add_child(root, a).unwrap();
    graph.add_child(root, b).unwrap();
    graph.store(root).unwrap();

    let identities: Vec<EntityIdentity> = [root, a, b]
        .iter()
        .map(|node| graph.get(*node).unwrap().identity())
        .collect();
    let mut deleted = graph.delete_subtree(root).unwrap();
    let mut notified = journal.removed.lock().clone();
    deleted.sort_by_key(|identity| identity.id);
    notified.sort_by_key(|identity| identity.id);

    assert_eq!(deleted, notified);
    assert_eq!(notified.len(), identities.len());
    for identity in identities {
        assert!(notified.contains(&identity));
    }
}

#[test]
fn dropped_observer_is_ignored() {
    let journal = Arc::new(Journal::default());
    let mut graph = observed_graph(&journal);
    let root = graph.insert(EntityCore::new("Model"), Container::new());
    drop(journal);

    graph.set_modified(root).unwrap();
    graph.remove_entity(root).unwrap();
    assert!(graph.is_empty());
}

#[test]
fn clones_are_not_observed() {
    let journal = Arc::new(Journal::default());
    let mut graph = observed_graph(&journal);
    let field = graph.insert(EntityCore::new("Model/Field"), VectorData::new(&[1.0], 0.0));
    let copy = graph.clone_entity(field).unwrap();

    graph.set_modified(copy).unwrap();
    assert!(journal.modified.lock().is_empty());
    graph.set_modified(field).unwrap();
    assert_eq!(journal.modified.lock().len(), 1);
}

//! Change notification hooks.

use std::sync::{Arc, Weak};

use modelbase_foundation::EntityIdentity;

/// Receives fire-and-forget notifications about entity changes.
///
/// Entities hold observers as [`Weak`] references; a dropped observer is
/// silently skipped.
pub trait EntityObserver: Send + Sync {
    /// Called when an entity is explicitly marked modified.
    fn entity_modified(&self, entity: EntityIdentity);

    /// Called when an entity is removed from the in-memory graph.
    fn entity_removed(&self, entity: EntityIdentity);
}

/// Non-owning observer handle.
pub type ObserverRef = Weak<dyn EntityObserver>;

/// Creates a non-owning handle to `observer`.
#[must_use]
pub fn observe<O: EntityObserver + 'static>(observer: &Arc<O>) -> ObserverRef {
    let observer: Arc<dyn EntityObserver> = observer.clone();
    Arc::downgrade(&observer)
}

pub(crate) fn notify_modified(observer: Option<&ObserverRef>, entity: EntityIdentity) {
    if let Some(observer) = observer.and_then(Weak::upgrade) {
        observer.entity_modified(entity);
    }
}

pub(crate) fn notify_removed(observer: Option<&ObserverRef>, entity: EntityIdentity) {
    if let Some(observer) = observer.and_then(Weak::upgrade) {
        observer.entity_removed(entity);
    }
}

//! Lazily materialized sub-objects.
//!
//! A [`LazySlot`] holds either a stored reference or a loaded record, never
//! both. The payload is only reachable through the [`Loaded`] handle that
//! [`LazySlot::ensure_loaded`] returns.

use modelbase_foundation::{EntityIdentity, Error, Result};

use crate::core::EntityCore;
use crate::persist::{self, Persist};
use crate::session::Session;

/// A loaded sub-object: generic header plus typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    core: EntityCore,
    body: T,
}

impl<T> Record<T> {
    /// Identity of the last stored version of the payload.
    #[must_use]
    pub fn identity(&self) -> EntityIdentity {
        self.core.identity()
    }

    /// Header of the payload entity.
    #[must_use]
    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    /// The payload.
    #[must_use]
    pub fn body(&self) -> &T {
        &self.body
    }
}

#[derive(Debug, Clone)]
enum SlotState<T> {
    Unloaded(EntityIdentity),
    Loaded(Box<Record<T>>),
}

/// Slot holding a heavyweight sub-object that is loaded on first access.
#[derive(Debug, Clone)]
pub struct LazySlot<T> {
    state: SlotState<T>,
    ref_dirty: bool,
}

impl<T> Default for LazySlot<T> {
    fn default() -> Self {
        Self::unloaded(EntityIdentity::UNASSIGNED)
    }
}

/// Access to a loaded payload.
///
/// Mutable access marks the payload modified, so the next store of the
/// owner writes a new payload version.
#[derive(Debug)]
pub struct Loaded<'a, T> {
    record: &'a mut Record<T>,
}

impl<T> Loaded<'_, T> {
    /// The payload.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.record.body
    }

    /// The payload, for editing.
    pub fn get_mut(&mut self) -> &mut T {
        self.record.core.mark_modified_quietly();
        &mut self.record.body
    }

    /// Replaces the payload.
    pub fn set(&mut self, body: T) {
        *self.get_mut() = body;
    }

    /// Identity of the last stored version of the payload.
    #[must_use]
    pub fn identity(&self) -> EntityIdentity {
        self.record.core.identity()
    }
}

impl<T> LazySlot<T> {
    /// A slot referencing a stored payload (or nothing, if unassigned).
    #[must_use]
    pub fn unloaded(identity: EntityIdentity) -> Self {
        Self {
            state: SlotState::Unloaded(identity),
            ref_dirty: false,
        }
    }

    /// A slot holding a new, unstored payload.
    #[must_use]
    pub fn with_value(body: T) -> Self {
        Self {
            state: SlotState::Loaded(Box::new(Record {
                core: EntityCore::new(""),
                body,
            })),
            ref_dirty: false,
        }
    }

    /// Identity of the referenced or loaded payload.
    #[must_use]
    pub fn identity(&self) -> EntityIdentity {
        match &self.state {
            SlotState::Unloaded(identity) => *identity,
            SlotState::Loaded(record) => record.core.identity(),
        }
    }

    /// Returns true if the payload is in memory.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SlotState::Loaded(_))
    }

    /// The loaded record, if in memory.
    #[must_use]
    pub fn loaded(&self) -> Option<&Record<T>> {
        match &self.state {
            SlotState::Unloaded(_) => None,
            SlotState::Loaded(record) => Some(record),
        }
    }

    /// True if the payload or the owner's reference to it needs storing.
    #[must_use]
    pub fn is_dirty(&self) -> bool
    where
        T: Persist,
    {
        self.ref_dirty
            || match &self.state {
                SlotState::Unloaded(_) => false,
                SlotState::Loaded(record) => record.core.is_modified() || record.body.is_dirty(),
            }
    }

    /// Clears the reference-changed marker, returning its previous value.
    pub(crate) fn take_ref_dirty(&mut self) -> bool {
        std::mem::take(&mut self.ref_dirty)
    }
}

impl<T> LazySlot<T>
where
    T: Persist + Default,
{
    /// Loads the payload if needed and returns a handle to it.
    ///
    /// An unassigned slot gets a fresh payload that is stored with the owner.
    ///
    /// # Errors
    ///
    /// Returns `SubobjectLoadFailed` if the referenced version cannot be
    /// fetched or decoded.
    pub fn ensure_loaded(&mut self, session: &Session) -> Result<Loaded<'_, T>> {
        if let SlotState::Unloaded(identity) = self.state {
            let record = if identity.is_assigned() {
                Self::fetch(identity, session)?
            } else {
                Record {
                    core: EntityCore::new(""),
                    body: T::default(),
                }
            };
            self.state = SlotState::Loaded(Box::new(record));
        }
        match &mut self.state {
            SlotState::Loaded(record) => Ok(Loaded {
                record: record.as_mut(),
            }),
            SlotState::Unloaded(identity) => Err(Error::subobject_load_failed(
                identity.id,
                identity.version,
                "slot did not load",
            )),
        }
    }

    fn fetch(identity: EntityIdentity, session: &Session) -> Result<Record<T>> {
        let failed =
            |reason: String| Error::subobject_load_failed(identity.id, identity.version, reason);
        let doc = session
            .documents()
            .fetch(identity.id, identity.version)
            .map_err(|e| failed(e.to_string()))?
            .ok_or_else(|| failed("document not found".to_owned()))?;

        let (core, body) =
            persist::read_entity(&doc, T::default(), session).map_err(|e| failed(e.to_string()))?;
        if core.identity() != identity {
            return Err(failed(format!("document carries identity {}", core.identity())));
        }
        tracing::debug!(id = identity.id, version = identity.version, "sub-object loaded");
        Ok(Record { core, body })
    }

    /// Stores a loaded, modified payload. Returns true if a new version was written.
    pub(crate) fn store(&mut self, session: &Session) -> Result<bool> {
        match &mut self.state {
            SlotState::Unloaded(_) => Ok(false),
            SlotState::Loaded(record) => {
                let kind = record.body.kind();
                persist::store_entity(&mut record.core, &mut record.body, kind, 0, session)
            }
        }
    }

    /// Stores the payload and owner-visible reference, then drops it from memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload could not be stored; the slot stays loaded.
    pub fn release(&mut self, session: &Session) -> Result<()> {
        if self.store(session)? {
            self.ref_dirty = true;
        }
        if self.is_loaded() {
            let identity = self.identity();
            tracing::debug!(id = identity.id, version = identity.version, "sub-object released");
            self.state = SlotState::Unloaded(identity);
        }
        Ok(())
    }

    /// Stores the payload for the owner's store. Returns true if the owner's
    /// reference changed since its last store.
    pub(crate) fn store_for_owner(&mut self, session: &Session) -> Result<bool> {
        let wrote = self.store(session)?;
        Ok(wrote | self.take_ref_dirty())
    }

    /// Copies a loaded payload into a new, unstored slot.
    pub(crate) fn detached_copy(&self) -> Option<Self>
    where
        T: Clone,
    {
        self.loaded().map(|record| Self {
            state: SlotState::Loaded(Box::new(Record {
                core: record.core.detached_copy(),
                body: record.body.clone(),
            })),
            ref_dirty: false,
        })
    }
}

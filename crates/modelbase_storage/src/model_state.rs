//! Authoritative map from entity id to its current stored version.
//!
//! Only topology entities are recorded here; data entities are reachable
//! solely through their owner's stored reference. All state sits behind one
//! lock, so a reader resolving a current version never sees a half-applied
//! entry.
//!
//! The entry map is an [`im::OrdMap`]: a checkpoint keeps an O(1) snapshot
//! that shares structure with the live map.

use std::collections::{BTreeSet, HashMap};

use im::OrdMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use modelbase_foundation::{EntityKind, Error, Result};

/// Tracking record of one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Entity identifier.
    pub id: u64,
    /// Identifier of the parent entity; `0` for a root.
    pub parent_id: u64,
    /// Current stored version.
    pub version: u64,
    /// Classification at the time of the last store.
    pub kind: EntityKind,
}

/// Summary of one checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// Monotonically increasing state number.
    pub state: u64,
    /// Free-form description of the change set.
    pub description: String,
    /// Number of tracked entities at that point.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: OrdMap<u64, ModelEntry>,
    children: HashMap<u64, BTreeSet<u64>>,
    // Highest version ever recorded per id, including removed ids.
    high_water: HashMap<u64, u64>,
    added_or_modified: BTreeSet<u64>,
    removed: BTreeSet<u64>,
    state: u64,
    checkpoints: Vec<(Checkpoint, OrdMap<u64, ModelEntry>)>,
}

impl Inner {
    fn check_version(&self, id: u64, version: u64) -> Result<()> {
        match self.high_water.get(&id) {
            Some(&previous) if version <= previous => Err(Error::precondition(format!(
                "version {version} of entity {id} does not exceed recorded version {previous}"
            ))),
            _ => Ok(()),
        }
    }

    fn unlink(&mut self, id: u64, parent_id: u64) {
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.remove(&id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
    }
}

/// Central registry of current entity versions.
#[derive(Debug, Default)]
pub struct ModelState {
    inner: RwLock<Inner>,
}

impl ModelState {
    /// Creates an empty model state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly stored version of `id`.
    ///
    /// Adds the entity if unknown, otherwise updates its version, parent and kind.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a zero id or version, or a version
    /// not greater than any version previously recorded for `id`.
    pub fn record(&self, id: u64, parent_id: u64, version: u64, kind: EntityKind) -> Result<()> {
        if id == 0 || version == 0 {
            return Err(Error::precondition(format!(
                "cannot record unassigned identity {id}@{version}"
            )));
        }
        if id == parent_id {
            return Err(Error::precondition(format!("entity {id} cannot be its own parent")));
        }

        let mut inner = self.inner.write();
        inner.check_version(id, version)?;

        if let Some(old) = inner.entries.get(&id).copied() {
            if old.parent_id != parent_id {
                inner.unlink(id, old.parent_id);
            }
        }
        if parent_id != 0 {
            inner.children.entry(parent_id).or_default().insert(id);
        }

        inner.entries.insert(
            id,
            ModelEntry {
                id,
                parent_id,
                version,
                kind,
            },
        );
        inner.high_water.insert(id, version);
        inner.removed.remove(&id);
        inner.added_or_modified.insert(id);
        tracing::trace!(id, parent_id, version, %kind, "model state recorded");
        Ok(())
    }

    /// Checks that `version` would be accepted by [`record`](Self::record) for `id`.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `version` does not exceed the
    /// highest version ever recorded for `id`.
    pub fn check_version(&self, id: u64, version: u64) -> Result<()> {
        self.inner.read().check_version(id, version)
    }

    /// Returns the highest version ever recorded for `id`, removed or not.
    #[must_use]
    pub fn high_water(&self, id: u64) -> Option<u64> {
        self.inner.read().high_water.get(&id).copied()
    }

    /// Returns the current version of `id`.
    #[must_use]
    pub fn resolve_current_version(&self, id: u64) -> Option<u64> {
        self.inner.read().entries.get(&id).map(|e| e.version)
    }

    /// Returns the recorded parent of `id` (`0` for a root).
    #[must_use]
    pub fn current_parent(&self, id: u64) -> Option<u64> {
        self.inner.read().entries.get(&id).map(|e| e.parent_id)
    }

    /// Returns the full entry of `id`.
    #[must_use]
    pub fn entry(&self, id: u64) -> Option<ModelEntry> {
        self.inner.read().entries.get(&id).copied()
    }

    /// Returns the recorded children of `id`, ascending.
    #[must_use]
    pub fn children_of(&self, id: u64) -> Vec<u64> {
        self.inner
            .read()
            .children
            .get(&id)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the ids of all entries classified as topology, ascending.
    #[must_use]
    pub fn topology_entities(&self) -> Vec<u64> {
        self.inner
            .read()
            .entries
            .values()
            .filter(|e| e.kind.is_topology())
            .map(|e| e.id)
            .collect()
    }

    /// Returns true if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.inner.read().entries.contains_key(&id)
    }

    /// Returns the number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Stops tracking `id` and, if `consider_children`, its recorded descendants.
    ///
    /// Returns the removed ids, `id` first. Unknown ids are ignored.
    pub fn remove(&self, id: u64, consider_children: bool) -> Vec<u64> {
        let mut inner = self.inner.write();
        let mut removed = Vec::new();
        let mut pending = vec![id];

        while let Some(next) = pending.pop() {
            let Some(entry) = inner.entries.remove(&next) else {
                continue;
            };
            inner.unlink(next, entry.parent_id);
            let children = inner.children.remove(&next).unwrap_or_default();
            if consider_children {
                pending.extend(children.into_iter().rev());
            } else {
                // Orphans stay tracked and become roots.
                for child in children {
                    if let Some(child_entry) = inner.entries.get_mut(&child) {
                        child_entry.parent_id = 0;
                    }
                }
            }
            inner.added_or_modified.remove(&next);
            inner.removed.insert(next);
            removed.push(next);
        }

        if !removed.is_empty() {
            tracing::debug!(id, count = removed.len(), "model state entries removed");
        }
        removed
    }

    /// Ids added or modified since the last checkpoint, ascending.
    #[must_use]
    pub fn added_or_modified(&self) -> Vec<u64> {
        self.inner.read().added_or_modified.iter().copied().collect()
    }

    /// Ids removed since the last checkpoint, ascending.
    #[must_use]
    pub fn removed(&self) -> Vec<u64> {
        self.inner.read().removed.iter().copied().collect()
    }

    /// Returns true if anything changed since the last checkpoint.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        let inner = self.inner.read();
        !inner.added_or_modified.is_empty() || !inner.removed.is_empty()
    }

    /// Closes the current change set and returns its state number.
    pub fn checkpoint(&self, description: impl Into<String>) -> u64 {
        let mut inner = self.inner.write();
        inner.state += 1;
        let checkpoint = Checkpoint {
            state: inner.state,
            description: description.into(),
            entries: inner.entries.len(),
        };
        tracing::info!(
            state = checkpoint.state,
            description = %checkpoint.description,
            modified = inner.added_or_modified.len(),
            removed = inner.removed.len(),
            "model state checkpoint"
        );
        let snapshot = inner.entries.clone();
        inner.checkpoints.push((checkpoint, snapshot));
        inner.added_or_modified.clear();
        inner.removed.clear();
        inner.state
    }

    /// Lists all checkpoints, oldest first.
    #[must_use]
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.inner
            .read()
            .checkpoints
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    /// Returns the entry map as it was at checkpoint `state`.
    #[must_use]
    pub fn snapshot(&self, state: u64) -> Option<OrdMap<u64, ModelEntry>> {
        self.inner
            .read()
            .checkpoints
            .iter()
            .find(|(c, _)| c.state == state)
            .map(|(_, entries)| entries.clone())
    }

    /// Returns every tracked entry, ordered by id.
    #[must_use]
    pub fn export(&self) -> Vec<ModelEntry> {
        self.inner.read().entries.values().copied().collect()
    }

    /// Builds a model state from exported entries, with an empty change set.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`ModelState::record`], e.g. on duplicate ids.
    pub fn import(entries: impl IntoIterator<Item = ModelEntry>) -> Result<Self> {
        let state = Self::new();
        for entry in entries {
            state.record(entry.id, entry.parent_id, entry.version, entry.kind)?;
        }
        {
            let mut inner = state.inner.write();
            inner.added_or_modified.clear();
        }
        Ok(state)
    }
}

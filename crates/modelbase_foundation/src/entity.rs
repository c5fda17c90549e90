//! Entity identities, kinds, and arena handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persistent identity of an entity snapshot.
///
/// `id` is permanent for the entity's lifetime; `version` names one immutable
/// stored snapshot of it. An `id` of zero means "not yet assigned".
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityIdentity {
    /// Permanent entity identifier.
    pub id: u64,
    /// Version of the stored snapshot.
    pub version: u64,
}

impl EntityIdentity {
    /// The unassigned identity (`id == 0`, `version == 0`).
    pub const UNASSIGNED: Self = Self { id: 0, version: 0 };

    /// Creates a new identity.
    #[must_use]
    pub const fn new(id: u64, version: u64) -> Self {
        Self { id, version }
    }

    /// Returns true if an identifier has been issued.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.id != 0
    }

    /// Returns true if this identity references a stored snapshot.
    #[must_use]
    pub const fn is_stored(self) -> bool {
        self.id != 0 && self.version != 0
    }
}

impl fmt::Debug for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "EntityIdentity({}v{})", self.id, self.version)
        } else {
            write!(f, "EntityIdentity(unassigned)")
        }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Classification of an entity in the object graph.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Independently visible and centrally tracked.
    Topology,
    /// Reachable only through its owner's stored reference.
    Data,
}

impl EntityKind {
    /// Returns true for [`EntityKind::Topology`].
    #[must_use]
    pub const fn is_topology(self) -> bool {
        matches!(self, Self::Topology)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topology => write!(f, "topology"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Generational handle into the in-memory entity arena.
///
/// The generation counter increments when a slot is reused after removal,
/// allowing detection of stale handles to removed entities.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId {
    /// Slot index in the arena.
    pub index: u64,
    /// Generation counter for stale handle detection.
    pub generation: u32,
}

impl NodeId {
    /// Creates a new handle with the given index and generation.
    #[must_use]
    pub const fn new(index: u64, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

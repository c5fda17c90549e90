use modelbase_foundation::{EntityIdentity, EntityKind, Error, NodeId, Result};
use modelbase_storage::Document;

use crate::persist::Persist;
use crate::session::Session;

/// Ordered collection of child entities.
///
/// The child handles are owned by the [`EntityGraph`]; the container keeps
/// them in display order together with the identities it last stored.
///
/// [`EntityGraph`]: crate::EntityGraph
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub(crate) children: Vec<NodeId>,
    child_refs: Vec<EntityIdentity>,
    visualizable: bool,
    dirty: bool,
}

impl Container {
    /// Creates an empty, non-visualizable container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty container explicitly flagged as visualizable.
    #[must_use]
    pub fn visualizable() -> Self {
        Self {
            visualizable: true,
            ..Self::default()
        }
    }

    /// Child handles in display order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Child identities as of the last store or restore.
    #[must_use]
    pub fn child_refs(&self) -> &[EntityIdentity] {
        &self.child_refs
    }

    /// Whether the container is flagged as visualizable.
    ///
    /// The flag is raised when a topology child is added and never lowered
    /// by removing one.
    #[must_use]
    pub fn is_visualizable(&self) -> bool {
        self.visualizable
    }

    /// Sets the visualizable flag.
    pub fn set_visualizable(&mut self, visualizable: bool) {
        if self.visualizable != visualizable {
            self.visualizable = visualizable;
            self.dirty = true;
        }
    }

    /// Replaces the stored child references.
    ///
    /// The container becomes dirty if the child set changed or a data child
    /// moved to another version. A topology child's current version is
    /// resolved through the model state, so its version alone does not
    /// require rewriting the container.
    pub(crate) fn refresh_child_refs(&mut self, refs: Vec<(EntityIdentity, EntityKind)>) {
        let changed = refs.len() != self.child_refs.len()
            || refs
                .iter()
                .zip(&self.child_refs)
                .any(|((new, kind), old)| {
                    new.id != old.id || (!kind.is_topology() && new.version != old.version)
                });
        self.child_refs = refs.into_iter().map(|(identity, _)| identity).collect();
        if changed {
            self.dirty = true;
        }
    }

    pub(crate) fn set_child_refs(&mut self, refs: Vec<EntityIdentity>) {
        self.child_refs = refs;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Persist for Container {
    fn type_name(&self) -> &'static str {
        "EntityContainer"
    }

    fn kind(&self) -> EntityKind {
        if self.visualizable {
            EntityKind::Topology
        } else {
            EntityKind::Data
        }
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        let ids: Vec<u64> = self.child_refs.iter().map(|r| r.id).collect();
        let versions: Vec<u64> = self.child_refs.iter().map(|r| r.version).collect();
        doc.insert("ChildID", ids);
        doc.insert("ChildVersion", versions);
        doc.insert("VisualizationItem", self.visualizable);
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        let ids = doc.get_u64_array("ChildID")?;
        let versions = doc.get_u64_array("ChildVersion")?;
        if ids.len() != versions.len() {
            return Err(Error::invalid_field(
                "ChildVersion",
                "one version per child id",
            ));
        }
        self.child_refs = ids
            .into_iter()
            .zip(versions)
            .map(|(id, version)| EntityIdentity::new(id, version))
            .collect();
        self.visualizable = doc.bool_or("VisualizationItem", true)?;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }
}

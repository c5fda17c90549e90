//! The in-memory entity graph.
//!
//! Every entity loaded or created by a process lives in one [`EntityGraph`].
//! Entities refer to each other through [`NodeId`] handles: a container owns
//! its children's handles in display order and each node keeps a non-owning
//! handle to its parent.

use modelbase_foundation::{EntityIdentity, EntityKind, Error, Extent, NodeId, Result};
use modelbase_storage::Document;

use crate::arena::NodeArena;
use crate::body::{BodyVariant, EntityBody};
use crate::core::EntityCore;
use crate::observer::{self, ObserverRef};
use crate::persist::{self, Persist};
use crate::session::Session;
use crate::types::Container;

#[derive(Debug)]
struct Node {
    core: EntityCore,
    body: EntityBody,
    parent: Option<NodeId>,
}

/// A subtree built outside the arena, inserted only once complete.
struct Staged {
    core: EntityCore,
    body: EntityBody,
    children: Vec<Staged>,
}

/// Owner of all in-memory entities of one process.
pub struct EntityGraph {
    arena: NodeArena<Node>,
    session: Session,
    observer: Option<ObserverRef>,
}

impl std::fmt::Debug for EntityGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityGraph")
            .field("entities", &self.arena.len())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl EntityGraph {
    /// Creates an empty graph storing through `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            arena: NodeArena::new(),
            session,
            observer: None,
        }
    }

    /// Attaches `observer` to every entity inserted or restored from now on.
    #[must_use]
    pub fn with_observer(mut self, observer: ObserverRef) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The session used for storing and restoring.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of entities in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns true if the graph holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns true if `node` refers to a live entity.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.contains(node)
    }

    /// Adds a new root entity.
    ///
    /// An empty owner is filled from the configured default.
    pub fn insert(&mut self, mut core: EntityCore, body: impl Into<EntityBody>) -> NodeId {
        core.fill_default_owner(&self.session.config().default_owner);
        core.observer = self.observer.clone();
        let body = body.into();
        tracing::trace!(type_name = body.type_name(), name = core.name(), "entity inserted");
        self.arena.insert(Node {
            core,
            body,
            parent: None,
        })
    }

    /// The generic header of `node`.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn get(&self, node: NodeId) -> Result<&EntityCore> {
        Ok(&self.arena.get(node)?.core)
    }

    /// The generic header of `node`, for editing.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn get_mut(&mut self, node: NodeId) -> Result<&mut EntityCore> {
        Ok(&mut self.arena.get_mut(node)?.core)
    }

    /// The body of `node`.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn entity_body(&self, node: NodeId) -> Result<&EntityBody> {
        Ok(&self.arena.get(node)?.body)
    }

    /// The body of `node` as a concrete type.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle or another type.
    pub fn body<T: BodyVariant>(&self, node: NodeId) -> Result<&T> {
        let entry = self.arena.get(node)?;
        T::from_body(&entry.body).ok_or_else(|| {
            Error::precondition(format!("{node:?} holds a {}", entry.body.type_name()))
        })
    }

    /// The body of `node` as a concrete type, for editing.
    ///
    /// Containers are edited through the graph so their child lists stay
    /// consistent with the parent links.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle, another type or
    /// a container.
    pub fn body_mut<T: BodyVariant>(&mut self, node: NodeId) -> Result<&mut T> {
        let entry = self.arena.get_mut(node)?;
        let type_name = entry.body.type_name();
        if entry.body.is_container() {
            return Err(Error::precondition(format!(
                "{node:?} is a container and is edited through the graph"
            )));
        }
        T::from_body_mut(&mut entry.body)
            .ok_or_else(|| Error::precondition(format!("{node:?} holds a {type_name}")))
    }

    /// Flags a container as visualizable or not.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `node` is not a container.
    pub fn set_visualizable(&mut self, node: NodeId, visualizable: bool) -> Result<()> {
        self.container_mut(node)?.set_visualizable(visualizable);
        Ok(())
    }

    /// Marks `node` modified and notifies its observer.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn set_modified(&mut self, node: NodeId) -> Result<()> {
        self.arena.get_mut(node)?.core.set_modified();
        Ok(())
    }

    /// Parent of `node`, or `None` for a root.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.arena.get(node)?.parent)
    }

    /// Children of `node` in display order; empty for a non-container.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn children(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(self.arena.get(node)?.body.children())
    }

    /// Entities without a parent.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|(_, entry)| entry.parent.is_none())
            .map(|(node, _)| node)
            .collect()
    }

    /// Appends `child` to the container `parent`.
    ///
    /// A child attached elsewhere is moved. Adding a topology child flags the
    /// container visualizable and raises the flag through its ancestors.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `parent` is not a container,
    /// `child` is already one of its children, or the edge would make
    /// `parent` its own descendant.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.arena.validate(child)?;
        if self.container_mut(parent)?.children.contains(&child) {
            return Err(Error::precondition(format!(
                "{child:?} is already a child of {parent:?}"
            )));
        }
        if self.is_ancestor_or_self(child, parent)? {
            return Err(Error::precondition(format!(
                "adding {child:?} to {parent:?} would create a cycle"
            )));
        }

        if let Some(previous) = self.arena.get(child)?.parent {
            self.remove_child(previous, child)?;
        }
        self.container_mut(parent)?.children.push(child);
        self.arena.get_mut(child)?.parent = Some(parent);
        self.arena.get_mut(parent)?.core.set_modified();

        if self.kind(child)?.is_topology() {
            self.raise_visualizable(parent)?;
        }
        Ok(())
    }

    /// Removes `child` from the container `parent` and clears its parent link.
    ///
    /// The container keeps its visualizable flag.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let container = self.container_mut(parent)?;
        let Some(position) = container.children.iter().position(|c| *c == child) else {
            return Err(Error::precondition(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        };
        container.children.remove(position);
        self.arena.get_mut(parent)?.core.set_modified();
        if let Ok(entry) = self.arena.get_mut(child) {
            entry.parent = None;
        }
        Ok(())
    }

    /// Detaches `node` from its parent, if it has one. Children stay attached.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn detach_from_hierarchy(&mut self, node: NodeId) -> Result<()> {
        match self.arena.get(node)?.parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Drops one entity from memory.
    ///
    /// Its children become roots and stay in the graph. Stored documents and
    /// the model state are untouched.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn remove_entity(&mut self, node: NodeId) -> Result<()> {
        self.detach_from_hierarchy(node)?;
        let removed = self.arena.remove(node)?;
        for child in removed.body.children() {
            if let Ok(entry) = self.arena.get_mut(*child) {
                entry.parent = None;
            }
        }
        tracing::debug!(identity = %removed.core.identity(), "entity removed from graph");
        observer::notify_removed(removed.core.observer.as_ref(), removed.core.identity());
        Ok(())
    }

    /// Deletes `node` and its descendants from memory and from the model state.
    ///
    /// Returns the identities of the deleted entities, `node` first.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn delete_subtree(&mut self, node: NodeId) -> Result<Vec<EntityIdentity>> {
        self.detach_from_hierarchy(node)?;
        let nodes = self.subtree(node)?;
        let mut deleted = Vec::with_capacity(nodes.len());
        for node in nodes {
            let entry = self.arena.remove(node)?;
            let identity = entry.core.identity();
            if identity.is_assigned() {
                self.session.model_state().remove(identity.id, true);
            }
            observer::notify_removed(entry.core.observer.as_ref(), identity);
            deleted.push(identity);
        }
        tracing::debug!(count = deleted.len(), "entity subtree deleted");
        Ok(deleted)
    }

    /// Kind of `node`. A container is topology if it is flagged visualizable
    /// or any descendant is topology.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn kind(&self, node: NodeId) -> Result<EntityKind> {
        let entry = self.arena.get(node)?;
        match entry.body.as_container() {
            Some(container) if !container.is_visualizable() => {
                for child in container.children() {
                    if self.kind(*child)?.is_topology() {
                        return Ok(EntityKind::Topology);
                    }
                }
                Ok(EntityKind::Data)
            }
            _ => Ok(entry.body.kind()),
        }
    }

    /// Bounding extent of `node`; containers aggregate their children.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn extent(&self, node: NodeId) -> Result<Extent> {
        let entry = self.arena.get(node)?;
        if !entry.body.is_container() {
            return Ok(entry.body.extent());
        }
        let mut extent = Extent::EMPTY;
        for child in entry.body.children() {
            extent.extend(&self.extent(*child)?);
        }
        Ok(extent)
    }

    /// Finds an entity by its hierarchical name, e.g. `Geometry/Body1`.
    ///
    /// Only subtrees whose name is a path prefix of `name` are searched.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut pending = self.roots();
        while let Some(node) = pending.pop() {
            let Ok(entry) = self.arena.get(node) else {
                continue;
            };
            let own = entry.core.name();
            if own == name {
                return Some(node);
            }
            let is_prefix = name
                .strip_prefix(own)
                .is_some_and(|rest| rest.starts_with('/'));
            if is_prefix || own.is_empty() {
                pending.extend(entry.body.children().iter().rev());
            }
        }
        None
    }

    /// Stored identities a load of the subtree at `node` will touch,
    /// including lazy payloads not yet in memory.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a stale handle.
    pub fn prefetch_ids(&self, node: NodeId) -> Result<Vec<EntityIdentity>> {
        let mut identities = Vec::new();
        for node in self.subtree(node)? {
            let entry = self.arena.get(node)?;
            if entry.core.identity().is_stored() {
                identities.push(entry.core.identity());
            }
            identities.extend(entry.body.unloaded_payload());
        }
        Ok(identities)
    }

    /// Stores `node` and everything below it.
    ///
    /// Ids are assigned top-down so every child records its parent; children
    /// are written before their container so the container never references
    /// an unwritten version. Unmodified entities are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first store failure. Entities written before it keep
    /// their new versions; the failing entity keeps its previous version and
    /// stays modified.
    pub fn store(&mut self, node: NodeId) -> Result<()> {
        let parent_id = match self.arena.get(node)?.parent {
            Some(parent) => self.assign_id(parent)?,
            None => 0,
        };
        for descendant in self.subtree(node)? {
            self.assign_id(descendant)?;
        }
        self.store_node(node, parent_id)?;
        Ok(())
    }

    /// Restores the stored subtree `identity`, attaching it under `parent`.
    ///
    /// A topology subtree raises `parent` and its ancestors to visualizable,
    /// as [`EntityGraph::add_child`] does. Child versions are resolved through the model state when it tracks
    /// the child. Nothing is inserted unless the whole subtree restored.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound`, `UnknownEntityType`, `SchemaMismatch` or a
    /// field error from any node of the subtree, or a precondition violation
    /// if `parent` is not a container.
    pub fn restore(&mut self, identity: EntityIdentity, parent: Option<NodeId>) -> Result<NodeId> {
        let doc = self.session.documents().fetch_required(identity)?;
        self.restore_from_document(&doc, parent)
    }

    /// Restores the subtree rooted at an already fetched document.
    ///
    /// # Errors
    ///
    /// See [`EntityGraph::restore`].
    pub fn restore_from_document(
        &mut self,
        doc: &Document,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.container_mut(parent)?;
        }
        let staged = self.stage(doc)?;
        let node = self.commit(staged, parent);
        if let Some(parent) = parent {
            self.container_mut(parent)?.children.push(node);
            if self.kind(node)?.is_topology() {
                self.raise_visualizable(parent)?;
            }
        }
        Ok(node)
    }

    /// Restores the current version of `id` as recorded in the model state.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if the model state does not track `id`,
    /// otherwise as [`EntityGraph::restore`].
    pub fn restore_current(&mut self, id: u64, parent: Option<NodeId>) -> Result<NodeId> {
        let version = self
            .session
            .model_state()
            .resolve_current_version(id)
            .ok_or_else(|| Error::document_not_found(id, 0))?;
        self.restore(EntityIdentity::new(id, version), parent)
    }

    /// Deep-copies the subtree at `node` into a new unstored root.
    ///
    /// Copies have unassigned identities and no observer.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if any entity in the subtree cannot be copied;
    /// the graph is unchanged in that case.
    pub fn clone_entity(&mut self, node: NodeId) -> Result<NodeId> {
        let staged = self.stage_copy(node)?;
        Ok(self.commit(staged, None))
    }

    fn container_mut(&mut self, node: NodeId) -> Result<&mut Container> {
        let entry = self.arena.get_mut(node)?;
        let type_name = entry.body.type_name();
        entry
            .body
            .as_container_mut()
            .ok_or_else(|| Error::precondition(format!("{type_name} {node:?} is not a container")))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        let mut current = Some(node);
        while let Some(next) = current {
            if next == ancestor {
                return Ok(true);
            }
            current = self.arena.get(next)?.parent;
        }
        Ok(false)
    }

    fn raise_visualizable(&mut self, mut node: NodeId) -> Result<()> {
        loop {
            let entry = self.arena.get_mut(node)?;
            let Some(container) = entry.body.as_container_mut() else {
                return Ok(());
            };
            if container.is_visualizable() {
                return Ok(());
            }
            container.set_visualizable(true);
            tracing::trace!(?node, "container raised to visualizable");
            match entry.parent {
                Some(parent) => node = parent,
                None => return Ok(()),
            }
        }
    }

    /// Preorder list of `node` and its descendants.
    fn subtree(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut nodes = Vec::new();
        let mut pending = vec![node];
        while let Some(next) = pending.pop() {
            let entry = self.arena.get(next)?;
            nodes.push(next);
            pending.extend(entry.body.children().iter().rev());
        }
        Ok(nodes)
    }

    fn assign_id(&mut self, node: NodeId) -> Result<u64> {
        let entry = self.arena.get_mut(node)?;
        if !entry.core.identity.is_assigned() {
            entry.core.identity.id = self.session.next_id()?;
        }
        Ok(entry.core.id())
    }

    fn store_node(&mut self, node: NodeId, parent_id: u64) -> Result<bool> {
        let (own_id, children) = {
            let entry = self.arena.get(node)?;
            (entry.core.id(), entry.body.children().to_vec())
        };
        let mut refs = Vec::with_capacity(children.len());
        for child in children {
            self.store_node(child, own_id)?;
            refs.push((self.arena.get(child)?.core.identity(), self.kind(child)?));
        }

        let kind = self.kind(node)?;
        let entry = self.arena.get_mut(node)?;
        if let Some(container) = entry.body.as_container_mut() {
            container.refresh_child_refs(refs);
        }
        persist::store_entity(&mut entry.core, &mut entry.body, kind, parent_id, &self.session)
    }

    fn stage(&self, doc: &Document) -> Result<Staged> {
        let type_name = doc.schema_type()?;
        let body = self
            .session
            .factory()
            .create(type_name)
            .ok_or_else(|| Error::unknown_entity_type(type_name))?;
        let (mut core, mut body) = persist::read_entity(doc, body, &self.session)?;
        core.observer = self.observer.clone();

        let mut children = Vec::new();
        if let Some(container) = body.as_container_mut() {
            let model_state = self.session.model_state();
            let mut loaded = Vec::with_capacity(container.child_refs().len());
            for reference in container.child_refs() {
                let version = model_state
                    .resolve_current_version(reference.id)
                    .unwrap_or(reference.version);
                let child_doc = self
                    .session
                    .documents()
                    .fetch_required(EntityIdentity::new(reference.id, version))
                    .map_err(|e| e.in_frame(format!("EntityContainer '{}'", core.name())))?;
                let child = self.stage(&child_doc)?;
                loaded.push(child.core.identity());
                children.push(child);
            }
            container.set_child_refs(loaded);
        }
        Ok(Staged {
            core,
            body,
            children,
        })
    }

    fn stage_copy(&self, node: NodeId) -> Result<Staged> {
        let entry = self.arena.get(node)?;
        let body = copy_body(&entry.body).ok_or_else(|| {
            Error::unsupported(format!(
                "copy of {} '{}'",
                entry.body.type_name(),
                entry.core.name()
            ))
        })?;
        let children = entry
            .body
            .children()
            .iter()
            .map(|child| self.stage_copy(*child))
            .collect::<Result<Vec<_>>>()?;
        Ok(Staged {
            core: entry.core.detached_copy(),
            body,
            children,
        })
    }

    fn commit(&mut self, staged: Staged, parent: Option<NodeId>) -> NodeId {
        let Staged {
            core,
            body,
            children,
        } = staged;
        let node = self.arena.insert(Node { core, body, parent });
        let handles: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.commit(child, Some(node)))
            .collect();
        if let Ok(entry) = self.arena.get_mut(node) {
            if let Some(container) = entry.body.as_container_mut() {
                container.children = handles;
            }
        }
        node
    }
}

/// Unstored copy of a body, or `None` if the type cannot be copied.
/// Container children are copied separately.
fn copy_body(body: &EntityBody) -> Option<EntityBody> {
    match body {
        EntityBody::Container(container) => {
            let mut copy = if container.is_visualizable() {
                Container::visualizable()
            } else {
                Container::new()
            };
            copy.mark_dirty();
            Some(copy.into())
        }
        EntityBody::Vector(vector) => Some(vector.detached_copy().into()),
        EntityBody::BinaryData(data) => Some(data.detached_copy().into()),
        EntityBody::FileText(file) => file.detached_copy().map(Into::into),
        _ => None,
    }
}

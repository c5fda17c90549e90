//! The persistence contract of an entity body and the shared store routine.

use modelbase_foundation::{EntityKind, Error, Extent, Result};
use modelbase_storage::Document;

use crate::core::EntityCore;
use crate::session::Session;

/// Type-specific part of an entity's persistence contract.
///
/// The generic header is handled by [`EntityCore`]; implementors only add and
/// read their own document fields.
pub trait Persist: Send + Sync {
    /// Type tag stored under `SchemaType`.
    fn type_name(&self) -> &'static str;

    /// Schema version this build writes and accepts.
    fn schema_version(&self) -> i64 {
        1
    }

    /// Classification of the entity. Containers derive theirs from the graph.
    fn kind(&self) -> EntityKind {
        EntityKind::Data
    }

    /// Appends the type-specific fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be encoded.
    fn write_fields(&self, doc: &mut Document) -> Result<()>;

    /// Reads the type-specific fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or malformed.
    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()>;

    /// Stores owned sub-objects. Returns true if a stored reference changed,
    /// in which case the owner must be rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if a sub-object could not be stored.
    fn store_owned(&mut self, _session: &Session) -> Result<bool> {
        Ok(false)
    }

    /// True if type-specific state has unpersisted changes.
    fn is_dirty(&self) -> bool {
        false
    }

    /// Clears type-specific dirty state after a successful store.
    fn mark_persisted(&mut self) {}

    /// Spatial extent of the entity itself.
    fn extent(&self) -> Extent {
        Extent::EMPTY
    }
}

/// Stores one entity if it has unpersisted changes.
///
/// Owned sub-objects go first so the document never references an
/// uncommitted version. On failure the previous version is restored and the
/// entity stays modified. Returns true if a new version was written.
pub(crate) fn store_entity<B>(
    core: &mut EntityCore,
    body: &mut B,
    kind: EntityKind,
    parent_id: u64,
    session: &Session,
) -> Result<bool>
where
    B: Persist + ?Sized,
{
    let type_name = body.type_name();
    let frame = |core: &EntityCore| format!("{type_name} '{}' ({})", core.name(), core.identity());

    let pending = body.is_dirty();
    let owned_changed = body
        .store_owned(session)
        .map_err(|e| e.in_frame(frame(core)))?;
    if pending || owned_changed {
        core.mark_modified_quietly();
    }
    if !core.is_modified() && !body.is_dirty() {
        return Ok(false);
    }

    if !core.identity.is_assigned() {
        core.identity.id = session.next_id()?;
    }
    let previous = core.identity.version;
    core.identity.version = next_version(core.id(), previous, session)?;

    let mut doc = Document::new();
    core.write_header(&mut doc, type_name, body.schema_version());
    if let Err(e) = body.write_fields(&mut doc) {
        core.identity.version = previous;
        return Err(e.in_frame(frame(core)));
    }

    if kind.is_topology() {
        if let Err(e) = session.model_state().check_version(core.id(), core.version()) {
            core.identity.version = previous;
            return Err(e.in_frame(frame(core)));
        }
    }

    if let Err(e) = session.documents().insert(doc) {
        core.identity.version = previous;
        core.mark_modified_quietly();
        tracing::warn!(type_name, id = core.id(), error = %e, "entity store failed");
        return Err(e.in_frame(frame(core)));
    }

    if kind.is_topology() {
        session
            .model_state()
            .record(core.id(), parent_id, core.version(), kind)
            .map_err(|e| e.in_frame(frame(core)))?;
    }

    core.mark_persisted();
    body.mark_persisted();
    tracing::debug!(type_name, id = core.id(), version = core.version(), %kind, "entity stored");
    Ok(true)
}

/// Picks the version for the next store of `id`.
///
/// Normally a fresh session identity. Sessions of different services share a
/// model state, so the identity is raised above both the entity's current
/// version and the highest version ever recorded for `id`.
fn next_version(id: u64, previous: u64, session: &Session) -> Result<u64> {
    let floor = session
        .model_state()
        .high_water(id)
        .map_or(previous, |recorded| recorded.max(previous));
    let candidate = session.next_id()?;
    if candidate > floor {
        return Ok(candidate);
    }
    floor
        .checked_add(1)
        .ok_or_else(|| Error::precondition(format!("versions of entity {id} are exhausted")))
}

/// Rebuilds header and body from a document.
pub(crate) fn read_entity<B>(doc: &Document, mut body: B, session: &Session) -> Result<(EntityCore, B)>
where
    B: Persist,
{
    let type_name = body.type_name();
    let core = EntityCore::read_header(doc, type_name, body.schema_version(), session)?;
    body.read_fields(doc, session)
        .map_err(|e| e.in_frame(format!("{type_name} '{}' ({})", core.name(), core.identity())))?;
    tracing::debug!(type_name, id = core.id(), version = core.version(), "entity restored");
    Ok((core, body))
}

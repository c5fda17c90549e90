//! State shared by every entity: identity, name, flags and properties.

use modelbase_foundation::{EntityIdentity, Error, PropertyBag, Result};
use modelbase_storage::document::{ENTITY_ID_KEY, SCHEMA_TYPE_KEY, VERSION_KEY};
use modelbase_storage::{Document, schema_version_key};

use crate::observer::{self, ObserverRef};
use crate::session::Session;

/// Generic header of an entity.
///
/// Setters mark the entity modified. The parent link lives in the graph and
/// the observer is never persisted.
#[derive(Clone)]
pub struct EntityCore {
    pub(crate) identity: EntityIdentity,
    name: String,
    owner: String,
    deletable: bool,
    initially_hidden: bool,
    editable: bool,
    select_children: bool,
    manage_parent_visibility: bool,
    manage_child_visibility: bool,
    properties: PropertyBag,
    modified: bool,
    pub(crate) observer: Option<ObserverRef>,
}

impl std::fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCore")
            .field("identity", &self.identity)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("modified", &self.is_modified())
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

/// Compares persisted state only; modified flag and observer are ignored.
impl PartialEq for EntityCore {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.name == other.name
            && self.owner == other.owner
            && self.deletable == other.deletable
            && self.initially_hidden == other.initially_hidden
            && self.editable == other.editable
            && self.select_children == other.select_children
            && self.manage_parent_visibility == other.manage_parent_visibility
            && self.manage_child_visibility == other.manage_child_visibility
            && self.properties.to_json() == other.properties.to_json()
    }
}

impl EntityCore {
    /// Creates the header of a new, unstored entity.
    ///
    /// The owner is left empty and filled from the configuration when the
    /// entity joins a graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: EntityIdentity::UNASSIGNED,
            name: name.into(),
            owner: String::new(),
            deletable: true,
            initially_hidden: false,
            editable: false,
            select_children: true,
            manage_parent_visibility: true,
            manage_child_visibility: true,
            properties: PropertyBag::new(),
            modified: true,
            observer: None,
        }
    }

    /// Identity of the last stored snapshot (or unassigned).
    #[must_use]
    pub fn identity(&self) -> EntityIdentity {
        self.identity
    }

    /// Permanent identifier; `0` until first stored.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.identity.id
    }

    /// Version of the last stored snapshot; `0` if never stored.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.identity.version
    }

    /// Display name; hierarchical names use `/` separators.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the entity.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.modified = true;
    }

    /// Owning-service tag.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Sets the owning-service tag.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
        self.modified = true;
    }

    /// Whether users may delete the entity.
    #[must_use]
    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    /// Sets whether users may delete the entity.
    pub fn set_deletable(&mut self, deletable: bool) {
        self.deletable = deletable;
        self.modified = true;
    }

    /// Whether the entity starts hidden in a viewer.
    #[must_use]
    pub fn is_initially_hidden(&self) -> bool {
        self.initially_hidden
    }

    /// Sets whether the entity starts hidden.
    pub fn set_initially_hidden(&mut self, hidden: bool) {
        self.initially_hidden = hidden;
        self.modified = true;
    }

    /// Whether the entity's content can be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Sets whether the content can be edited.
    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.modified = true;
    }

    /// Whether selecting the entity selects its children.
    #[must_use]
    pub fn selects_children(&self) -> bool {
        self.select_children
    }

    /// Sets whether selecting the entity selects its children.
    pub fn set_select_children(&mut self, select: bool) {
        self.select_children = select;
        self.modified = true;
    }

    /// Whether visibility changes propagate to the parent.
    #[must_use]
    pub fn manages_parent_visibility(&self) -> bool {
        self.manage_parent_visibility
    }

    /// Sets whether visibility changes propagate to the parent.
    pub fn set_manage_parent_visibility(&mut self, manage: bool) {
        self.manage_parent_visibility = manage;
        self.modified = true;
    }

    /// Whether visibility changes propagate to children.
    #[must_use]
    pub fn manages_child_visibility(&self) -> bool {
        self.manage_child_visibility
    }

    /// Sets whether visibility changes propagate to children.
    pub fn set_manage_child_visibility(&mut self, manage: bool) {
        self.manage_child_visibility = manage;
        self.modified = true;
    }

    /// The property bag.
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// The property bag, for editing. Edits are tracked by the bag itself.
    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    /// True if the header or the property bag has unpersisted changes.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified || self.properties.is_changed()
    }

    /// Marks the entity modified and notifies its observer.
    pub fn set_modified(&mut self) {
        self.modified = true;
        observer::notify_modified(self.observer.as_ref(), self.identity);
    }

    pub(crate) fn mark_modified_quietly(&mut self) {
        self.modified = true;
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.modified = false;
        self.properties.clear_changed();
    }

    pub(crate) fn fill_default_owner(&mut self, owner: &str) {
        if self.owner.is_empty() {
            self.owner = owner.to_owned();
        }
    }

    /// Copy with unassigned identity and no observer, ready to be stored anew.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            identity: EntityIdentity::UNASSIGNED,
            modified: true,
            observer: None,
            ..self.clone()
        }
    }

    pub(crate) fn write_header(&self, doc: &mut Document, type_name: &str, schema_version: i64) {
        doc.insert(SCHEMA_TYPE_KEY, type_name);
        doc.insert(schema_version_key(type_name), schema_version);
        doc.insert(ENTITY_ID_KEY, self.identity.id);
        doc.insert(VERSION_KEY, self.identity.version);
        doc.insert("Name", self.name.as_str());
        doc.insert("isDeletable", self.deletable);
        doc.insert("initiallyHidden", self.initially_hidden);
        doc.insert("isEditable", self.editable);
        doc.insert("selectChildren", self.select_children);
        doc.insert("manageParentVisibility", self.manage_parent_visibility);
        doc.insert("manageChildVisibility", self.manage_child_visibility);
        doc.insert("Owner", self.owner.as_str());
        doc.insert("Properties", self.properties.to_json());
    }

    /// Reads the generic header, failing closed on a schema version mismatch.
    pub(crate) fn read_header(
        doc: &Document,
        type_name: &str,
        schema_version: i64,
        session: &Session,
    ) -> Result<Self> {
        let stored = doc.get_i64(&schema_version_key(type_name))?;
        if stored != schema_version {
            return Err(Error::schema_mismatch(type_name, schema_version, stored));
        }

        let mut properties = PropertyBag::from_json(doc.require("Properties")?)?;
        properties.reset_needs_update();

        Ok(Self {
            identity: doc.identity()?,
            name: doc.get_str("Name")?.to_owned(),
            initially_hidden: doc.get_bool("initiallyHidden")?,
            owner: doc.str_or("Owner", &session.config().default_owner)?,
            deletable: doc.bool_or("isDeletable", true)?,
            editable: doc.bool_or("isEditable", false)?,
            select_children: doc.bool_or("selectChildren", true)?,
            manage_parent_visibility: doc.bool_or("manageParentVisibility", true)?,
            manage_child_visibility: doc.bool_or("manageChildVisibility", true)?,
            properties,
            modified: false,
            observer: None,
        })
    }
}

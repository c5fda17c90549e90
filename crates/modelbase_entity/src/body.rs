//! The closed set of entity bodies plus an escape hatch for custom types.

use modelbase_foundation::{EntityIdentity, EntityKind, Extent, Result};
use modelbase_storage::Document;

use crate::lazy::LazySlot;
use crate::persist::Persist;
use crate::session::Session;
use crate::types::{
    Annotation, AnnotationData, BinaryData, Container, FileText, MeshFaceList, MeshItem,
    ResultTable, TableData, TextData, VectorData,
};

/// Type-specific part of an in-memory entity.
#[derive(Debug)]
pub enum EntityBody {
    /// Ordered collection of children.
    Container(Container),
    /// Compressed numeric vector.
    Vector(VectorData),
    /// Raw binary payload.
    BinaryData(BinaryData),
    /// Surface mesh.
    MeshItem(MeshItem),
    /// Face list of a mesh.
    MeshFaceList(MeshFaceList),
    /// Visual annotation.
    Annotation(Annotation),
    /// Triangles of an annotation.
    AnnotationData(AnnotationData),
    /// Result table.
    ResultTable(ResultTable),
    /// Cells of a result table.
    TableData(TableData),
    /// Text file.
    FileText(FileText),
    /// Content of a text file.
    TextData(TextData),
    /// A type registered by the embedding service.
    Custom(Box<dyn CustomBody>),
}

/// A body type defined outside this crate.
pub trait CustomBody: Persist + std::fmt::Debug {}

impl<T: Persist + std::fmt::Debug> CustomBody for T {}

macro_rules! dispatch {
    ($body:expr, $inner:ident => $action:expr) => {
        match $body {
            EntityBody::Container($inner) => $action,
            EntityBody::Vector($inner) => $action,
            EntityBody::BinaryData($inner) => $action,
            EntityBody::MeshItem($inner) => $action,
            EntityBody::MeshFaceList($inner) => $action,
            EntityBody::Annotation($inner) => $action,
            EntityBody::AnnotationData($inner) => $action,
            EntityBody::ResultTable($inner) => $action,
            EntityBody::TableData($inner) => $action,
            EntityBody::FileText($inner) => $action,
            EntityBody::TextData($inner) => $action,
            EntityBody::Custom($inner) => $action,
        }
    };
}

impl Persist for EntityBody {
    fn type_name(&self) -> &'static str {
        dispatch!(self, b => b.type_name())
    }

    fn schema_version(&self) -> i64 {
        dispatch!(self, b => b.schema_version())
    }

    fn kind(&self) -> EntityKind {
        dispatch!(self, b => b.kind())
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        dispatch!(self, b => b.write_fields(doc))
    }

    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()> {
        dispatch!(self, b => b.read_fields(doc, session))
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        dispatch!(self, b => b.store_owned(session))
    }

    fn is_dirty(&self) -> bool {
        dispatch!(self, b => b.is_dirty())
    }

    fn mark_persisted(&mut self) {
        dispatch!(self, b => b.mark_persisted());
    }

    fn extent(&self) -> Extent {
        dispatch!(self, b => b.extent())
    }
}

impl EntityBody {
    /// The container, if this body is one.
    #[must_use]
    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    pub(crate) fn as_container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Returns true for a container.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }

    /// Child handles of a container; empty for any other body.
    #[must_use]
    pub fn children(&self) -> &[modelbase_foundation::NodeId] {
        match self {
            Self::Container(container) => container.children(),
            _ => &[],
        }
    }

    /// Reference to a lazy payload that is not in memory, if the body has one.
    #[must_use]
    pub fn unloaded_payload(&self) -> Option<EntityIdentity> {
        let identity = match self {
            Self::MeshItem(mesh) => payload_ref(mesh.faces()),
            Self::Annotation(annotation) => payload_ref(annotation.data()),
            Self::ResultTable(table) => payload_ref(table.table()),
            Self::FileText(file) => payload_ref(file.text()),
            _ => None,
        }?;
        identity.is_assigned().then_some(identity)
    }

    /// The custom body, if this is one.
    #[must_use]
    pub fn as_custom(&self) -> Option<&dyn CustomBody> {
        match self {
            Self::Custom(custom) => Some(&**custom),
            _ => None,
        }
    }
}

fn payload_ref<T>(slot: &LazySlot<T>) -> Option<EntityIdentity> {
    (!slot.is_loaded()).then(|| slot.identity())
}

/// Typed access to one variant of [`EntityBody`].
pub trait BodyVariant: Sized {
    /// Borrows the variant, if `body` holds it.
    fn from_body(body: &EntityBody) -> Option<&Self>;
    /// Mutably borrows the variant, if `body` holds it.
    fn from_body_mut(body: &mut EntityBody) -> Option<&mut Self>;
}

macro_rules! body_variants {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EntityBody {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl BodyVariant for $ty {
                fn from_body(body: &EntityBody) -> Option<&Self> {
                    match body {
                        EntityBody::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_body_mut(body: &mut EntityBody) -> Option<&mut Self> {
                    match body {
                        EntityBody::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

body_variants! {
    Container => Container,
    Vector => VectorData,
    BinaryData => BinaryData,
    MeshItem => MeshItem,
    MeshFaceList => MeshFaceList,
    Annotation => Annotation,
    AnnotationData => AnnotationData,
    ResultTable => ResultTable,
    TableData => TableData,
    FileText => FileText,
    TextData => TextData,
}

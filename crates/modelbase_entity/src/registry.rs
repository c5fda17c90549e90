//! Mapping from stored type tags to entity constructors.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::body::EntityBody;
use crate::types::{
    Annotation, AnnotationData, BinaryData, Container, FileText, MeshFaceList, MeshItem,
    ResultTable, TableData, TextData, VectorData,
};

/// Instantiates empty entity bodies by type tag before a restore fills them.
pub trait EntityFactory: Send + Sync {
    /// Creates an empty body for `type_name`, or `None` if the tag is unknown.
    fn create(&self, type_name: &str) -> Option<EntityBody>;
}

type Constructor = Arc<dyn Fn() -> EntityBody + Send + Sync>;

/// Explicit table of type tags and constructors.
#[derive(Default)]
pub struct EntityRegistry {
    constructors: RwLock<HashMap<String, Constructor>>,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry knowing every built-in entity type.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        let registry = Self::new();
        registry.register("EntityContainer", || Container::new().into());
        registry.register("EntityCompressedVector", || VectorData::default().into());
        registry.register("EntityBinaryData", || BinaryData::default().into());
        registry.register("EntityMeshItem", || MeshItem::default().into());
        registry.register("EntityMeshFaceList", || MeshFaceList::default().into());
        registry.register("EntityAnnotation", || Annotation::default().into());
        registry.register("EntityAnnotationData", || AnnotationData::default().into());
        registry.register("EntityResultTable", || ResultTable::default().into());
        registry.register("EntityTableData", || TableData::default().into());
        registry.register("EntityFileText", || FileText::default().into());
        registry.register("EntityTextData", || TextData::default().into());
        registry
    }

    /// Registers a constructor, replacing any previous one for the tag.
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> EntityBody + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        tracing::trace!(%type_name, "entity type registered");
        self.constructors
            .write()
            .insert(type_name, Arc::new(constructor));
    }

    /// Returns true if the tag is known.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.read().contains_key(type_name)
    }

    /// Known tags, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl EntityFactory for EntityRegistry {
    fn create(&self, type_name: &str) -> Option<EntityBody> {
        let constructor = self.constructors.read().get(type_name).cloned()?;
        Some(constructor())
    }
}

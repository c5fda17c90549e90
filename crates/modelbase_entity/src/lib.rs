//! Entity graph, containers, lazy subobjects, and typed entities for modelbase.
//!
//! This crate provides:
//! - [`EntityGraph`] - Arena-owned entity tree with store and restore
//! - [`EntityCore`] - Identity, name, flags and properties shared by every entity
//! - [`Persist`] - The per-type persistence contract
//! - [`LazySlot`] - On-demand loading of heavyweight payloads
//! - [`EntityRegistry`] - Type tag to constructor mapping
//! - [`Session`] - The stores and generator one process stores through
//! - Built-in entity types in [`types`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod arena;
pub mod body;
pub mod core;
pub mod graph;
pub mod lazy;
pub mod observer;
pub mod persist;
pub mod registry;
pub mod session;
pub mod types;

pub use arena::NodeArena;
pub use body::{BodyVariant, CustomBody, EntityBody};
pub use crate::core::EntityCore;
pub use graph::EntityGraph;
pub use lazy::{LazySlot, Loaded, Record};
pub use observer::{EntityObserver, ObserverRef, observe};
pub use persist::Persist;
pub use registry::{EntityFactory, EntityRegistry};
pub use session::Session;
pub use types::{
    Annotation, AnnotationData, BinaryData, Container, FileText, MeshFaceList, MeshItem,
    ResultTable, TableData, TextData, Triangle, VectorData,
};

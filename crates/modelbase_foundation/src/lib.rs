//! Identities, errors, property bags, and configuration for modelbase.
//!
//! This crate provides:
//! - [`EntityIdentity`] - Stable id plus immutable version of a stored entity
//! - [`IdentityGenerator`] / [`IdentityCell`] - Scoped, thread-safe id issuance
//! - [`PropertyBag`] - Typed, named properties with dirty tracking
//! - [`Extent`] - Axis-aligned bounding boxes
//! - [`StoreConfig`] - Engine configuration
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod entity;
pub mod error;
pub mod extent;
pub mod identity;
pub mod number;
pub mod properties;
pub mod types;
pub mod value;

pub use config::StoreConfig;
pub use entity::{EntityIdentity, EntityKind, NodeId};
pub use error::{Error, ErrorContext, ErrorKind};
pub use extent::Extent;
pub use identity::{IdentityCell, IdentityGenerator, MAX_SESSION_ID};
pub use properties::{Property, PropertyBag};
pub use types::PropertyType;
pub use value::PropertyValue;

/// Result type alias using the modelbase error.
pub type Result<T> = std::result::Result<T, Error>;

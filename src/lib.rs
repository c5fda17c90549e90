//! Modelbase - Entity persistence and versioned-graph engine
//!
//! This crate re-exports all layers of the Modelbase system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: modelbase_entity     - Entity graph, containers, lazy slots, typed entities
//! Layer 1: modelbase_storage    - Documents, blob overflow, vector codec, model state
//! Layer 0: modelbase_foundation - Identities, generator, errors, properties, config
//! ```

pub use modelbase_entity as entity;
pub use modelbase_foundation as foundation;
pub use modelbase_storage as storage;

//! Integration tests for Layer 2: Entities
//!
//! Tests for lazy sub-objects, the built-in entity types and custom bodies
//! registered by the embedding service.

mod lazy;
mod types;

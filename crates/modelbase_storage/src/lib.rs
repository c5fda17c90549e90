//! Documents, blob overflow, vector compression, and model state for modelbase.
//!
//! This crate provides:
//! - [`Document`] - Ordered JSON documents with typed accessors
//! - [`DocumentStore`] - Immutable, versioned document storage
//! - [`BlobStore`] / [`BinaryOverflowStore`] - Inline-or-chunked binary payloads
//! - [`CompressedVector`] - Run-length codec for numeric vectors
//! - [`ModelState`] - Current-version registry with checkpoints
//! - [`StoreSnapshot`] - `MessagePack` images of the in-memory stores

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blob;
pub mod codec;
pub mod document;
pub mod model_state;
pub mod overflow;
pub mod snapshot;
pub mod store;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use codec::{CompressedVector, Run};
pub use document::{Document, schema_version_key};
pub use model_state::{Checkpoint, ModelEntry, ModelState};
pub use overflow::{BinaryOverflowStore, BinaryRef};
pub use snapshot::StoreSnapshot;
pub use store::{DocumentStore, MemoryDocumentStore};

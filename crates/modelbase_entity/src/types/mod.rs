//! Built-in entity types.
//!
//! Topology entities keep their heavyweight payloads in [`LazySlot`]s; the
//! payload types are data entities stored as separate documents.
//!
//! [`LazySlot`]: crate::lazy::LazySlot

mod annotation;
mod binary_data;
mod container;
mod mesh;
mod table;
mod text;
mod vector;

pub use annotation::{Annotation, AnnotationData, Triangle};
pub use binary_data::BinaryData;
pub use container::Container;
pub use mesh::{MeshFaceList, MeshItem};
pub use table::{ResultTable, TableData};
pub use text::{FileText, TextData};
pub use vector::VectorData;

use modelbase_foundation::{EntityIdentity, Error, Result};
use modelbase_storage::{BinaryRef, Document};

use crate::lazy::LazySlot;
use crate::session::Session;

/// Writes the `<prefix>ID` / `<prefix>Version` pair referencing a slot's payload.
fn write_slot_ref<T>(doc: &mut Document, prefix: &str, slot: &LazySlot<T>) {
    let identity = slot.identity();
    doc.insert(format!("{prefix}ID"), identity.id);
    doc.insert(format!("{prefix}Version"), identity.version);
}

/// Reads a slot reference written by [`write_slot_ref`]; the payload stays unloaded.
fn read_slot_ref<T>(doc: &Document, prefix: &str) -> Result<LazySlot<T>> {
    let id = doc.get_u64(&format!("{prefix}ID"))?;
    let version = doc.get_u64(&format!("{prefix}Version"))?;
    Ok(LazySlot::unloaded(EntityIdentity::new(id, version)))
}

/// Writes an RGB triple.
fn write_color(doc: &mut Document, key: &str, color: [f64; 3]) {
    doc.insert_f64_array(key, &color);
}

fn read_color(doc: &Document, key: &str) -> Result<[f64; 3]> {
    let values = doc.get_f64_array(key)?;
    <[f64; 3]>::try_from(values).map_err(|_| Error::invalid_field(key, "array of 3 numbers"))
}

/// Inserts the stored reference of an overflow payload.
///
/// The reference is produced when owned data is stored, before the fields
/// are written.
fn write_binary(doc: &mut Document, key: &str, reference: Option<&BinaryRef>) -> Result<()> {
    let reference = reference
        .ok_or_else(|| Error::precondition(format!("binary field {key} was not written")))?;
    doc.insert(key, reference.to_json());
    Ok(())
}

/// Reads an overflow payload eagerly, returning its reference and bytes.
fn read_binary(doc: &Document, key: &str, session: &Session) -> Result<(BinaryRef, Vec<u8>)> {
    let reference = BinaryRef::from_json(key, doc.require(key)?)?;
    let bytes = session.overflow().read(&reference)?;
    Ok((reference, bytes))
}

use modelbase_foundation::{Error, Result, StoreConfig};
use modelbase_storage::{CompressedVector, Document};

use crate::persist::Persist;
use crate::session::Session;

/// A large numeric vector stored in compressed form.
#[derive(Debug, Clone, Default)]
pub struct VectorData {
    vector: CompressedVector,
    dirty: bool,
}

impl PartialEq for VectorData {
    fn eq(&self, other: &Self) -> bool {
        self.vector == other.vector
    }
}

impl VectorData {
    /// Compresses `values` with the given tolerance.
    #[must_use]
    pub fn new(values: &[f64], tolerance: f64) -> Self {
        Self {
            vector: CompressedVector::encode(values, tolerance),
            dirty: true,
        }
    }

    /// Replaces the content, compressing with `tolerance`.
    pub fn set_values(&mut self, values: &[f64], tolerance: f64) {
        self.vector = CompressedVector::encode(values, tolerance);
        self.dirty = true;
    }

    /// Replaces the content using the configured default tolerance.
    pub fn set_values_default(&mut self, values: &[f64], config: &StoreConfig) {
        self.set_values(values, config.default_tolerance);
    }

    /// Replaces the content with an already compressed vector.
    pub fn set_compressed(&mut self, vector: CompressedVector) {
        self.vector = vector;
        self.dirty = true;
    }

    /// The compressed vector.
    #[must_use]
    pub fn compressed(&self) -> &CompressedVector {
        &self.vector
    }

    /// Number of values after expansion.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vector.uncompressed_len()
    }

    /// Returns true for an empty vector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the vector.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if the stored runs are inconsistent.
    pub fn values(&self) -> Result<Vec<f64>> {
        self.vector.decode()
    }

    /// Adds the vector element-wise to `dense`.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if `dense` has a different length.
    pub fn add_to(&self, dense: &mut [f64]) -> Result<()> {
        self.vector.add_in_place(dense)
    }

    /// Multiplies `dense` element-wise by the vector.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if `dense` has a different length.
    pub fn multiply(&self, dense: &mut [f64]) -> Result<()> {
        self.vector.multiply_in_place(dense)
    }

    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            vector: self.vector.clone(),
            dirty: true,
        }
    }
}

impl Persist for VectorData {
    fn type_name(&self) -> &'static str {
        "EntityCompressedVector"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.insert_f64("tolerance", self.vector.tolerance());
        doc.insert("uncompressedLength", self.vector.uncompressed_len() as u64);
        doc.insert("dataValuesSize", self.vector.values_len() as u64);
        doc.insert("dataCountSize", self.vector.counts().len() as u64);
        doc.insert_f64_array("dataValues", self.vector.values());
        doc.insert("dataCount", self.vector.counts().to_vec());
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        let size = |key: &str| -> Result<usize> {
            usize::try_from(doc.get_u64(key)?).map_err(|_| Error::invalid_field(key, "length"))
        };
        let values = doc.get_f64_array("dataValues")?;
        let counts = doc.get_i64_array("dataCount")?;
        let values_size = size("dataValuesSize")?;
        if values.len() != values_size {
            return Err(Error::length_mismatch(values_size, values.len()));
        }
        let count_size = size("dataCountSize")?;
        if counts.len() != count_size {
            return Err(Error::length_mismatch(count_size, counts.len()));
        }

        self.vector = CompressedVector::from_parts(
            doc.get_f64("tolerance")?,
            size("uncompressedLength")?,
            values,
            counts,
        )?;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }
}

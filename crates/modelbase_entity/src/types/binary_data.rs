use modelbase_foundation::Result;
use modelbase_storage::{BinaryRef, Document};

use crate::persist::Persist;
use crate::session::Session;

/// A raw binary payload, such as an imported file.
///
/// Small payloads are embedded in the document; large ones go to the
/// overflow store. Replacing the bytes never deletes the previous overflow
/// blob, since older versions of the entity still reference it.
#[derive(Debug, Clone, Default)]
pub struct BinaryData {
    bytes: Vec<u8>,
    reference: Option<BinaryRef>,
}

impl PartialEq for BinaryData {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl BinaryData {
    /// Creates an unstored payload.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            reference: None,
        }
    }

    /// The payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replaces the payload.
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.reference = None;
    }

    /// Where the payload was last written, if it has been.
    #[must_use]
    pub fn reference(&self) -> Option<&BinaryRef> {
        self.reference.as_ref()
    }

    pub(crate) fn detached_copy(&self) -> Self {
        Self::new(self.bytes.clone())
    }
}

impl Persist for BinaryData {
    fn type_name(&self) -> &'static str {
        "EntityBinaryData"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_binary(doc, "Data", self.reference.as_ref())
    }

    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()> {
        let (reference, bytes) = super::read_binary(doc, "Data", session)?;
        self.bytes = bytes;
        self.reference = Some(reference);
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        if self.reference.is_none() {
            self.reference = Some(session.overflow().write(&self.bytes)?);
        }
        Ok(false)
    }

    fn is_dirty(&self) -> bool {
        self.reference.is_none()
    }
}

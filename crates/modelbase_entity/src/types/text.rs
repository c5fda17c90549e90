use modelbase_foundation::{EntityKind, Error, Result};
use modelbase_storage::{BinaryRef, Document};

use crate::lazy::LazySlot;
use crate::persist::Persist;
use crate::session::Session;

/// Text content of a file, stored as UTF-8 bytes.
#[derive(Debug, Clone, Default)]
pub struct TextData {
    text: String,
    reference: Option<BinaryRef>,
}

impl PartialEq for TextData {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl TextData {
    /// Creates unstored text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference: None,
        }
    }

    /// The text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.reference = None;
    }
}

impl Persist for TextData {
    fn type_name(&self) -> &'static str {
        "EntityTextData"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_binary(doc, "Text", self.reference.as_ref())
    }

    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()> {
        let (reference, bytes) = super::read_binary(doc, "Text", session)?;
        self.text =
            String::from_utf8(bytes).map_err(|_| Error::invalid_field("Text", "UTF-8 text"))?;
        self.reference = Some(reference);
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        if self.reference.is_none() {
            self.reference = Some(session.overflow().write(self.text.as_bytes())?);
        }
        Ok(false)
    }

    fn is_dirty(&self) -> bool {
        self.reference.is_none()
    }
}

/// A text file in the model; its content is loaded on demand.
#[derive(Debug, Clone, Default)]
pub struct FileText {
    text: LazySlot<TextData>,
    file_name: String,
    encoding: String,
    dirty: bool,
}

/// Compares stored state: the content by reference, not by value.
impl PartialEq for FileText {
    fn eq(&self, other: &Self) -> bool {
        self.text.identity() == other.text.identity()
            && self.file_name == other.file_name
            && self.encoding == other.encoding
    }
}

impl FileText {
    /// Creates a UTF-8 text file.
    #[must_use]
    pub fn new(file_name: impl Into<String>, text: TextData) -> Self {
        Self {
            text: LazySlot::with_value(text),
            file_name: file_name.into(),
            encoding: "UTF-8".to_owned(),
            dirty: true,
        }
    }

    /// The content slot.
    #[must_use]
    pub fn text(&self) -> &LazySlot<TextData> {
        &self.text
    }

    /// The content slot, for loading or releasing.
    pub fn text_mut(&mut self) -> &mut LazySlot<TextData> {
        &mut self.text
    }

    /// Original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sets the file name.
    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
        self.dirty = true;
    }

    /// Encoding the file had before import.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Sets the source encoding.
    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = encoding.into();
        self.dirty = true;
    }

    /// Copy with a new, unstored copy of the loaded content.
    pub(crate) fn detached_copy(&self) -> Option<Self> {
        Some(Self {
            text: self.text.detached_copy()?,
            file_name: self.file_name.clone(),
            encoding: self.encoding.clone(),
            dirty: true,
        })
    }
}

impl Persist for FileText {
    fn type_name(&self) -> &'static str {
        "EntityFileText"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Topology
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_slot_ref(doc, "TextData", &self.text);
        doc.insert("FileName", self.file_name.as_str());
        doc.insert("Encoding", self.encoding.as_str());
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        self.text = super::read_slot_ref(doc, "TextData")?;
        self.file_name = doc.get_str("FileName")?.to_owned();
        self.encoding = doc.get_str("Encoding")?.to_owned();
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        self.text.store_for_owner(session)
    }

    fn is_dirty(&self) -> bool {
        self.dirty || self.text.is_dirty()
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }
}

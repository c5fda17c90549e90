use modelbase_foundation::{EntityKind, Error, Extent, Result};
use modelbase_storage::{BinaryRef, Document};

use crate::lazy::LazySlot;
use crate::persist::Persist;
use crate::session::Session;

/// Triangle list of a mesh item, as vertex index triples.
#[derive(Debug, Clone, Default)]
pub struct MeshFaceList {
    faces: Vec<[u32; 3]>,
    reference: Option<BinaryRef>,
}

impl PartialEq for MeshFaceList {
    fn eq(&self, other: &Self) -> bool {
        self.faces == other.faces
    }
}

impl MeshFaceList {
    /// Creates an unstored face list.
    #[must_use]
    pub fn new(faces: Vec<[u32; 3]>) -> Self {
        Self {
            faces,
            reference: None,
        }
    }

    /// The faces.
    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Number of faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if there are no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Replaces the faces.
    pub fn set_faces(&mut self, faces: Vec<[u32; 3]>) {
        self.faces = faces;
        self.reference = None;
    }

    /// Appends one face.
    pub fn push(&mut self, face: [u32; 3]) {
        self.faces.push(face);
        self.reference = None;
    }

    fn encode(&self) -> Vec<u8> {
        self.faces
            .iter()
            .flatten()
            .flat_map(|index| index.to_le_bytes())
            .collect()
    }

    fn decode(bytes: &[u8]) -> Result<Vec<[u32; 3]>> {
        if bytes.len() % 12 != 0 {
            return Err(Error::invalid_field("Faces", "whole index triples"));
        }
        Ok(bytes
            .chunks_exact(12)
            .map(|face| {
                let index = |i: usize| {
                    u32::from_le_bytes([face[i], face[i + 1], face[i + 2], face[i + 3]])
                };
                [index(0), index(4), index(8)]
            })
            .collect())
    }
}

impl Persist for MeshFaceList {
    fn type_name(&self) -> &'static str {
        "EntityMeshFaceList"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.insert("NumberFaces", self.faces.len() as u64);
        super::write_binary(doc, "Faces", self.reference.as_ref())
    }

    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()> {
        let count = doc.get_u64("NumberFaces")?;
        let (reference, bytes) = super::read_binary(doc, "Faces", session)?;
        let faces = Self::decode(&bytes)?;
        if faces.len() as u64 != count {
            return Err(Error::length_mismatch(
                usize::try_from(count).unwrap_or(usize::MAX),
                faces.len(),
            ));
        }
        self.faces = faces;
        self.reference = Some(reference);
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        if self.reference.is_none() {
            self.reference = Some(session.overflow().write(&self.encode())?);
        }
        Ok(false)
    }

    fn is_dirty(&self) -> bool {
        self.reference.is_none()
    }
}

/// A renderable surface mesh. The face list is loaded on demand.
#[derive(Debug, Clone, Default)]
pub struct MeshItem {
    faces: LazySlot<MeshFaceList>,
    bounding_box: Extent,
    triangles: u64,
    color: [f64; 3],
    dirty: bool,
}

/// Compares stored state: the face list by reference, not by content.
impl PartialEq for MeshItem {
    fn eq(&self, other: &Self) -> bool {
        self.faces.identity() == other.faces.identity()
            && self.bounding_box == other.bounding_box
            && self.triangles == other.triangles
            && self.color == other.color
    }
}

impl MeshItem {
    /// Creates a mesh item with the given faces.
    #[must_use]
    pub fn new(faces: MeshFaceList, bounding_box: Extent, color: [f64; 3]) -> Self {
        Self {
            triangles: faces.len() as u64,
            faces: LazySlot::with_value(faces),
            bounding_box,
            color,
            dirty: true,
        }
    }

    /// The face list slot.
    #[must_use]
    pub fn faces(&self) -> &LazySlot<MeshFaceList> {
        &self.faces
    }

    /// The face list slot, for loading or releasing.
    pub fn faces_mut(&mut self) -> &mut LazySlot<MeshFaceList> {
        &mut self.faces
    }

    /// Number of triangles as of the last store.
    #[must_use]
    pub fn triangle_count(&self) -> u64 {
        self.triangles
    }

    /// Bounding box of the mesh.
    #[must_use]
    pub fn bounding_box(&self) -> Extent {
        self.bounding_box
    }

    /// Sets the bounding box.
    pub fn set_bounding_box(&mut self, bounding_box: Extent) {
        self.bounding_box = bounding_box;
        self.dirty = true;
    }

    /// Surface color.
    #[must_use]
    pub fn color(&self) -> [f64; 3] {
        self.color
    }

    /// Sets the surface color.
    pub fn set_color(&mut self, color: [f64; 3]) {
        self.color = color;
        self.dirty = true;
    }
}

impl Persist for MeshItem {
    fn type_name(&self) -> &'static str {
        "EntityMeshItem"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Topology
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_slot_ref(doc, "FaceList", &self.faces);
        doc.insert("BoundingBox", self.bounding_box.to_json());
        doc.insert("NumberTriangles", self.triangles);
        super::write_color(doc, "Color", self.color);
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        self.faces = super::read_slot_ref(doc, "FaceList")?;
        self.bounding_box = Extent::from_json("BoundingBox", doc.require("BoundingBox")?)?;
        self.triangles = doc.get_u64("NumberTriangles")?;
        self.color = super::read_color(doc, "Color")?;
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        let mut changed = self.faces.store_for_owner(session)?;
        if let Some(record) = self.faces.loaded() {
            let count = record.body().len() as u64;
            if count != self.triangles {
                self.triangles = count;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn is_dirty(&self) -> bool {
        self.dirty || self.faces.is_dirty()
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }

    fn extent(&self) -> Extent {
        self.bounding_box
    }
}

use modelbase_foundation::{EntityKind, Error, Extent, Result};
use modelbase_storage::{BinaryRef, Document};

use crate::lazy::LazySlot;
use crate::persist::Persist;
use crate::session::Session;

/// Three corner points.
pub type Triangle = [[f64; 3]; 3];

const TRIANGLE_BYTES: usize = 9 * 8;

/// Triangle soup displayed by an annotation.
#[derive(Debug, Clone, Default)]
pub struct AnnotationData {
    triangles: Vec<Triangle>,
    reference: Option<BinaryRef>,
}

impl PartialEq for AnnotationData {
    fn eq(&self, other: &Self) -> bool {
        self.triangles == other.triangles
    }
}

impl AnnotationData {
    /// Creates unstored annotation data.
    #[must_use]
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self {
            triangles,
            reference: None,
        }
    }

    /// The triangles.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Replaces the triangles.
    pub fn set_triangles(&mut self, triangles: Vec<Triangle>) {
        self.triangles = triangles;
        self.reference = None;
    }

    /// Bounding box of all corner points.
    #[must_use]
    pub fn extent(&self) -> Extent {
        let mut extent = Extent::EMPTY;
        for point in self.triangles.iter().flatten() {
            extent.include_point(*point);
        }
        extent
    }

    fn encode(&self) -> Vec<u8> {
        self.triangles
            .iter()
            .flatten()
            .flatten()
            .flat_map(|coordinate| coordinate.to_le_bytes())
            .collect()
    }

    fn decode(bytes: &[u8]) -> Result<Vec<Triangle>> {
        if bytes.len() % TRIANGLE_BYTES != 0 {
            return Err(Error::invalid_field("Triangles", "whole coordinate triangles"));
        }
        let coordinates: Vec<f64> = bytes
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect();
        Ok(coordinates
            .chunks_exact(9)
            .map(|c| [[c[0], c[1], c[2]], [c[3], c[4], c[5]], [c[6], c[7], c[8]]])
            .collect())
    }
}

impl Persist for AnnotationData {
    fn type_name(&self) -> &'static str {
        "EntityAnnotationData"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.insert("NumberTriangles", self.triangles.len() as u64);
        super::write_binary(doc, "Triangles", self.reference.as_ref())
    }

    fn read_fields(&mut self, doc: &Document, session: &Session) -> Result<()> {
        let count = doc.get_u64("NumberTriangles")?;
        let (reference, bytes) = super::read_binary(doc, "Triangles", session)?;
        let triangles = Self::decode(&bytes)?;
        if triangles.len() as u64 != count {
            return Err(Error::length_mismatch(
                usize::try_from(count).unwrap_or(usize::MAX),
                triangles.len(),
            ));
        }
        self.triangles = triangles;
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

/// A visual annotation; its triangle data is loaded on demand.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    data: LazySlot<AnnotationData>,
    bounding_box: Extent,
    edge_color: [f64; 3],
    dirty: bool,
}

/// Compares stored state: the triangle data by reference, not by content.
impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.data.identity() == other.data.identity()
            && self.bounding_box == other.bounding_box
            && self.edge_color == other.edge_color
    }
}

impl Annotation {
    /// Creates an annotation over the given triangles.
    #[must_use]
    pub fn new(data: AnnotationData, edge_color: [f64; 3]) -> Self {
        Self {
            bounding_box: data.extent(),
            data: LazySlot::with_value(data),
            edge_color,
            dirty: true,
        }
    }

    /// The triangle data slot.
    #[must_use]
    pub fn data(&self) -> &LazySlot<AnnotationData> {
        &self.data
    }

    /// The triangle data slot, for loading or releasing.
    pub fn data_mut(&mut self) -> &mut LazySlot<AnnotationData> {
        &mut self.data
    }

    /// Bounding box of the triangles as of the last store.
    #[must_use]
    pub fn bounding_box(&self) -> Extent {
        self.bounding_box
    }

    /// Edge color.
    #[must_use]
    pub fn edge_color(&self) -> [f64; 3] {
        self.edge_color
    }

    /// Sets the edge color.
    pub fn set_edge_color(&mut self, color: [f64; 3]) {
        self.edge_color = color;
        self.dirty = true;
    }
}

impl Persist for Annotation {
    fn type_name(&self) -> &'static str {
        "EntityAnnotation"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Topology
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_slot_ref(doc, "AnnotationData", &self.data);
        doc.insert("BoundingBox", self.bounding_box.to_json());
        super::write_color(doc, "EdgeColor", self.edge_color);
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        self.data = super::read_slot_ref(doc, "AnnotationData")?;
        self.bounding_box = Extent::from_json("BoundingBox", doc.require("BoundingBox")?)?;
        self.edge_color = super::read_color(doc, "EdgeColor")?;
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        let mut changed = self.data.store_for_owner(session)?;
        if let Some(record) = self.data.loaded() {
            let extent = record.body().extent();
            if extent != self.bounding_box {
                self.bounding_box = extent;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn is_dirty(&self) -> bool {
        self.dirty || self.data.is_dirty()
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }

    fn extent(&self) -> Extent {
        self.bounding_box
    }
}

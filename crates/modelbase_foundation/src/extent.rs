//! Axis-aligned bounding extents.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{Error, Result, number};

/// Axis-aligned bounding box with an explicit empty state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    bounds: Option<([f64; 3], [f64; 3])>,
}

impl Extent {
    /// The empty extent.
    pub const EMPTY: Self = Self { bounds: None };

    /// Creates an extent from two corners; coordinates are sorted per axis.
    #[must_use]
    pub fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        let min = [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])];
        let max = [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])];
        Self {
            bounds: Some((min, max)),
        }
    }

    /// Returns true if nothing has been added to this extent.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Returns the minimum corner, if any.
    #[must_use]
    pub fn min(&self) -> Option<[f64; 3]> {
        self.bounds.map(|(min, _)| min)
    }

    /// Returns the maximum corner, if any.
    #[must_use]
    pub fn max(&self) -> Option<[f64; 3]> {
        self.bounds.map(|(_, max)| max)
    }

    /// Grows the extent to include `point`.
    pub fn include_point(&mut self, point: [f64; 3]) {
        self.bounds = Some(match self.bounds {
            None => (point, point),
            Some((min, max)) => (
                [min[0].min(point[0]), min[1].min(point[1]), min[2].min(point[2])],
                [max[0].max(point[0]), max[1].max(point[1]), max[2].max(point[2])],
            ),
        });
    }

    /// Grows the extent to include `other`. Empty extents contribute nothing.
    pub fn extend(&mut self, other: &Extent) {
        if let Some((min, max)) = other.bounds {
            self.include_point(min);
            self.include_point(max);
        }
    }

    /// Stored form: `[xmin, xmax, ymin, ymax, zmin, zmax]`, or an empty array.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self.bounds {
            None => Json::Array(Vec::new()),
            Some((min, max)) => {
                number::array_to_json(&[min[0], max[0], min[1], max[1], min[2], max[2]])
            }
        }
    }

    /// Reads the stored form written by [`Extent::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an invalid field error naming `field` for any other shape.
    pub fn from_json(field: &str, json: &Json) -> Result<Self> {
        let invalid = || Error::invalid_field(field, "array of 0 or 6 numbers");
        let items = json.as_array().ok_or_else(invalid)?;
        if items.is_empty() {
            return Ok(Self::EMPTY);
        }
        if items.len() != 6 {
            return Err(invalid());
        }
        let mut v = [0.0; 6];
        for (slot, item) in v.iter_mut().zip(items) {
            *slot = number::from_json(item).ok_or_else(invalid)?;
        }
        Ok(Self::new([v[0], v[2], v[4]], [v[1], v[3], v[5]]))
    }
}

impl FromIterator<Extent> for Extent {
    fn from_iter<I: IntoIterator<Item = Extent>>(iter: I) -> Self {
        let mut total = Extent::EMPTY;
        for extent in iter {
            total.extend(&extent);
        }
        total
    }
}

//! Run-length compression for large numeric vectors.
//!
//! A compressed vector is two parallel streams: signed run counts and values.
//!
//! - `count > 0`: the next `count` entries of the value stream are literals.
//! - `count < 0`: one value stream entry repeated `|count|` times.
//!
//! The sum of `|count|` always equals the uncompressed length.
//!
//! Encoding is a single left-to-right scan. From each position the scan counts
//! how many following values lie within `tolerance` of the value at that
//! position; two or more form a repeat run represented by that first value.
//! Anything else is appended to the open literal run (or starts one). The final
//! element always lands in whichever run is open.

use modelbase_foundation::{Error, Result};

/// One run of a compressed vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Run<'a> {
    /// Consecutive literal values.
    Literal(&'a [f64]),
    /// A single value repeated `count` times.
    Repeat {
        /// Number of repetitions.
        count: usize,
        /// The repeated value.
        value: f64,
    },
}

impl Run<'_> {
    /// Number of uncompressed values this run expands to.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Literal(values) => values.len(),
            Self::Repeat { count, .. } => *count,
        }
    }

    /// Returns true for a run that expands to nothing (never produced by encoding).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A run-length compressed `f64` vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompressedVector {
    tolerance: f64,
    uncompressed_len: usize,
    values: Vec<f64>,
    counts: Vec<i64>,
}

impl CompressedVector {
    /// Compresses `values`, merging neighbours within `tolerance` into repeat runs.
    #[must_use]
    pub fn encode(values: &[f64], tolerance: f64) -> Self {
        let mut encoded = Self {
            tolerance,
            uncompressed_len: values.len(),
            values: Vec::new(),
            counts: Vec::new(),
        };

        let len = values.len();
        let mut index = 0;
        while index < len {
            let anchor = values[index];
            let mut same = 1;
            while index + same < len && (anchor - values[index + same]).abs() <= tolerance {
                same += 1;
            }

            if same > 1 {
                encoded.values.push(anchor);
                encoded.counts.push(-(same as i64));
                index += same;
            } else {
                encoded.push_literal(anchor);
                index += 1;
            }
        }

        tracing::trace!(
            len,
            runs = encoded.counts.len(),
            stored = encoded.values.len(),
            "vector encoded"
        );
        encoded
    }

    /// A vector of `length` copies of `value`, stored as a single repeat run.
    #[must_use]
    pub fn constant(value: f64, length: usize) -> Self {
        let (values, counts) = match length {
            0 => (Vec::new(), Vec::new()),
            1 => (vec![value], vec![1]),
            n => (vec![value], vec![-(n as i64)]),
        };
        Self {
            tolerance: 0.0,
            uncompressed_len: length,
            values,
            counts,
        }
    }

    /// Reassembles a vector from its stored streams, checking consistency.
    ///
    /// # Errors
    ///
    /// - a precondition violation for a zero count
    /// - a length mismatch if the counts do not add up to `uncompressed_len`
    ///   or the value stream has the wrong length
    /// - an invalid field if the run lengths overflow
    pub fn from_parts(
        tolerance: f64,
        uncompressed_len: usize,
        values: Vec<f64>,
        counts: Vec<i64>,
    ) -> Result<Self> {
        let mut expanded = 0_usize;
        let mut stored = 0_usize;
        for &count in &counts {
            if count == 0 {
                return Err(Error::precondition("compressed vector run with zero count"));
            }
            let overflow = || Error::invalid_field("dataCount", "run lengths that fit in usize");
            let magnitude = usize::try_from(count.unsigned_abs()).map_err(|_| overflow())?;
            expanded = expanded.checked_add(magnitude).ok_or_else(overflow)?;
            stored = stored
                .checked_add(if count > 0 { magnitude } else { 1 })
                .ok_or_else(overflow)?;
        }
        if expanded != uncompressed_len {
            return Err(Error::length_mismatch(uncompressed_len, expanded));
        }
        if stored != values.len() {
            return Err(Error::length_mismatch(stored, values.len()));
        }
        Ok(Self {
            tolerance,
            uncompressed_len,
            values,
            counts,
        })
    }

    /// Expands the vector.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if the expansion disagrees with the declared length.
    pub fn decode(&self) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.uncompressed_len);
        for run in self.runs() {
            match run {
                Run::Literal(values) => out.extend_from_slice(values),
                Run::Repeat { count, value } => out.extend(std::iter::repeat_n(value, count)),
            }
        }
        if out.len() != self.uncompressed_len {
            return Err(Error::length_mismatch(self.uncompressed_len, out.len()));
        }
        Ok(out)
    }

    /// Iterates the runs in order.
    pub fn runs(&self) -> impl Iterator<Item = Run<'_>> {
        let mut offset = 0;
        self.counts.iter().map(move |&count| {
            if count > 0 {
                let end = (offset + count as usize).min(self.values.len());
                let start = offset.min(end);
                offset = end;
                Run::Literal(&self.values[start..end])
            } else {
                let value = self.values.get(offset).copied().unwrap_or_default();
                offset += 1;
                Run::Repeat {
                    count: count.unsigned_abs() as usize,
                    value,
                }
            }
        })
    }

    /// Returns the value at `index` without expanding the vector.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<f64> {
        let mut start = 0;
        for run in self.runs() {
            let len = run.len();
            if index < start + len {
                return Some(match run {
                    Run::Literal(values) => values[index - start],
                    Run::Repeat { value, .. } => value,
                });
            }
            start += len;
        }
        None
    }

    /// Adds this vector element-wise into `values`.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if `values` has a different length.
    pub fn add_in_place(&self, values: &mut [f64]) -> Result<()> {
        self.apply(values, |target, v| *target += v)
    }

    /// Multiplies `values` element-wise by this vector.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch if `values` has a different length.
    pub fn multiply_in_place(&self, values: &mut [f64]) -> Result<()> {
        self.apply(values, |target, v| *target *= v)
    }

    fn apply(&self, values: &mut [f64], op: impl Fn(&mut f64, f64)) -> Result<()> {
        if values.len() != self.uncompressed_len {
            return Err(Error::length_mismatch(self.uncompressed_len, values.len()));
        }
        let mut targets = values.iter_mut();
        for run in self.runs() {
            match run {
                Run::Literal(literals) => {
                    for (target, &v) in targets.by_ref().zip(literals) {
                        op(target, v);
                    }
                }
                Run::Repeat { count, value } => {
                    for target in targets.by_ref().take(count) {
                        op(target, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Tolerance used when the vector was encoded.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of values after decoding.
    #[must_use]
    pub fn uncompressed_len(&self) -> usize {
        self.uncompressed_len
    }

    /// Number of entries in the value stream.
    #[must_use]
    pub fn values_len(&self) -> usize {
        self.values.len()
    }

    /// The value stream.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The signed run counts.
    #[must_use]
    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    fn push_literal(&mut self, value: f64) {
        self.values.push(value);
        match self.counts.last_mut() {
            Some(count) if *count > 0 => *count += 1,
            _ => self.counts.push(1),
        }
    }
}

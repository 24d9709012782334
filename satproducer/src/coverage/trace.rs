//! Outline tracing of pixel validity masks.

use super::geometry::{Point, Polygon};
use super::CoverageError;
use crate::capability::RegionGeometry;

/// Row-major grid of valid (observed) pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    rows: usize,
    cols: usize,
    valid: Vec<bool>,
}

impl ValidityMask {
    pub fn new(rows: usize, cols: usize, valid: Vec<bool>) -> Result<Self, CoverageError> {
        if valid.len() != rows * cols {
            return Err(CoverageError::MaskSize {
                rows,
                cols,
                len: valid.len(),
            });
        }
        Ok(Self { rows, cols, valid })
    }

    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let valid = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect();
        Self { rows, cols, valid }
    }

    pub fn all_valid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            valid: vec![true; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.valid[row * self.cols + col]
    }

    /// Pixels valid in both masks, `None` if the shapes differ.
    pub fn intersect(&self, other: &ValidityMask) -> Option<ValidityMask> {
        if self.shape() != other.shape() {
            return None;
        }
        let valid = self
            .valid
            .iter()
            .zip(&other.valid)
            .map(|(a, b)| *a && *b)
            .collect();
        Some(Self {
            rows: self.rows,
            cols: self.cols,
            valid,
        })
    }

    /// First and last valid column of `row`.
    fn row_extent(&self, row: usize) -> Option<(usize, usize)> {
        let line = &self.valid[row * self.cols..(row + 1) * self.cols];
        let first = line.iter().position(|v| *v)?;
        let last = line.iter().rposition(|v| *v)?;
        Some((first, last))
    }
}

/// Outline each run of consecutive rows holding valid pixels.
///
/// A ring walks the top row left to right, down the rightmost valid pixels,
/// back along the bottom row and up the leftmost valid pixels. Only every
/// `frequency`-th row and column is kept, plus the first and last of each
/// run. Rings are (row, col) pixel positions.
pub fn trace_boundaries(mask: &ValidityMask, frequency: usize) -> Vec<Vec<(usize, usize)>> {
    let frequency = frequency.max(1);
    let mut rings = Vec::new();
    let mut run: Vec<(usize, (usize, usize))> = Vec::new();

    for row in 0..mask.rows {
        match mask.row_extent(row) {
            Some(extent) => run.push((row, extent)),
            None if !run.is_empty() => {
                rings.push(ring(&run, frequency));
                run.clear();
            }
            None => {}
        }
    }
    if !run.is_empty() {
        rings.push(ring(&run, frequency));
    }
    rings
}

fn ring(run: &[(usize, (usize, usize))], frequency: usize) -> Vec<(usize, usize)> {
    let rows = sample(run, frequency);
    let (top, (top_first, top_last)) = rows[0];
    let (bottom, (bottom_first, bottom_last)) = rows[rows.len() - 1];

    let mut ring: Vec<(usize, usize)> = sample_columns(top_first, top_last, frequency)
        .into_iter()
        .map(|col| (top, col))
        .collect();

    ring.extend(rows[1..].iter().map(|&(row, (_, last))| (row, last)));

    let bottom_cols = sample_columns(bottom_first, bottom_last, frequency);
    if rows.len() > 1 {
        ring.extend(bottom_cols.iter().rev().skip(1).map(|&col| (bottom, col)));
        ring.extend(
            rows[1..rows.len() - 1]
                .iter()
                .rev()
                .map(|&(row, (first, _))| (row, first)),
        );
    } else if bottom_cols.len() > 2 {
        // Single row: retrace the interior so the ring encloses nothing.
        let interior = &bottom_cols[1..bottom_cols.len() - 1];
        ring.extend(interior.iter().rev().map(|&col| (bottom, col)));
    }
    ring
}

/// Every `frequency`-th item, always including the last one.
fn sample<T: Copy>(items: &[T], frequency: usize) -> Vec<T> {
    let mut sampled: Vec<T> = items.iter().step_by(frequency).copied().collect();
    if (items.len() - 1) % frequency != 0 {
        sampled.push(items[items.len() - 1]);
    }
    sampled
}

fn sample_columns(first: usize, last: usize, frequency: usize) -> Vec<usize> {
    let mut cols: Vec<usize> = (first..=last).step_by(frequency).collect();
    if (last - first) % frequency != 0 {
        cols.push(last);
    }
    cols
}

/// Traced outlines of `mask` in longitude/latitude through `geometry`.
///
/// Pixels without geolocation are dropped from the rings.
pub fn boundary_polygons(
    mask: &ValidityMask,
    geometry: &dyn RegionGeometry,
    frequency: usize,
) -> Vec<Polygon> {
    trace_boundaries(mask, frequency)
        .into_iter()
        .map(|ring| {
            Polygon::new(
                ring.into_iter()
                    .filter_map(|(row, col)| geometry.lonlat(row, col))
                    .map(|(lon, lat)| Point::new(lon, lat))
                    .collect(),
            )
        })
        .collect()
}

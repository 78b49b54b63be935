//! Piecewise-linear curves over an ordered sample table.
//!
//! A [`CurveTable`] holds one row of strictly ascending x values and one or
//! more parallel rows of y values. Row 0 is the x row, so output dimensions
//! are numbered from 1.

use crate::error::CurveError;
use heapless::Vec;

/// Maximum number of rows (the x row plus output dimensions).
pub const MAX_ROWS: usize = 8;

/// Validated sample table for piecewise-linear lookup.
///
/// # Type Parameters
/// * `N` - Maximum number of samples per row
#[derive(Debug, Clone)]
pub struct CurveTable<const N: usize> {
    rows: Vec<Vec<f64, N>, MAX_ROWS>,
}

impl<const N: usize> CurveTable<N> {
    /// Creates a new table builder.
    pub fn builder() -> CurveBuilder<N> {
        CurveBuilder::new()
    }

    /// Number of output dimensions (rows after the x row).
    pub fn dimensions(&self) -> usize {
        self.rows.len() - 1
    }

    /// The x row.
    pub fn xs(&self) -> &[f64] {
        &self.rows[0]
    }

    /// Row `dimension` (0 is the x row).
    pub fn row(&self, dimension: usize) -> Option<&[f64]> {
        self.rows.get(dimension).map(|row| row.as_slice())
    }

    /// Looks up `x` in output `dimension`.
    ///
    /// Clamps to the first y at or below the smallest x and to the last y at
    /// or above the largest x. In between, the bracketing interval starts at
    /// the first x strictly greater than `x`, and the y value is interpolated
    /// linearly. A flat interval returns its right endpoint directly.
    ///
    /// # Errors
    /// * `DimensionOutOfRange` - `dimension` exceeds [`dimensions`](Self::dimensions)
    pub fn interpolate(&self, dimension: usize, x: f64) -> Result<f64, CurveError> {
        if dimension > self.dimensions() {
            return Err(CurveError::DimensionOutOfRange {
                dimension,
                available: self.dimensions(),
            });
        }

        let xs = self.xs();
        let ys = &self.rows[dimension];
        let last = xs.len() - 1;

        if x >= xs[last] {
            return Ok(ys[last]);
        }
        if x <= xs[0] {
            return Ok(ys[0]);
        }

        // Never index before the table start.
        let m = xs.partition_point(|&sample| sample <= x).max(1);

        let dx = xs[m] - xs[m - 1];
        let dy = ys[m] - ys[m - 1];
        if dy == 0.0 {
            return Ok(ys[m]);
        }

        Ok(ys[m - 1] + (x - xs[m - 1]) * (dy / dx))
    }
}

/// Free-function form of [`CurveTable::interpolate`].
pub fn interpolate<const N: usize>(
    table: &CurveTable<N>,
    dimension: usize,
    x: f64,
) -> Result<f64, CurveError> {
    table.interpolate(dimension, x)
}

/// Builder for constructing validated curve tables.
#[derive(Debug)]
pub struct CurveBuilder<const N: usize> {
    rows: Vec<Vec<f64, N>, MAX_ROWS>,
}

impl<const N: usize> CurveBuilder<N> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Appends a row. The first row added is the x row.
    ///
    /// # Errors
    /// * `CapacityExceeded` - Too many rows, or more than `N` samples
    pub fn row(mut self, samples: &[f64]) -> Result<Self, CurveError> {
        let mut row = Vec::new();
        for &sample in samples {
            row.push(sample).map_err(|_| CurveError::CapacityExceeded)?;
        }
        self.rows.push(row).map_err(|_| CurveError::CapacityExceeded)?;
        Ok(self)
    }

    /// Builds and validates the table.
    ///
    /// # Errors
    /// * `EmptyTable` - No rows were added
    /// * `TooFewPoints` - The x row has fewer than two samples
    /// * `NotAscending` - X values are not strictly increasing
    /// * `LengthMismatch` - A y row differs in length from the x row
    /// * `DimensionOutOfRange` - Only the x row was added
    pub fn build(self) -> Result<CurveTable<N>, CurveError> {
        let xs = self.rows.first().ok_or(CurveError::EmptyTable)?;

        if xs.len() < 2 {
            return Err(CurveError::TooFewPoints(xs.len()));
        }

        if let Some(index) = xs.windows(2).position(|pair| !(pair[1] > pair[0])) {
            return Err(CurveError::NotAscending(index + 1));
        }

        if self.rows.len() < 2 {
            return Err(CurveError::DimensionOutOfRange {
                dimension: 1,
                available: 0,
            });
        }

        for (row, samples) in self.rows.iter().enumerate().skip(1) {
            if samples.len() != xs.len() {
                return Err(CurveError::LengthMismatch {
                    row,
                    expected: xs.len(),
                    actual: samples.len(),
                });
            }
        }

        Ok(CurveTable { rows: self.rows })
    }
}

impl<const N: usize> Default for CurveBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

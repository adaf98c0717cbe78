//! Deterministic input generation: the sample matrix and the lane index table.

use std::slice::ChunksExact;

use crate::error::{ArgmaxError, Result};
use crate::lane::Lane;

/// Positions per lane in the lane-based strategies.
pub const LANE_WIDTH: usize = 32;
/// Default matrix height.
pub const DEFAULT_ROWS: usize = 816;
/// Default row width (eight 32-sample lanes).
pub const DEFAULT_WIDTH: usize = 256;
/// Default RNG seed for random matrices.
pub const DEFAULT_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Largest row width whose positions fit in `u16` index lanes.
const MAX_INDEXED_WIDTH: usize = u16::MAX as usize + 1;

/// Immutable, row-major `rows × width` matrix of byte samples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    data: Vec<u8>,
    rows: usize,
    width: usize,
}

impl Matrix {
    /// Wraps row-major `data` as a `rows × width` matrix.
    pub fn new(rows: usize, width: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 {
            return Err(ArgmaxError::EmptyRow);
        }
        let expected = rows
            .checked_mul(width)
            .ok_or_else(|| ArgmaxError::InvalidConfig(format!("{rows}x{width} overflows")))?;
        if data.len() != expected {
            return Err(ArgmaxError::ShapeMismatch {
                rows,
                width,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, width })
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(ArgmaxError::WidthMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), width, data)
    }

    /// Row-major ramp: sample `i` is `i mod 255`.
    ///
    /// Because 255 does not divide typical widths, the maximum drifts across rows and
    /// most rows hold it twice, which exercises the tie-break on every run.
    pub fn ramp(rows: usize, width: usize) -> Result<Self> {
        let len = rows.saturating_mul(width);
        let data = (0..len).map(|i| (i % 255) as u8).collect();
        Self::new(rows, width, data)
    }

    /// Uniform random samples from a seeded xorshift generator.
    pub fn random(rows: usize, width: usize, seed: u64) -> Result<Self> {
        let len = rows.saturating_mul(width);
        // xorshift has a fixed point at zero.
        let mut state = seed.max(1);
        let data = (0..len).map(|_| next_u64(&mut state) as u8).collect();
        Self::new(rows, width, data)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Samples per row.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// All samples, row-major.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Row `index`, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// Rows in order, each exactly `width` samples long.
    #[inline]
    pub fn iter_rows(&self) -> ChunksExact<'_, u8> {
        self.data.chunks_exact(self.width)
    }
}

#[inline]
fn next_u64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    *state = x;
    x.wrapping_mul(0x2545_F491_4F6C_DD1D)
}

/// Row-relative index lanes for one row width.
///
/// Lane `j` holds `j * N + p` at position `p`: the `0..N` ramp replicated per lane
/// block and offset by the lane's starting column. Lane strategies carry these
/// alongside the values so a value-only horizontal reduction can recover positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneIndexTable<const N: usize> {
    width: usize,
    lanes: Vec<Lane<u16, N>>,
}

impl<const N: usize> LaneIndexTable<N> {
    /// Index lanes for rows of `width` samples; `width` must split into whole lanes.
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(ArgmaxError::EmptyRow);
        }
        if width % N != 0 {
            return Err(ArgmaxError::WidthNotLaneMultiple { width, lanes: N });
        }
        if width > MAX_INDEXED_WIDTH {
            return Err(ArgmaxError::IndexOverflow {
                strategy: "lane index table",
                width,
                limit: MAX_INDEXED_WIDTH,
            });
        }

        let ramp = Lane::<u16, N>::from_fn(|p| p as u16);
        let lanes = (0..width / N)
            .map(|j| {
                let base = (j * N) as u16;
                ramp.map(|p| p + base)
            })
            .collect();
        Ok(Self { width, lanes })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Lanes per row, `width / N`.
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Lane-local positions `0..N`.
    #[inline]
    pub fn ramp(&self) -> Lane<u16, N> {
        self.lanes[0]
    }

    /// Indices of lane `j`.
    #[inline]
    pub fn lane(&self, j: usize) -> Lane<u16, N> {
        self.lanes[j]
    }

    #[inline]
    pub fn lanes(&self) -> &[Lane<u16, N>] {
        &self.lanes
    }
}

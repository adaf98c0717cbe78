//! Lane-pair combine operator and the schedule executor built on it.
//!
//! A [`LanePair`] tracks, for each lane position, the best value seen so far and the
//! row index it came from. Combining two pairs is an elementwise strictly-greater
//! select, so on equal values the `keep` side survives. After the schedule has folded
//! every lane into one pair, [`LanePair::resolve`] performs the horizontal step.
//!
//! # Why the horizontal step takes a minimum
//!
//! Per-position winners can come from different lanes. With lanes of two and the row
//! `[3, 7, 7, 2]`, position 0 ends up holding `7` from index 2 while position 1 holds
//! `7` from index 1. Picking the lowest *position* equal to the maximum would report
//! index 2. Taking the smallest *index* among all positions holding the maximum
//! reports 1, the first occurrence.

use crate::dataset::{LaneIndexTable, Matrix};
use crate::error::{ArgmaxError, Result};
use crate::lane::Lane;
use crate::schedule::ReductionSchedule;

/// Running per-position best values with their row-relative indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanePair<const N: usize> {
    pub values: Lane<u8, N>,
    pub indices: Lane<u16, N>,
}

impl<const N: usize> LanePair<N> {
    /// Loads lane `j` of `row` with its index lane.
    #[inline]
    pub fn load(row: &[u8], table: &LaneIndexTable<N>, j: usize) -> Self {
        Self {
            values: Lane::load(&row[j * N..]),
            indices: table.lane(j),
        }
    }

    /// Elementwise merge keeping `self` unless `challenger` is strictly greater.
    #[inline]
    pub fn combine(self, challenger: Self) -> Self {
        let wins = challenger.values.simd_gt(self.values);
        Self {
            values: self.values.max(challenger.values),
            indices: Lane::select(wins, challenger.indices, self.indices),
        }
    }

    /// Row index of the first maximum among the tracked positions.
    #[inline]
    pub fn resolve(self) -> usize {
        let top = self.values.horizontal_max();
        let holders = self.values.simd_eq(Lane::splat(top));
        Lane::select(holders, self.indices, Lane::splat(u16::MAX)).horizontal_min() as usize
    }
}

/// Runs a [`ReductionSchedule`] over the lanes of rows of one fixed width.
#[derive(Clone, Debug)]
pub struct LaneReducer<const N: usize> {
    table: LaneIndexTable<N>,
    schedule: ReductionSchedule,
}

impl<const N: usize> LaneReducer<N> {
    /// Pairs `table` with a schedule covering exactly its lanes; the schedule is verified.
    pub fn new(table: LaneIndexTable<N>, schedule: ReductionSchedule) -> Result<Self> {
        if schedule.lanes() != table.lane_count() {
            return Err(ArgmaxError::InvalidConfig(format!(
                "schedule covers {} lanes but rows hold {}",
                schedule.lanes(),
                table.lane_count()
            )));
        }
        schedule.verify()?;
        Ok(Self { table, schedule })
    }

    /// Row width the reducer was prepared for.
    #[inline]
    pub fn width(&self) -> usize {
        self.table.width()
    }

    #[inline]
    pub fn table(&self) -> &LaneIndexTable<N> {
        &self.table
    }

    #[inline]
    pub fn schedule(&self) -> &ReductionSchedule {
        &self.schedule
    }

    /// Row-relative argmax of `row`, using `slots` as scratch.
    ///
    /// Fails with [`ArgmaxError::WidthMismatch`] unless `row` is exactly
    /// [`Self::width`] samples long.
    #[inline]
    pub fn argmax(&self, row: &[u8], slots: &mut Vec<LanePair<N>>) -> Result<usize> {
        self.check_width(row.len())?;
        Ok(self.fold(row, slots))
    }

    /// [`Self::argmax`] for a row whose width has already been checked.
    #[inline]
    pub(crate) fn fold(&self, row: &[u8], slots: &mut Vec<LanePair<N>>) -> usize {
        debug_assert_eq!(row.len(), self.width());
        slots.clear();
        slots.extend((0..self.table.lane_count()).map(|j| LanePair::load(row, &self.table, j)));
        for step in self.schedule.steps() {
            slots[step.keep] = slots[step.keep].combine(slots[step.challenger]);
        }
        slots[0].resolve()
    }

    /// Fails with [`ArgmaxError::WidthMismatch`] unless `width` is the prepared width.
    pub fn check_width(&self, width: usize) -> Result<()> {
        if width != self.width() {
            return Err(ArgmaxError::WidthMismatch {
                expected: self.width(),
                actual: width,
            });
        }
        Ok(())
    }

    /// Sum of per-row argmax indices over `matrix`.
    pub fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        self.check_width(matrix.width())?;
        let mut slots = Vec::with_capacity(self.table.lane_count());
        Ok(matrix
            .iter_rows()
            .map(|row| self.fold(row, &mut slots) as u64)
            .sum())
    }
}

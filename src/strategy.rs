//! Reduction strategies behind one trait, plus name-based dispatch.
//!
//! Lane-based strategies are prepared for a single row width: construction checks
//! that the width splits into whole lanes (and fits the strategy's index type), and
//! every call checks the rows it is handed against that width.

use std::fmt;
use std::str::FromStr;

use crate::argmax::{
    BYTE_INDEX_LIMIT, TieBreak, argmax_avx2, argmax_iter, argmax_max_then_find, argmax_packed,
    argmax_scalar,
};
use crate::backend::LaneBackend;
use crate::dataset::{LANE_WIDTH, LaneIndexTable, Matrix};
use crate::error::{ArgmaxError, Result};
use crate::reduce::{LanePair, LaneReducer};
use crate::schedule::ReductionSchedule;

/// A way of computing per-row argmax indices over a [`Matrix`].
pub trait ReductionStrategy {
    /// Short name used in reports and on the command line.
    fn name(&self) -> &'static str;

    /// Which occurrence of a repeated maximum this strategy reports.
    fn tie_break(&self) -> TieBreak {
        TieBreak::First
    }

    /// Row-relative index of the maximum of `row`.
    fn row_argmax(&self, row: &[u8]) -> Result<usize>;

    /// Sum over all rows of the per-row argmax index.
    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        matrix
            .iter_rows()
            .try_fold(0u64, |acc, row| Ok(acc + self.row_argmax(row)? as u64))
    }
}

fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ArgmaxError::WidthMismatch { expected, actual });
    }
    Ok(())
}

/// Reference scalar scan.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scalar;

impl ReductionStrategy for Scalar {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        if row.is_empty() {
            return Err(ArgmaxError::EmptyRow);
        }
        Ok(argmax_scalar(row))
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        Ok(matrix.iter_rows().map(|row| argmax_scalar(row) as u64).sum())
    }
}

/// Standard library iterator primitive, corrected to first occurrence.
#[derive(Clone, Copy, Debug, Default)]
pub struct LibraryScan;

impl ReductionStrategy for LibraryScan {
    fn name(&self) -> &'static str {
        "library_scan"
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        if row.is_empty() {
            return Err(ArgmaxError::EmptyRow);
        }
        Ok(argmax_iter(row))
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        Ok(matrix.iter_rows().map(|row| argmax_iter(row) as u64).sum())
    }
}

/// Two-pass lane strategy: max fold, then find-first.
#[derive(Clone, Copy, Debug)]
pub struct MaxThenFind<const N: usize = LANE_WIDTH> {
    width: usize,
}

impl<const N: usize> MaxThenFind<N> {
    pub fn new(width: usize) -> Result<Self> {
        LaneIndexTable::<N>::new(width)?;
        Ok(Self { width })
    }
}

impl<const N: usize> ReductionStrategy for MaxThenFind<N> {
    fn name(&self) -> &'static str {
        "max_then_find"
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        check_width(self.width, row.len())?;
        argmax_max_then_find::<N>(row).ok_or(ArgmaxError::WidthNotLaneMultiple {
            width: row.len(),
            lanes: N,
        })
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        check_width(self.width, matrix.width())?;
        matrix.iter_rows().try_fold(0u64, |acc, row| {
            let idx = argmax_max_then_find::<N>(row).ok_or(ArgmaxError::WidthNotLaneMultiple {
                width: row.len(),
                lanes: N,
            })?;
            Ok(acc + idx as u64)
        })
    }
}

/// Lane-parallel compare/select fold: lane 0 absorbs each later lane in turn.
///
/// At `N = 32` with rows of at most 256 samples the AVX2 kernel is used when the
/// backend allows it; otherwise the portable reducer runs the linear schedule.
#[derive(Clone, Debug)]
pub struct LaneParallel<const N: usize = LANE_WIDTH> {
    reducer: LaneReducer<N>,
    backend: LaneBackend,
}

impl<const N: usize> LaneParallel<N> {
    pub fn new(width: usize) -> Result<Self> {
        Self::with_backend(width, LaneBackend::detect())
    }

    pub fn with_backend(width: usize, backend: LaneBackend) -> Result<Self> {
        let table = LaneIndexTable::<N>::new(width)?;
        let schedule = ReductionSchedule::linear(table.lane_count());
        let reducer = LaneReducer::new(table, schedule)?;
        let backend = match backend.supported_or_portable() {
            LaneBackend::Avx2 if N == 32 && width <= BYTE_INDEX_LIMIT => LaneBackend::Avx2,
            _ => LaneBackend::Portable,
        };
        tracing::debug!(width, lanes = N, backend = backend.name(), "prepared lane_parallel");
        Ok(Self { reducer, backend })
    }

    #[inline]
    pub fn backend(&self) -> LaneBackend {
        self.backend
    }

    #[inline]
    fn argmax(&self, row: &[u8], slots: &mut Vec<LanePair<N>>) -> usize {
        if self.backend == LaneBackend::Avx2 {
            if let Some(idx) = argmax_avx2(row) {
                return idx;
            }
        }
        self.reducer.fold(row, slots)
    }
}

impl<const N: usize> ReductionStrategy for LaneParallel<N> {
    fn name(&self) -> &'static str {
        "lane_parallel"
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        self.reducer.check_width(row.len())?;
        Ok(self.argmax(row, &mut Vec::new()))
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        self.reducer.check_width(matrix.width())?;
        let mut slots = Vec::with_capacity(self.reducer.table().lane_count());
        Ok(matrix
            .iter_rows()
            .map(|row| self.argmax(row, &mut slots) as u64)
            .sum())
    }
}

/// Tournament reduction: lanes combined along a balanced pairing tree.
#[derive(Clone, Debug)]
pub struct TournamentUnrolled<const N: usize = LANE_WIDTH> {
    reducer: LaneReducer<N>,
}

impl<const N: usize> TournamentUnrolled<N> {
    pub fn new(width: usize) -> Result<Self> {
        let table = LaneIndexTable::<N>::new(width)?;
        let schedule = ReductionSchedule::tournament(table.lane_count());
        Self::with_schedule(table, schedule)
    }

    /// Uses a caller-supplied pairing schedule, rejected if it is not
    /// first-occurrence safe.
    pub fn with_schedule(table: LaneIndexTable<N>, schedule: ReductionSchedule) -> Result<Self> {
        let reducer = LaneReducer::new(table, schedule)?;
        tracing::debug!(
            width = reducer.width(),
            lanes = N,
            depth = reducer.schedule().depth(),
            "prepared tournament_unrolled"
        );
        Ok(Self { reducer })
    }

    #[inline]
    pub fn schedule(&self) -> &ReductionSchedule {
        self.reducer.schedule()
    }
}

impl<const N: usize> ReductionStrategy for TournamentUnrolled<N> {
    fn name(&self) -> &'static str {
        "tournament_unrolled"
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        self.reducer.argmax(row, &mut Vec::new())
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        self.reducer.row_sum(matrix)
    }
}

/// Packed `(value, index)` words reduced with a single max.
///
/// Defaults to [`TieBreak::Last`], the behavior the packing trick has when the raw
/// index is the payload. [`PackedPayload::with_tie_break`] selects first occurrence.
#[derive(Clone, Debug)]
pub struct PackedPayload<const N: usize = LANE_WIDTH> {
    table: LaneIndexTable<N>,
    tie_break: TieBreak,
}

impl<const N: usize> PackedPayload<N> {
    pub fn new(width: usize) -> Result<Self> {
        Self::with_tie_break(width, TieBreak::Last)
    }

    pub fn with_tie_break(width: usize, tie_break: TieBreak) -> Result<Self> {
        let table = LaneIndexTable::<N>::new(width)?;
        if width > BYTE_INDEX_LIMIT {
            return Err(ArgmaxError::IndexOverflow {
                strategy: "packed_payload",
                width,
                limit: BYTE_INDEX_LIMIT,
            });
        }
        tracing::debug!(width, lanes = N, tie_break = tie_break.name(), "prepared packed_payload");
        Ok(Self { table, tie_break })
    }
}

impl<const N: usize> ReductionStrategy for PackedPayload<N> {
    fn name(&self) -> &'static str {
        "packed_payload"
    }

    fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    fn row_argmax(&self, row: &[u8]) -> Result<usize> {
        argmax_packed(row, &self.table, self.tie_break).ok_or(ArgmaxError::WidthMismatch {
            expected: self.table.width(),
            actual: row.len(),
        })
    }

    fn row_sum(&self, matrix: &Matrix) -> Result<u64> {
        check_width(self.table.width(), matrix.width())?;
        matrix.iter_rows().try_fold(0u64, |acc, row| {
            Ok(acc + self.row_argmax(row)? as u64)
        })
    }
}

/// Strategy selector for dispatch by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Scalar,
    LibraryScan,
    MaxThenFind,
    LaneParallel,
    TournamentUnrolled,
    PackedPayload,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Scalar,
        StrategyKind::LibraryScan,
        StrategyKind::MaxThenFind,
        StrategyKind::LaneParallel,
        StrategyKind::TournamentUnrolled,
        StrategyKind::PackedPayload,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Scalar => "scalar",
            StrategyKind::LibraryScan => "library_scan",
            StrategyKind::MaxThenFind => "max_then_find",
            StrategyKind::LaneParallel => "lane_parallel",
            StrategyKind::TournamentUnrolled => "tournament_unrolled",
            StrategyKind::PackedPayload => "packed_payload",
        }
    }

    /// Whether the strategy requires the row width to be a lane multiple.
    pub fn is_lane_based(self) -> bool {
        !matches!(self, StrategyKind::Scalar | StrategyKind::LibraryScan)
    }

    /// Prepares the strategy for rows of `width` samples with 32-sample lanes.
    pub fn build(self, width: usize) -> Result<Box<dyn ReductionStrategy>> {
        self.build_with(width, TieBreak::Last)
    }

    /// Like [`Self::build`], choosing the packed-payload tie-break.
    pub fn build_with(
        self,
        width: usize,
        packed_tie_break: TieBreak,
    ) -> Result<Box<dyn ReductionStrategy>> {
        let strategy: Box<dyn ReductionStrategy> = match self {
            StrategyKind::Scalar => Box::new(Scalar),
            StrategyKind::LibraryScan => Box::new(LibraryScan),
            StrategyKind::MaxThenFind => Box::new(MaxThenFind::<LANE_WIDTH>::new(width)?),
            StrategyKind::LaneParallel => Box::new(LaneParallel::<LANE_WIDTH>::new(width)?),
            StrategyKind::TournamentUnrolled => {
                Box::new(TournamentUnrolled::<LANE_WIDTH>::new(width)?)
            }
            StrategyKind::PackedPayload => Box::new(PackedPayload::<LANE_WIDTH>::with_tie_break(
                width,
                packed_tie_break,
            )?),
        };
        Ok(strategy)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ArgmaxError;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ArgmaxError::UnknownStrategy(s.to_string()))
    }
}

//! Pairing schedules for combining a row's lanes.
//!
//! The lane combine operator is order-sensitive on ties: it keeps the `keep` operand
//! unless the `challenger` is strictly greater. First-occurrence semantics therefore
//! hold only if every step's `keep` slot covers the lanes immediately *before* the
//! challenger's lanes. A schedule is an explicit list of such steps so that property
//! can be checked ([`ReductionSchedule::verify`]) independently of how fast the
//! schedule runs.
//!
//! | Schedule | Steps | Serial depth |
//! |----------|-------|--------------|
//! | [`ReductionSchedule::linear`] | `k - 1` | `k - 1` |
//! | [`ReductionSchedule::tournament`] | `k - 1` | `ceil(log2 k)` |

use std::ops::Range;

use crate::error::{ArgmaxError, Result};

/// One combine: `slot[keep] = combine(slot[keep], slot[challenger])`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombineStep {
    /// Slot that wins ties and receives the result.
    pub keep: usize,
    /// Slot that must be strictly greater to win. Consumed by the step.
    pub challenger: usize,
}

impl CombineStep {
    pub const fn new(keep: usize, challenger: usize) -> Self {
        Self { keep, challenger }
    }
}

/// Ordered combine steps reducing `lanes` slots into slot 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReductionSchedule {
    lanes: usize,
    steps: Vec<CombineStep>,
}

impl ReductionSchedule {
    /// Left-to-right fold: lane 0 absorbs lanes 1, 2, ... in turn.
    pub fn linear(lanes: usize) -> Self {
        let steps = (1..lanes).map(|j| CombineStep::new(0, j)).collect();
        Self { lanes, steps }
    }

    /// Balanced binary tree of adjacent pairs.
    ///
    /// Round one combines `(0,1), (2,3), ...`; later rounds combine the survivors the
    /// same way. An odd survivor passes through to the next round unchanged.
    pub fn tournament(lanes: usize) -> Self {
        let mut steps = Vec::with_capacity(lanes.saturating_sub(1));
        let mut survivors: Vec<usize> = (0..lanes).collect();
        while survivors.len() > 1 {
            let mut next = Vec::with_capacity(survivors.len().div_ceil(2));
            for pair in survivors.chunks(2) {
                if let [keep, challenger] = *pair {
                    steps.push(CombineStep::new(keep, challenger));
                    next.push(keep);
                } else {
                    next.extend_from_slice(pair);
                }
            }
            survivors = next;
        }
        Self { lanes, steps }
    }

    /// Accepts a hand-written schedule after checking it with [`Self::verify`].
    pub fn from_steps(lanes: usize, steps: Vec<CombineStep>) -> Result<Self> {
        let schedule = Self { lanes, steps };
        schedule.verify()?;
        Ok(schedule)
    }

    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    #[inline]
    pub fn steps(&self) -> &[CombineStep] {
        &self.steps
    }

    /// Longest chain of dependent combines.
    pub fn depth(&self) -> usize {
        let mut depth = vec![0usize; self.lanes];
        for step in &self.steps {
            depth[step.keep] = depth[step.keep].max(depth[step.challenger]) + 1;
        }
        depth.first().copied().unwrap_or(0)
    }

    /// Checks that the schedule reduces every lane into slot 0 and never lets a
    /// later range win a tie against an earlier one.
    pub fn verify(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(ArgmaxError::InvalidSchedule {
                step: 0,
                reason: "schedule covers no lanes",
            });
        }

        let mut spans: Vec<Option<Range<usize>>> =
            (0..self.lanes).map(|j| Some(j..j + 1)).collect();
        for (i, step) in self.steps.iter().enumerate() {
            let invalid = |reason| ArgmaxError::InvalidSchedule { step: i, reason };
            if step.keep >= self.lanes || step.challenger >= self.lanes {
                return Err(invalid("slot out of range"));
            }
            if step.keep == step.challenger {
                return Err(invalid("slot combined with itself"));
            }
            let keep = spans[step.keep]
                .clone()
                .ok_or_else(|| invalid("keep slot already consumed"))?;
            let challenger = spans[step.challenger]
                .take()
                .ok_or_else(|| invalid("challenger slot already consumed"))?;
            if keep.end != challenger.start {
                return Err(invalid("keep lanes must immediately precede challenger lanes"));
            }
            spans[step.keep] = Some(keep.start..challenger.end);
        }

        if spans[0] != Some(0..self.lanes) {
            return Err(ArgmaxError::InvalidSchedule {
                step: self.steps.len(),
                reason: "slot 0 does not cover every lane",
            });
        }
        Ok(())
    }
}

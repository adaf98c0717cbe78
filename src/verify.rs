//! Cross-validation of strategies against the scalar oracle.

use crate::argmax::{TieBreak, argmax_scalar, argmax_scalar_last};
use crate::dataset::Matrix;
use crate::error::{ArgmaxError, Result};
use crate::strategy::ReductionStrategy;

/// Row sum of the scalar scan under the given tie-break.
pub fn oracle_row_sum(matrix: &Matrix, tie_break: TieBreak) -> u64 {
    let argmax = match tie_break {
        TieBreak::First => argmax_scalar,
        TieBreak::Last => argmax_scalar_last,
    };
    matrix.iter_rows().map(|row| argmax(row) as u64).sum()
}

/// Runs `strategy` once and checks its row sum against the oracle for its declared
/// tie-break. Returns the agreed row sum.
pub fn cross_validate(strategy: &dyn ReductionStrategy, matrix: &Matrix) -> Result<u64> {
    let actual = strategy.row_sum(matrix)?;
    let expected = oracle_row_sum(matrix, strategy.tie_break());
    if actual != expected {
        tracing::error!(
            strategy = strategy.name(),
            expected,
            actual,
            "strategy disagrees with scalar oracle"
        );
        return Err(ArgmaxError::ChecksumMismatch {
            strategy: strategy.name(),
            expected,
            actual,
        });
    }
    tracing::debug!(strategy = strategy.name(), row_sum = actual, "cross-validated");
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;

    struct OffByOne;

    impl ReductionStrategy for OffByOne {
        fn name(&self) -> &'static str {
            "off_by_one"
        }

        fn row_argmax(&self, row: &[u8]) -> Result<usize> {
            Ok(argmax_scalar(row) + 1)
        }
    }

    #[test]
    fn oracle_tie_breaks_differ_on_scenario() {
        let m = Matrix::from_rows(&[[3u8, 7, 7, 2], [1, 1, 9, 9]]).unwrap();
        assert_eq!(oracle_row_sum(&m, TieBreak::First), 3);
        assert_eq!(oracle_row_sum(&m, TieBreak::Last), 5);
    }

    #[test]
    fn every_strategy_validates_on_default_dataset() {
        let m = Matrix::ramp(816, 256).unwrap();
        let first = oracle_row_sum(&m, TieBreak::First);
        for kind in StrategyKind::ALL {
            let strategy = kind.build(256).unwrap();
            let sum = cross_validate(strategy.as_ref(), &m).unwrap();
            if strategy.tie_break() == TieBreak::First {
                assert_eq!(sum, first, "{kind}");
            }
        }
    }

    #[test]
    fn packed_payload_diverges_from_first_occurrence_on_ramp() {
        // Rows starting at 254 hold the maximum at both ends.
        let m = Matrix::ramp(816, 256).unwrap();
        let packed = StrategyKind::PackedPayload.build(256).unwrap();
        assert_ne!(
            packed.row_sum(&m).unwrap(),
            oracle_row_sum(&m, TieBreak::First)
        );
    }

    #[test]
    fn divergence_is_reported() {
        let m = Matrix::ramp(3, 8).unwrap();
        let err = cross_validate(&OffByOne, &m).unwrap_err();
        assert!(matches!(
            err,
            ArgmaxError::ChecksumMismatch {
                strategy: "off_by_one",
                ..
            }
        ));
    }
}

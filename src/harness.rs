//! Benchmark harness: repeated strategy runs, timing samples and the report line.

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::dataset::Matrix;
use crate::error::{ArgmaxError, Result};
use crate::strategy::ReductionStrategy;

/// Default number of timed trials per strategy.
pub const DEFAULT_TRIALS: usize = 1_000_000;
/// Default number of reported percentile points.
pub const DEFAULT_SAMPLES: usize = 5;

/// Trial and sample counts, adjusted so the sample stride divides evenly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    trials: usize,
    samples: usize,
}

impl HarnessConfig {
    /// Rounds `requested_trials` down so that `(trials - 1) % (samples - 1) == 0`.
    ///
    /// Fewer trials than samples is allowed; the stride is then zero and every
    /// reported point is the single fastest trial.
    pub fn new(requested_trials: usize, samples: usize) -> Result<Self> {
        if requested_trials == 0 {
            return Err(ArgmaxError::InvalidConfig(
                "nIter must be at least 1".to_string(),
            ));
        }
        if samples < 2 {
            return Err(ArgmaxError::InvalidConfig(format!(
                "nSamples must be at least 2, got {samples}"
            )));
        }
        let stride = (requested_trials - 1) / (samples - 1);
        let trials = stride * (samples - 1) + 1;
        if trials != requested_trials {
            tracing::debug!(requested_trials, trials, "adjusted trial count");
        }
        Ok(Self { trials, samples })
    }

    #[inline]
    pub fn trials(&self) -> usize {
        self.trials
    }

    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Distance between reported points in the sorted sample sequence.
    #[inline]
    pub fn stride(&self) -> usize {
        (self.trials - 1) / (self.samples - 1)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let stride = (DEFAULT_TRIALS - 1) / (DEFAULT_SAMPLES - 1);
        Self {
            trials: stride * (DEFAULT_SAMPLES - 1) + 1,
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Measures the wall-clock duration of a closure.
pub trait Stopwatch {
    fn time<R>(&mut self, f: impl FnOnce() -> R) -> (R, Duration);
}

/// [`Stopwatch`] backed by [`Instant`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Stopwatch for MonotonicClock {
    #[inline]
    fn time<R>(&mut self, f: impl FnOnce() -> R) -> (R, Duration) {
        let start = Instant::now();
        let out = f();
        (out, start.elapsed())
    }
}

/// Unit used when rendering timing samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Microseconds,
}

impl TimeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
        }
    }

    pub fn scale(self, d: Duration) -> f64 {
        match self {
            TimeUnit::Milliseconds => d.as_secs_f64() * 1e3,
            TimeUnit::Microseconds => d.as_secs_f64() * 1e6,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = ArgmaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ms" => Ok(TimeUnit::Milliseconds),
            "us" => Ok(TimeUnit::Microseconds),
            other => Err(ArgmaxError::UnknownUnit(other.to_string())),
        }
    }
}

/// Outcome of one benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchReport {
    pub name: &'static str,
    pub unit: TimeUnit,
    /// Evenly spaced points of the sorted trial durations, fastest first.
    pub samples: Vec<Duration>,
    /// Slowest trial.
    pub max: Duration,
    /// Wrapping sum of all trial row sums divided by the trial count.
    pub checksum: u64,
    /// Whether every trial returned the same row sum.
    pub deterministic: bool,
}

impl BenchReport {
    pub fn min(&self) -> Duration {
        self.samples.first().copied().unwrap_or_default()
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(): {:.2} ", self.name, self.unit.scale(self.min()))?;
        for sample in self.samples.iter().skip(1) {
            write!(f, " {:.2}", self.unit.scale(*sample))?;
        }
        write!(f, " [{}]  {}", self.unit, self.checksum)
    }
}

/// Times `config.trials()` sequential runs of `strategy` over `matrix`.
pub fn run_benchmark<S: Stopwatch>(
    strategy: &dyn ReductionStrategy,
    matrix: &Matrix,
    config: HarnessConfig,
    unit: TimeUnit,
    clock: &mut S,
) -> Result<BenchReport> {
    let name = strategy.name();
    tracing::debug!(
        strategy = name,
        trials = config.trials(),
        stride = config.stride(),
        "benchmark start"
    );

    let mut durations = Vec::with_capacity(config.trials());
    let mut total = 0u64;
    let mut first_sum = None;
    let mut deterministic = true;

    for _ in 0..config.trials() {
        let (sum, elapsed) = clock.time(|| strategy.row_sum(black_box(matrix)));
        let sum = black_box(sum?);
        durations.push(elapsed);
        total = total.wrapping_add(sum);
        match first_sum {
            None => first_sum = Some(sum),
            Some(first) if first != sum => deterministic = false,
            Some(_) => {}
        }
    }

    if !deterministic {
        tracing::warn!(strategy = name, "row sums differed between trials");
    }

    durations.sort_unstable();
    let stride = config.stride();
    let samples = (0..config.samples())
        .map(|s| durations[s * stride])
        .collect();
    let max = durations.last().copied().unwrap_or_default();
    let checksum = total / config.trials() as u64;

    tracing::info!(strategy = name, checksum, deterministic, "benchmark finished");
    Ok(BenchReport {
        name,
        unit,
        samples,
        max,
        checksum,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;

    use super::*;
    use crate::strategy::{Scalar, StrategyKind};

    /// Hands out pre-recorded durations in order.
    struct ScriptedClock(VecDeque<Duration>);

    impl ScriptedClock {
        fn micros(values: &[u64]) -> Self {
            Self(values.iter().map(|&us| Duration::from_micros(us)).collect())
        }
    }

    impl Stopwatch for ScriptedClock {
        fn time<R>(&mut self, f: impl FnOnce() -> R) -> (R, Duration) {
            let out = f();
            (out, self.0.pop_front().unwrap_or_default())
        }
    }

    /// Returns a different row sum on every call.
    struct Drifting(Cell<u64>);

    impl ReductionStrategy for Drifting {
        fn name(&self) -> &'static str {
            "drifting"
        }

        fn row_argmax(&self, _row: &[u8]) -> Result<usize> {
            Ok(0)
        }

        fn row_sum(&self, _matrix: &Matrix) -> Result<u64> {
            let n = self.0.get();
            self.0.set(n + 1);
            Ok(n)
        }
    }

    #[test]
    fn trial_count_is_adjusted_downward() {
        let c = HarnessConfig::new(10, 4).unwrap();
        assert_eq!((c.trials(), c.stride()), (10, 3));
        let c = HarnessConfig::new(12, 4).unwrap();
        assert_eq!((c.trials(), c.stride()), (10, 3));
        let c = HarnessConfig::new(1_000_000, 5).unwrap();
        assert_eq!(c.trials(), 999_997);
        assert_eq!(c, HarnessConfig::default());
    }

    #[test]
    fn too_few_trials_repeat_the_minimum() {
        let c = HarnessConfig::new(3, 5).unwrap();
        assert_eq!((c.trials(), c.stride()), (1, 0));
    }

    #[test]
    fn invalid_counts_are_rejected() {
        assert!(matches!(
            HarnessConfig::new(0, 5),
            Err(ArgmaxError::InvalidConfig(_))
        ));
        assert!(matches!(
            HarnessConfig::new(100, 1),
            Err(ArgmaxError::InvalidConfig(_))
        ));
    }

    #[test]
    fn samples_are_ordered_and_counted() {
        let m = Matrix::from_rows(&[[3u8, 7, 7, 2], [1, 1, 9, 9]]).unwrap();
        let config = HarnessConfig::new(9, 3).unwrap();
        let mut clock = ScriptedClock::micros(&[50, 10, 90, 30, 70, 20, 80, 40, 60]);
        let report =
            run_benchmark(&Scalar, &m, config, TimeUnit::Microseconds, &mut clock).unwrap();

        assert_eq!(report.samples.len(), 3);
        assert_eq!(
            report.samples,
            [10, 50, 90].map(Duration::from_micros).to_vec()
        );
        assert!(report.samples.windows(2).all(|w| w[0] <= w[1]));
        assert!(report.samples.iter().all(|s| report.min() <= *s && *s <= report.max));
        assert_eq!(report.checksum, 3);
        assert!(report.deterministic);
    }

    #[test]
    fn checksum_is_independent_of_trial_counts() {
        let m = Matrix::ramp(816, 256).unwrap();
        let strategy = StrategyKind::TournamentUnrolled.build(256).unwrap();
        let a = run_benchmark(
            strategy.as_ref(),
            &m,
            HarnessConfig::new(3, 2).unwrap(),
            TimeUnit::Microseconds,
            &mut MonotonicClock,
        )
        .unwrap();
        let b = run_benchmark(
            strategy.as_ref(),
            &m,
            HarnessConfig::new(7, 4).unwrap(),
            TimeUnit::Milliseconds,
            &mut MonotonicClock,
        )
        .unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert!(a.deterministic && b.deterministic);
    }

    #[test]
    fn drifting_sums_are_flagged() {
        let m = Matrix::ramp(1, 4).unwrap();
        let report = run_benchmark(
            &Drifting(Cell::new(0)),
            &m,
            HarnessConfig::new(3, 2).unwrap(),
            TimeUnit::Microseconds,
            &mut MonotonicClock,
        )
        .unwrap();
        assert!(!report.deterministic);
        assert_eq!(report.checksum, 1);
    }

    #[test]
    fn strategy_errors_propagate() {
        let m = Matrix::ramp(2, 48).unwrap();
        let strategy = StrategyKind::LaneParallel.build(64).unwrap();
        let err = run_benchmark(
            strategy.as_ref(),
            &m,
            HarnessConfig::new(3, 2).unwrap(),
            TimeUnit::Microseconds,
            &mut MonotonicClock,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArgmaxError::WidthMismatch {
                expected: 64,
                actual: 48
            }
        );
    }

    #[test]
    fn report_line_format() {
        let report = BenchReport {
            name: "scalar",
            unit: TimeUnit::Milliseconds,
            samples: [1500, 2000, 2250].map(Duration::from_micros).to_vec(),
            max: Duration::from_micros(2250),
            checksum: 42,
            deterministic: true,
        };
        assert_eq!(report.to_string(), "scalar(): 1.50  2.00 2.25 [ms]  42");
    }

    #[test]
    fn units_parse() {
        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("us".parse::<TimeUnit>(), Ok(TimeUnit::Microseconds));
        assert_eq!(
            "ns".parse::<TimeUnit>(),
            Err(ArgmaxError::UnknownUnit("ns".to_string()))
        );
    }
}

use std::process;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use row_argmax::{
    CapabilityReporter, DEFAULT_ROWS, DEFAULT_SAMPLES, DEFAULT_TRIALS, DEFAULT_WIDTH,
    HarnessConfig, HostCapabilities, Matrix, MonotonicClock, Result, StrategyKind, TieBreak,
    TimeUnit, cross_validate, run_benchmark,
};

/// Times each row-argmax strategy over one byte matrix and prints its checksum.
#[derive(Parser, Debug)]
#[command(name = "argmax_bench", version, about)]
struct Args {
    /// Timed trials per strategy (rounded down to fit the sample stride)
    #[arg(short = 'n', long = "nIter", default_value_t = DEFAULT_TRIALS)]
    n_iter: usize,

    /// Percentile points reported per strategy, minimum included
    #[arg(short = 't', long = "nSamples", default_value_t = DEFAULT_SAMPLES)]
    n_samples: usize,

    /// Matrix rows
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// Samples per row
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Fill the matrix from a seeded generator instead of the ramp
    #[arg(long)]
    seed: Option<u64>,

    /// Strategy to run; repeat for several (default: all)
    #[arg(long = "strategy", value_name = "NAME")]
    strategies: Vec<StrategyKind>,

    /// Timing unit: ms or us
    #[arg(long, default_value = "us")]
    unit: TimeUnit,

    /// Check each strategy against the scalar scan before timing it
    #[arg(long)]
    verify: bool,

    /// Make the packed-payload strategy report the first maximum
    #[arg(long)]
    first_occurrence_packing: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = HarnessConfig::new(args.n_iter, args.n_samples)?;

    HostCapabilities::detect().report();

    let matrix = match args.seed {
        Some(seed) => Matrix::random(args.rows, args.width, seed)?,
        None => Matrix::ramp(args.rows, args.width)?,
    };
    let packed_tie_break = if args.first_occurrence_packing {
        TieBreak::First
    } else {
        TieBreak::Last
    };
    let kinds = if args.strategies.is_empty() {
        StrategyKind::ALL.to_vec()
    } else {
        args.strategies.clone()
    };

    tracing::info!(
        rows = matrix.rows(),
        width = matrix.width(),
        trials = config.trials(),
        samples = config.samples(),
        "starting run"
    );

    let mut clock = MonotonicClock;
    for kind in kinds {
        let strategy = kind.build_with(matrix.width(), packed_tie_break)?;
        if args.verify {
            cross_validate(strategy.as_ref(), &matrix)?;
        }
        let report = run_benchmark(strategy.as_ref(), &matrix, config, args.unit, &mut clock)?;
        println!("{report}");
    }
    Ok(())
}

//! Per-row argmax over byte matrices, computed several independent ways.
//!
//! Every strategy reduces each fixed-width row of a [`Matrix`] to the index of its
//! maximum sample and sums those indices into a row sum. The strategies differ in the
//! order they compare samples, which is exactly where tie-breaking bugs hide, so the
//! row sums double as a cross-validation checksum.
//!
//! # Strategies
//!
//! - **Scalar** ([`Scalar`], [`argmax_scalar`]) the reference left-to-right scan
//! - **Library scan** ([`LibraryScan`], [`argmax_iter`]) built on iterator adapters
//! - **Max then find** ([`MaxThenFind`]) lane max fold, then a search for the first hit
//! - **Lane parallel** ([`LaneParallel`]) linear fold of value/index lane pairs
//! - **Tournament** ([`TournamentUnrolled`]) the same fold along a balanced tree
//! - **Packed payload** ([`PackedPayload`]) value and index packed into one word
//!
//! The packed strategy reports the *last* maximum by default; see [`TieBreak`].
//!
//! # Example
//!
//! ```
//! use row_argmax::{Matrix, StrategyKind, cross_validate};
//!
//! let matrix = Matrix::ramp(816, 256).unwrap();
//! for kind in StrategyKind::ALL {
//!     let strategy = kind.build(matrix.width()).unwrap();
//!     cross_validate(strategy.as_ref(), &matrix).unwrap();
//! }
//! ```

mod argmax;
mod backend;
mod capability;
mod dataset;
mod error;
mod harness;
mod lane;
mod reduce;
mod schedule;
mod strategy;
mod verify;

pub use argmax::*;
pub use backend::*;
pub use capability::*;
pub use dataset::*;
pub use error::*;
pub use harness::*;
pub use lane::*;
pub use reduce::*;
pub use schedule::*;
pub use strategy::*;
pub use verify::*;

//! An adaptive FFT planner.
//!
//! At plan time the crate picks, per transform size, precision and CPU capability set, one of
//! several algorithm families:
//!
//! - direct codelets for small sizes
//! - a cache-aware recursive decomposition whose leaves run registered codelets
//! - six-step and eight-step transforms for large perfect squares
//! - Bluestein's chirp-z convolution for sizes with large prime factors
//!
//! The choice can be steered with a forced strategy, per-size recorded decisions, or persisted
//! wisdom, all held by a [`PlannerSession`]. Built [`Plan`]s execute without allocating and can be
//! shared between threads, each thread bringing its own scratch buffer.
//!
//! ```
//! use phastplan::{Complex, Direction, Plan};
//!
//! let plan = Plan::<f64>::new(1000).unwrap();
//! let mut buffer = vec![Complex::new(1.0, 0.0); 1000];
//! let mut scratch = vec![Complex::default(); plan.inplace_scratch_len()];
//! plan.process(&mut buffer, &mut scratch, Direction::Forward).unwrap();
//! assert!((buffer[0].re - 1000.0).abs() < 1e-9);
//! ```
use std::io::Write;
use std::path::Path;

pub use num_complex::Complex;

pub use crate::capabilities::{Arch, CapabilityVector, SimdTier};
pub use crate::codelets::{AlgorithmTag, Codelet, CodeletFn, CodeletRegistry, CodeletVariant};
pub use crate::decompose::{DecomposeNode, DecomposeStrategy, NodeId};
pub use crate::options::PlannerOptions;
pub use crate::plan::{Direction, FftError, Plan};
pub use crate::precision::{FftNum, Precision};
pub use crate::session::PlannerSession;
pub use crate::strategy::{AlgorithmFamily, DecisionSource, ForcedStrategy, Resolution};
pub use crate::twiddles::{build_twiddles, TwiddleBuffer};
pub use crate::wisdom::{WisdomCache, WisdomEntry, WisdomError, WisdomKey};

pub mod bit_reversal;
mod bluestein;
pub mod capabilities;
pub mod codelets;
pub mod decompose;
pub mod engine;
mod options;
mod plan;
mod precision;
mod session;
mod square;
pub mod strategy;
pub mod twiddles;
pub mod wisdom;

macro_rules! impl_fft_for {
    ($func_name:ident, $precision:ty) => {
        /// Transform separate real and imaginary buffers in place, planning with the process-wide
        /// session.
        ///
        /// Allocates the plan and its scratch on every call; build a [`Plan`] to transform
        /// repeatedly.
        ///
        /// # Errors
        ///
        /// Fails if `reals` is empty or if `reals.len() != imags.len()`.
        pub fn $func_name(
            reals: &mut [$precision],
            imags: &mut [$precision],
            direction: Direction,
        ) -> Result<(), FftError> {
            let plan = Plan::<$precision>::new(reals.len())?;
            let mut scratch = vec![Complex::default(); plan.split_scratch_len()];
            plan.process_split(reals, imags, &mut scratch, direction)
        }
    };
}

impl_fft_for!(fft_64, f64);
impl_fft_for!(fft_32, f32);

/// Force every size onto `forced` in the process-wide session.
pub fn set_forced_strategy(forced: impl Into<ForcedStrategy>) {
    PlannerSession::global().set_forced_strategy(forced);
}

/// Pin `size` to `family` in the process-wide session.
pub fn record_decision(size: usize, family: AlgorithmFamily) {
    PlannerSession::global().record_decision(size, family);
}

/// Write the process-wide session's wisdom to `path`.
pub fn export_wisdom<P: AsRef<Path>>(path: P) -> Result<(), WisdomError> {
    PlannerSession::global().export_wisdom(path)
}

/// Write the process-wide session's wisdom to `writer`.
pub fn export_wisdom_to_writer<W: Write>(writer: W) -> Result<(), WisdomError> {
    PlannerSession::global().export_wisdom_to_writer(writer)
}

/// Merge the wisdom stored at `path` into the process-wide session.
pub fn import_wisdom<P: AsRef<Path>>(path: P) -> Result<usize, WisdomError> {
    PlannerSession::global().import_wisdom(path)
}

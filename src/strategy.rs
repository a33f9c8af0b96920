//! Algorithm families and the rules deciding which one serves a size.
//!
//! [`PlannerSession::resolve`](crate::PlannerSession::resolve) layers forced strategies, recorded
//! decisions and wisdom on top of the heuristics defined here.
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::options::{integer_sqrt, PlannerOptions};

/// How a transform of a given size is executed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgorithmFamily {
    /// One codelet, or the generic kernel, over the whole input
    Direct,
    /// Cache-aware recursive decomposition
    Recursive,
    /// Transpose / rows / twiddle / transpose / rows / transpose over an `m x m` matrix
    SixStep,
    /// Six-step with cache-blocked transposes and the twiddle multiply fused into them
    EightStep,
    /// Chirp-z convolution through a padded power-of-two transform
    Bluestein,
}

impl AlgorithmFamily {
    pub const ALL: [AlgorithmFamily; 5] = [
        Self::Direct,
        Self::Recursive,
        Self::SixStep,
        Self::EightStep,
        Self::Bluestein,
    ];

    /// Name stored in wisdom files
    pub const fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Recursive => "recursive",
            Self::SixStep => "six-step",
            Self::EightStep => "eight-step",
            Self::Bluestein => "bluestein",
        }
    }

    /// Whether the family can transform `size` at all.
    pub fn is_applicable(self, size: usize) -> bool {
        match self {
            Self::SixStep | Self::EightStep => size > 1 && is_perfect_square(size),
            Self::Direct | Self::Recursive | Self::Bluestein => size > 0,
        }
    }
}

impl Display for AlgorithmFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown algorithm family `{0}`")]
pub struct ParseFamilyError(pub String);

impl FromStr for AlgorithmFamily {
    type Err = ParseFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "dit" => Ok(Self::Direct),
            "recursive" | "stockham" => Ok(Self::Recursive),
            "six-step" | "sixstep" | "six_step" => Ok(Self::SixStep),
            "eight-step" | "eightstep" | "eight_step" => Ok(Self::EightStep),
            "bluestein" | "chirp" => Ok(Self::Bluestein),
            _ => Err(ParseFamilyError(s.to_string())),
        }
    }
}

/// Process-wide override consulted before anything else
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ForcedStrategy {
    #[default]
    Auto,
    Family(AlgorithmFamily),
}

impl From<AlgorithmFamily> for ForcedStrategy {
    fn from(family: AlgorithmFamily) -> Self {
        Self::Family(family)
    }
}

/// Which layer of the resolver produced a decision
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecisionSource {
    Forced,
    Recorded,
    Wisdom,
    Heuristic,
}

/// Outcome of resolving a size
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub family: AlgorithmFamily,
    pub source: DecisionSource,
}

/// `n = 2^a * 3^b * 5^c`
pub fn is_5_smooth(mut n: usize) -> bool {
    if n == 0 {
        return false;
    }
    for p in [2, 3, 5] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

pub fn is_perfect_square(n: usize) -> bool {
    let root = integer_sqrt(n);
    root * root == n
}

/// Direct for `size <= direct_threshold`, recursive otherwise.
pub fn fallback_family(size: usize, options: &PlannerOptions) -> AlgorithmFamily {
    if size <= options.direct_threshold {
        AlgorithmFamily::Direct
    } else {
        AlgorithmFamily::Recursive
    }
}

/// The family used when nothing overrides the choice.
pub fn heuristic_family(size: usize, options: &PlannerOptions) -> AlgorithmFamily {
    if !is_5_smooth(size) {
        return AlgorithmFamily::Bluestein;
    }
    if size > 1 && is_perfect_square(size) {
        if size >= options.eight_step_threshold {
            return AlgorithmFamily::EightStep;
        }
        if size >= options.six_step_threshold {
            return AlgorithmFamily::SixStep;
        }
    }
    fallback_family(size, options)
}

/// Apply a forced family: inapplicable families, and sizes below the direct threshold, get
/// [`fallback_family`].
pub fn apply_forced(
    family: AlgorithmFamily,
    size: usize,
    options: &PlannerOptions,
) -> AlgorithmFamily {
    if !family.is_applicable(size) || size < options.direct_threshold {
        fallback_family(size, options)
    } else {
        family
    }
}

/// Apply a recorded or wisdom hint: inapplicable families get [`fallback_family`].
pub fn apply_hint(
    family: AlgorithmFamily,
    size: usize,
    options: &PlannerOptions,
) -> AlgorithmFamily {
    if family.is_applicable(size) {
        family
    } else {
        fallback_family(size, options)
    }
}

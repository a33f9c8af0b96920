//! Compile-time precision tags.
//!
//! Every generic routine in this crate is monomorphized over [`FftNum`], which is implemented for
//! `f32` and `f64` only. The associated [`FftNum::PRECISION`] tag is what the wisdom cache keys on,
//! and [`FftNum::registry`] hands out the process-wide codelet registry for that precision.
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, OnceLock};

use bytemuck::Pod;
use num_complex::Complex;
use num_traits::{Float, FloatConst};
use serde::{Deserialize, Serialize};

use crate::codelets::CodeletRegistry;

/// Numeric precision of a complex transform, as persisted in wisdom files.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Precision {
    /// `Complex<f32>`
    Complex64 = 0,
    /// `Complex<f64>`
    Complex128 = 1,
}

impl From<Precision> for u8 {
    fn from(precision: Precision) -> Self {
        precision as u8
    }
}

impl TryFrom<u8> for Precision {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Complex64),
            1 => Ok(Self::Complex128),
            other => Err(format!("unknown precision tag {other}")),
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complex64 => write!(f, "complex64"),
            Self::Complex128 => write!(f, "complex128"),
        }
    }
}

/// Floating point types the planner can build transforms for.
pub trait FftNum: Float + FloatConst + Pod + Default + Debug + Send + Sync + 'static {
    /// Precision tag used for wisdom keys
    const PRECISION: Precision;

    /// Lossy conversion used when materialising roots of unity computed in `f64`
    fn from_f64(value: f64) -> Self;

    /// The process-wide codelet registry for this precision, populated with the built-in codelets
    /// on first use.
    fn registry() -> &'static Arc<CodeletRegistry<Self>>;
}

static REGISTRY_F32: OnceLock<Arc<CodeletRegistry<f32>>> = OnceLock::new();
static REGISTRY_F64: OnceLock<Arc<CodeletRegistry<f64>>> = OnceLock::new();

impl FftNum for f32 {
    const PRECISION: Precision = Precision::Complex64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn registry() -> &'static Arc<CodeletRegistry<Self>> {
        REGISTRY_F32.get_or_init(|| Arc::new(CodeletRegistry::with_builtin_codelets()))
    }
}

impl FftNum for f64 {
    const PRECISION: Precision = Precision::Complex128;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    fn registry() -> &'static Arc<CodeletRegistry<Self>> {
        REGISTRY_F64.get_or_init(|| Arc::new(CodeletRegistry::with_builtin_codelets()))
    }
}

/// `W_n^k = exp(-2πik/n)`, evaluated in `f64` and rounded once to `T`.
#[inline]
pub(crate) fn root_of_unity<T: FftNum>(k: usize, n: usize) -> Complex<T> {
    let angle = -2.0 * std::f64::consts::PI * ((k % n) as f64) / (n as f64);
    let (sin, cos) = angle.sin_cos();
    Complex::new(T::from_f64(cos), T::from_f64(sin))
}

/// Multiply by `-i`: `(a + bi) * (-i) = b - ai`
#[inline(always)]
pub(crate) fn rotate_neg_i<T: FftNum>(z: Complex<T>) -> Complex<T> {
    Complex::new(z.im, -z.re)
}

/// Multiply by `+i`: `(a + bi) * i = -b + ai`
#[inline(always)]
pub(crate) fn rotate_pos_i<T: FftNum>(z: Complex<T>) -> Complex<T> {
    Complex::new(-z.im, z.re)
}

/// Twiddle as seen by a transform running in the given direction.
#[inline(always)]
pub(crate) fn directed<T: FftNum, const INVERSE: bool>(w: Complex<T>) -> Complex<T> {
    if INVERSE {
        w.conj()
    } else {
        w
    }
}

/// Scale every element by `1 / n`.
pub(crate) fn normalize<T: FftNum>(values: &mut [Complex<T>], n: usize) {
    let scaling_factor = T::from_f64((n as f64).recip());
    for z in values.iter_mut() {
        z.re = z.re * scaling_factor;
        z.im = z.im * scaling_factor;
    }
}

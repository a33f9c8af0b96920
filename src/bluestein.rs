//! Bluestein's chirp-z algorithm.
//!
//! Turns a DFT of any length `n` into a circular convolution of length `m >= 2n - 1`, `m` a power
//! of two, which the inner plan computes with two transforms. The filter spectrum is computed once
//! at plan time.
//!
//! ## References
//! [1] <https://en.wikipedia.org/wiki/Chirp_Z-transform#Bluestein.27s_algorithm>
use std::sync::Arc;

use num_complex::Complex;

use crate::codelets::CodeletRegistry;
use crate::plan::{FftError, Plan};
use crate::precision::FftNum;
use crate::session::PlannerSession;

pub(crate) struct Bluestein<T: FftNum> {
    len: usize,
    padded: usize,
    /// `c[k] = exp(-i*pi*k^2 / n)`
    chirp: Vec<Complex<T>>,
    /// Forward transform of the zero padded, conjugated chirp
    filter_spectrum: Vec<Complex<T>>,
    inner: Plan<T>,
}

/// `exp(-i*pi*k^2 / n)` for `k = 0..n`, reducing `k^2` modulo `2n` before scaling
fn chirp<T: FftNum>(n: usize) -> Vec<Complex<T>> {
    let modulus = 2 * n as u128;
    (0..n)
        .map(|k| {
            let k = k as u128;
            let phase = ((k * k) % modulus) as f64;
            let angle = -std::f64::consts::PI * phase / n as f64;
            let (sin, cos) = angle.sin_cos();
            Complex::new(T::from_f64(cos), T::from_f64(sin))
        })
        .collect()
}

impl<T: FftNum> Bluestein<T> {
    pub(crate) fn new(
        len: usize,
        session: &PlannerSession,
        registry: &Arc<CodeletRegistry<T>>,
    ) -> Result<Self, FftError> {
        let padded = (2 * len - 1).next_power_of_two();
        // power-of-two sizes never resolve back to Bluestein
        let inner = Plan::build(padded, session.fallback_family(padded), session, registry)?;

        let chirp = chirp::<T>(len);

        let zero = Complex::new(T::zero(), T::zero());
        let mut filter = vec![zero; padded];
        filter[0] = chirp[0].conj();
        for k in 1..len {
            filter[k] = chirp[k].conj();
            filter[padded - k] = chirp[k].conj();
        }

        let mut filter_spectrum = vec![zero; padded];
        let mut scratch = vec![zero; inner.scratch_len()];
        if !inner.execute::<false>(&mut filter_spectrum, &filter, &mut scratch) {
            return Err(FftError::KernelRejected { size: padded });
        }

        Ok(Self {
            len,
            padded,
            chirp,
            filter_spectrum,
            inner,
        })
    }

    pub(crate) fn scratch_len(&self) -> usize {
        2 * self.padded + self.inner.scratch_len()
    }

    /// The inverse runs the forward algorithm on conjugated data: `x = conj(DFT(conj(X))) / n`.
    pub(crate) fn execute<const INVERSE: bool>(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        let n = self.len;
        let m = self.padded;
        if src.len() != n || dst.len() != n || scratch.len() < self.scratch_len() {
            return false;
        }

        let (a, rest) = scratch.split_at_mut(m);
        let (b, inner_scratch) = rest.split_at_mut(m);

        let (head, tail) = a.split_at_mut(n);
        for ((out, x), c) in head.iter_mut().zip(src).zip(&self.chirp) {
            let x = if INVERSE { x.conj() } else { *x };
            *out = x * c;
        }
        tail.fill(Complex::new(T::zero(), T::zero()));

        if !self.inner.execute::<false>(b, a, inner_scratch) {
            return false;
        }
        for (z, h) in b.iter_mut().zip(&self.filter_spectrum) {
            *z = *z * h;
        }
        if !self.inner.execute::<true>(a, b, inner_scratch) {
            return false;
        }

        if INVERSE {
            let scale = T::from_f64((n as f64).recip());
            for ((out, y), c) in dst.iter_mut().zip(a.iter()).zip(&self.chirp) {
                *out = (*y * c).conj().scale(scale);
            }
        } else {
            for ((out, y), c) in dst.iter_mut().zip(a.iter()).zip(&self.chirp) {
                *out = *y * c;
            }
        }
        true
    }
}

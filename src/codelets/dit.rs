//! Decimation-in-Time kernels
//!
//! [`radix2_dit`] is the registered power-of-two codelet: it expects a bit reversal permutation
//! table whose length is the transform size. [`generic_direct`] is the unregistered last resort
//! used when the registry has nothing for a leaf. It accepts any size, computing bit reversed
//! indices on the fly for powers of two and falling back to a direct `O(n^2)` DFT otherwise.
use num_complex::Complex;

use crate::bit_reversal::reverse_index;
use crate::codelets::butterflies::preconditions_hold;
use crate::precision::{directed, normalize, FftNum};

/// Iterative radix-2 DIT stages over bit reversed input, reading `W_n^k` from the full table.
#[inline(always)]
fn dit_stages<T: FftNum, const INVERSE: bool>(data: &mut [Complex<T>], twiddles: &[Complex<T>]) {
    let n = data.len();
    let mut dist = 1;

    while dist < n {
        let chunk_size = dist << 1;
        let stride = n / chunk_size;

        data.chunks_exact_mut(chunk_size).for_each(|chunk| {
            let (s0, s1) = chunk.split_at_mut(dist);

            s0.iter_mut()
                .zip(s1.iter_mut())
                .enumerate()
                .for_each(|(k, (z0, z1))| {
                    let w = directed::<T, INVERSE>(twiddles[k * stride]);
                    let t = *z1 * w;
                    *z1 = *z0 - t;
                    *z0 = *z0 + t;
                });
        });

        dist = chunk_size;
    }
}

/// Power-of-two DIT codelet. The transform size is `permutation.len()`.
pub(crate) fn radix2_dit<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    permutation: &[usize],
) -> bool {
    let n = permutation.len();
    if !n.is_power_of_two() || !preconditions_hold(n, dst, src, twiddles, scratch) {
        return false;
    }

    let dst = &mut dst[..n];
    for (out, &from) in dst.iter_mut().zip(permutation) {
        match src.get(from) {
            Some(z) => *out = *z,
            None => return false,
        }
    }

    dit_stages::<T, INVERSE>(dst, twiddles);

    if INVERSE {
        normalize(dst, n);
    }
    true
}

/// Direct kernel for any size `src.len()`.
///
/// Returns `false` only if `dst` and `src` disagree on the length, the input is empty, or the
/// twiddle table does not cover the transform.
pub(crate) fn generic_direct<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    _scratch: &mut [Complex<T>],
    _permutation: &[usize],
) -> bool {
    let n = src.len();
    if n == 0 || dst.len() != n || twiddles.len() < n {
        return false;
    }

    if n.is_power_of_two() {
        let log_n = n.ilog2();
        for (i, out) in dst.iter_mut().enumerate() {
            *out = src[reverse_index(i, log_n)];
        }
        dit_stages::<T, INVERSE>(dst, twiddles);
    } else {
        for (k, out) in dst.iter_mut().enumerate() {
            let mut acc = Complex::new(T::zero(), T::zero());
            // idx == (j * k) mod n
            let mut idx = 0;
            for &x in src {
                acc = acc + x * directed::<T, INVERSE>(twiddles[idx]);
                idx += k;
                if idx >= n {
                    idx -= n;
                }
            }
            *out = acc;
        }
    }

    if INVERSE {
        normalize(dst, n);
    }
    true
}

//! Hard-coded butterflies for sizes 2, 4, 8 and 16.
//!
//! All of them follow the codelet contract: inputs shorter than the codelet size are rejected with
//! `false`, inverse variants are normalized by `1 / N`.
use num_complex::Complex;

use crate::precision::{directed, normalize, rotate_neg_i, rotate_pos_i, FftNum};

/// Every slice handed to a codelet must cover at least `n` elements.
#[inline(always)]
pub(crate) fn preconditions_hold<T>(
    n: usize,
    dst: &[Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &[Complex<T>],
) -> bool {
    n > 0 && dst.len() >= n && src.len() >= n && twiddles.len() >= n && scratch.len() >= n
}

/// 4-point DFT. `W_4^1 = -i` forward, `+i` inverse.
#[inline(always)]
pub(crate) fn dft4<T: FftNum, const INVERSE: bool>(
    x0: Complex<T>,
    x1: Complex<T>,
    x2: Complex<T>,
    x3: Complex<T>,
) -> [Complex<T>; 4] {
    let a = x0 + x2;
    let b = x0 - x2;
    let c = x1 + x3;
    let d = if INVERSE {
        rotate_pos_i(x1 - x3)
    } else {
        rotate_neg_i(x1 - x3)
    };
    [a + c, b + d, a - c, b - d]
}

/// 8-point DFT as two 4-point DFTs combined with the constant `W_8^k`.
#[inline(always)]
fn dft8<T: FftNum, const INVERSE: bool>(x: [Complex<T>; 8]) -> [Complex<T>; 8] {
    let e = dft4::<T, INVERSE>(x[0], x[2], x[4], x[6]);
    let o = dft4::<T, INVERSE>(x[1], x[3], x[5], x[7]);

    let h = T::FRAC_1_SQRT_2();
    let w1 = directed::<T, INVERSE>(Complex::new(h, -h)); // W_8^1
    let w3 = directed::<T, INVERSE>(Complex::new(-h, -h)); // W_8^3

    let o1 = o[1] * w1;
    // W_8^2 = -i
    let o2 = if INVERSE {
        rotate_pos_i(o[2])
    } else {
        rotate_neg_i(o[2])
    };
    let o3 = o[3] * w3;

    [
        e[0] + o[0],
        e[1] + o1,
        e[2] + o2,
        e[3] + o3,
        e[0] - o[0],
        e[1] - o1,
        e[2] - o2,
        e[3] - o3,
    ]
}

pub(crate) fn butterfly2<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    _permutation: &[usize],
) -> bool {
    const N: usize = 2;
    if !preconditions_hold(N, dst, src, twiddles, scratch) {
        return false;
    }

    let z0 = src[0];
    let z1 = src[1];
    dst[0] = z0 + z1;
    dst[1] = z0 - z1;

    if INVERSE {
        normalize(&mut dst[..N], N);
    }
    true
}

pub(crate) fn butterfly4<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    _permutation: &[usize],
) -> bool {
    const N: usize = 4;
    if !preconditions_hold(N, dst, src, twiddles, scratch) {
        return false;
    }

    let out = dft4::<T, INVERSE>(src[0], src[1], src[2], src[3]);
    dst[..N].copy_from_slice(&out);

    if INVERSE {
        normalize(&mut dst[..N], N);
    }
    true
}

pub(crate) fn butterfly8<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    _permutation: &[usize],
) -> bool {
    const N: usize = 8;
    if !preconditions_hold(N, dst, src, twiddles, scratch) {
        return false;
    }

    let x: [Complex<T>; N] = std::array::from_fn(|i| src[i]);
    dst[..N].copy_from_slice(&dft8::<T, INVERSE>(x));

    if INVERSE {
        normalize(&mut dst[..N], N);
    }
    true
}

/// Two 8-point DFTs over the even and odd samples, combined with `W_16^k` from the twiddle table.
pub(crate) fn butterfly16<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    _permutation: &[usize],
) -> bool {
    const N: usize = 16;
    const HALF: usize = N / 2;
    if !preconditions_hold(N, dst, src, twiddles, scratch) {
        return false;
    }

    let evens = dft8::<T, INVERSE>(std::array::from_fn(|i| src[2 * i]));
    let odds = dft8::<T, INVERSE>(std::array::from_fn(|i| src[2 * i + 1]));

    let (lo, hi) = dst[..N].split_at_mut(HALF);
    for k in 0..HALF {
        let t = odds[k] * directed::<T, INVERSE>(twiddles[k]);
        lo[k] = evens[k] + t;
        hi[k] = evens[k] - t;
    }

    if INVERSE {
        normalize(&mut dst[..N], N);
    }
    true
}

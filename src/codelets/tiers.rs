//! Per-tier instantiations of the built-in codelets.
//!
//! Each tier module exposes the same kernel set. The baseline tier is plain portable code; the
//! other tiers compile the same bodies under `multiversion` with the tier's target features and
//! check the CPU on every call (generic kernels cannot use the cached function pointer), so a
//! variant registered for a tier the CPU lacks still runs correctly without the wider instructions.

macro_rules! codelet_fn {
    ($name:ident, $body:ident, $inverse:literal) => {
        pub(crate) fn $name<T: FftNum>(
            dst: &mut [Complex<T>],
            src: &[Complex<T>],
            twiddles: &[Complex<T>],
            scratch: &mut [Complex<T>],
            permutation: &[usize],
        ) -> bool {
            $body::<T, { $inverse }>(dst, src, twiddles, scratch, permutation)
        }
    };
    ($name:ident, $body:ident, $inverse:literal, [$($target:tt),+]) => {
        #[multiversion::multiversion(targets($($target),+), dispatcher = "direct")]
        pub(crate) fn $name<T: FftNum>(
            dst: &mut [Complex<T>],
            src: &[Complex<T>],
            twiddles: &[Complex<T>],
            scratch: &mut [Complex<T>],
            permutation: &[usize],
        ) -> bool {
            $body::<T, { $inverse }>(dst, src, twiddles, scratch, permutation)
        }
    };
}

macro_rules! codelet_tier {
    ($module:ident $(, [$($target:tt),+])?) => {
        pub(crate) mod $module {
            use num_complex::Complex;

            use crate::codelets::butterflies::{butterfly16, butterfly2, butterfly4, butterfly8};
            use crate::codelets::dit::radix2_dit;
            use crate::precision::FftNum;

            codelet_fn!(butterfly2_forward, butterfly2, false $(, [$($target),+])?);
            codelet_fn!(butterfly2_inverse, butterfly2, true $(, [$($target),+])?);
            codelet_fn!(butterfly4_forward, butterfly4, false $(, [$($target),+])?);
            codelet_fn!(butterfly4_inverse, butterfly4, true $(, [$($target),+])?);
            codelet_fn!(butterfly8_forward, butterfly8, false $(, [$($target),+])?);
            codelet_fn!(butterfly8_inverse, butterfly8, true $(, [$($target),+])?);
            codelet_fn!(butterfly16_forward, butterfly16, false $(, [$($target),+])?);
            codelet_fn!(butterfly16_inverse, butterfly16, true $(, [$($target),+])?);
            codelet_fn!(dit_forward, radix2_dit, false $(, [$($target),+])?);
            codelet_fn!(dit_inverse, radix2_dit, true $(, [$($target),+])?);
        }
    };
}

codelet_tier!(baseline);
codelet_tier!(mid, ["x86_64+sse4.2"]);
codelet_tier!(wide, ["x86_64+avx2+fma"]);
codelet_tier!(arm_simd, ["aarch64+neon"]);

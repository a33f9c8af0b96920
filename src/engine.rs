//! Recursive execution engine.
//!
//! Walks a [`DecomposeStrategy`] on every call: an internal node decimates its input into `radix`
//! strided sub-sequences, transforms each of them into its own region of the scratch buffer, and
//! combines the results. Leaves run the registry's codelet for their size, or the generic direct
//! kernel when the registry has nothing usable.
//!
//! Nothing here allocates. The caller provides `strategy.scratch_len()` elements of scratch, laid
//! out as one `N`-sized level per internal node followed by `2 * leaf` elements for the leaf.
use num_complex::Complex;

use crate::capabilities::CapabilityVector;
use crate::codelets::butterflies::dft4;
use crate::codelets::{generic_direct, Codelet, CodeletRegistry};
use crate::decompose::{DecomposeStrategy, NodeId};
use crate::precision::{directed, root_of_unity, FftNum};

/// Largest radix the general combine handles
const MAX_RADIX: usize = 8;

struct Walk<'a, T> {
    strategy: &'a DecomposeStrategy,
    twiddles: &'a [Complex<T>],
    codelet: Option<Codelet<T>>,
}

/// Forward transform of `src` into `dst`.
///
/// Returns `false` if a buffer is too short for `strategy` or a kernel rejects its inputs.
pub fn forward<T: FftNum>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    strategy: &DecomposeStrategy,
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    registry: &CodeletRegistry<T>,
    capabilities: &CapabilityVector,
) -> bool {
    execute::<T, false>(dst, src, strategy, twiddles, scratch, registry, capabilities)
}

/// Inverse transform of `src` into `dst`, normalized by `1 / N`.
pub fn inverse<T: FftNum>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    strategy: &DecomposeStrategy,
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    registry: &CodeletRegistry<T>,
    capabilities: &CapabilityVector,
) -> bool {
    execute::<T, true>(dst, src, strategy, twiddles, scratch, registry, capabilities)
}

fn execute<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    strategy: &DecomposeStrategy,
    twiddles: &[Complex<T>],
    scratch: &mut [Complex<T>],
    registry: &CodeletRegistry<T>,
    capabilities: &CapabilityVector,
) -> bool {
    let n = strategy.size();
    if n == 0
        || src.len() != n
        || dst.len() != n
        || twiddles.len() < strategy.twiddle_len()
        || scratch.len() < strategy.scratch_len()
    {
        return false;
    }

    // every leaf of a strategy shares one size, so one lookup serves the whole call
    let walk = Walk {
        strategy,
        twiddles,
        codelet: registry.lookup(strategy.leaf_size(), capabilities),
    };

    walk.run_node::<INVERSE>(strategy.root(), src, 0, 1, dst, scratch, 0)
}

impl<T: FftNum> Walk<'_, T> {
    /// Transform `x[i] = src[offset + i * stride]` for `i = 0..size` into `dst`.
    #[allow(clippy::too_many_arguments)]
    fn run_node<const INVERSE: bool>(
        &self,
        id: NodeId,
        src: &[Complex<T>],
        offset: usize,
        stride: usize,
        dst: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
        tw_offset: usize,
    ) -> bool {
        let node = self.strategy.node(id);
        let n = node.size;
        let Some(twiddles) = self.twiddles.get(tw_offset..tw_offset + n) else {
            return false;
        };
        let dst = &mut dst[..n];

        let Some(child) = node.child() else {
            return self.run_leaf::<INVERSE>(src, offset, stride, dst, scratch, twiddles);
        };

        let (radix, sub_size) = (node.radix, node.sub_size);
        let (subs, rest) = scratch.split_at_mut(n);

        for (j, sub) in subs.chunks_exact_mut(sub_size).enumerate() {
            let ok = self.run_node::<INVERSE>(
                child,
                src,
                offset + j * stride,
                stride * radix,
                sub,
                rest,
                tw_offset + n,
            );
            if !ok {
                return false;
            }
        }

        match radix {
            2 => combine_radix2::<T, INVERSE>(dst, subs, twiddles, sub_size),
            4 => combine_radix4::<T, INVERSE>(dst, subs, twiddles, sub_size),
            r if r <= MAX_RADIX => combine_general::<T, INVERSE>(dst, subs, twiddles, r, sub_size),
            _ => return false,
        }
        true
    }

    fn run_leaf<const INVERSE: bool>(
        &self,
        src: &[Complex<T>],
        offset: usize,
        stride: usize,
        dst: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
        twiddles: &[Complex<T>],
    ) -> bool {
        let n = dst.len();
        let (gathered, codelet_scratch) = scratch.split_at_mut(n);

        let input: &[Complex<T>] = if stride == 1 {
            match src.get(offset..offset + n) {
                Some(input) => input,
                None => return false,
            }
        } else {
            for (i, x) in gathered.iter_mut().enumerate() {
                match src.get(offset + i * stride) {
                    Some(z) => *x = *z,
                    None => return false,
                }
            }
            gathered
        };

        if let Some(codelet) = &self.codelet {
            let accepted = if INVERSE {
                codelet.inverse(dst, input, twiddles, codelet_scratch)
            } else {
                codelet.forward(dst, input, twiddles, codelet_scratch)
            };
            if accepted {
                return true;
            }
            log::trace!(
                "codelet {} rejected a size {n} leaf, using the generic kernel",
                codelet.variant.signature
            );
        } else {
            log::trace!("no codelet for size {n}, using the generic kernel");
        }

        generic_direct::<T, INVERSE>(dst, input, twiddles, codelet_scratch, &[])
    }
}

/// Scale `values` by `1 / radix` after an inverse combine.
#[inline(always)]
fn scale<T: FftNum, const INVERSE: bool>(values: &mut [Complex<T>], radix: usize) {
    if INVERSE {
        let factor = T::from_f64((radix as f64).recip());
        values.iter_mut().for_each(|z| *z = z.scale(factor));
    }
}

fn combine_radix2<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    subs: &[Complex<T>],
    twiddles: &[Complex<T>],
    sub_size: usize,
) {
    let (sub0, sub1) = subs.split_at(sub_size);
    let (lo, hi) = dst.split_at_mut(sub_size);
    let w = &twiddles[sub_size..2 * sub_size];

    for k in 0..sub_size {
        let t = sub1[k] * directed::<T, INVERSE>(w[k]);
        lo[k] = sub0[k] + t;
        hi[k] = sub0[k] - t;
    }

    scale::<T, INVERSE>(dst, 2);
}

fn combine_radix4<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    subs: &[Complex<T>],
    twiddles: &[Complex<T>],
    sub_size: usize,
) {
    let s = sub_size;
    for k in 0..s {
        let t1 = subs[s + k] * directed::<T, INVERSE>(twiddles[s + k]);
        let t2 = subs[2 * s + k] * directed::<T, INVERSE>(twiddles[2 * s + k]);
        let t3 = subs[3 * s + k] * directed::<T, INVERSE>(twiddles[3 * s + k]);
        let out = dft4::<T, INVERSE>(subs[k], t1, t2, t3);

        dst[k] = out[0];
        dst[s + k] = out[1];
        dst[2 * s + k] = out[2];
        dst[3 * s + k] = out[3];
    }

    scale::<T, INVERSE>(dst, 4);
}

/// `dst[b*s + k] = sum_j W_r^(b*j) * (tw[j*s + k] * sub_j[k])`
fn combine_general<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    subs: &[Complex<T>],
    twiddles: &[Complex<T>],
    radix: usize,
    sub_size: usize,
) {
    let zero = Complex::new(T::zero(), T::zero());
    let mut roots = [zero; MAX_RADIX];
    for (m, root) in roots.iter_mut().enumerate().take(radix) {
        *root = directed::<T, INVERSE>(root_of_unity(m, radix));
    }

    let s = sub_size;
    let mut terms = [zero; MAX_RADIX];
    for k in 0..s {
        for (j, term) in terms.iter_mut().enumerate().take(radix) {
            *term = subs[j * s + k] * directed::<T, INVERSE>(twiddles[j * s + k]);
        }
        for b in 0..radix {
            let mut acc = zero;
            for (j, term) in terms.iter().enumerate().take(radix) {
                acc = acc + roots[(b * j) % radix] * *term;
            }
            dst[b * s + k] = acc;
        }
    }

    scale::<T, INVERSE>(dst, radix);
}

#[cfg(test)]
mod tests {
    use utilities::{assert_complex_closeness, gen_random_signal, naive_dft, reference_fft};

    use super::*;
    use crate::capabilities::SimdTier;
    use crate::twiddles::build_twiddles;

    fn buffers<T: FftNum>(strategy: &DecomposeStrategy) -> (Vec<Complex<T>>, Vec<Complex<T>>) {
        let n = strategy.size();
        (
            vec![Complex::default(); n],
            vec![Complex::default(); strategy.scratch_len()],
        )
    }

    fn check_roundtrip_f64(
        strategy: &DecomposeStrategy,
        registry: &CodeletRegistry<f64>,
        caps: CapabilityVector,
    ) {
        let n = strategy.size();
        let mut src = vec![Complex::default(); n];
        gen_random_signal(&mut src);
        let twiddles = build_twiddles::<f64>(strategy);
        let (mut spectrum, mut scratch) = buffers::<f64>(strategy);

        assert!(forward(&mut spectrum, &src, strategy, &twiddles, &mut scratch, registry, &caps));
        for (actual, expected) in spectrum.iter().zip(reference_fft(&src, false)) {
            assert_complex_closeness(*actual, expected, 1e-9);
        }

        let mut back = vec![Complex::default(); n];
        assert!(inverse(&mut back, &spectrum, strategy, &twiddles, &mut scratch, registry, &caps));
        for (actual, expected) in back.iter().zip(src.iter()) {
            assert_complex_closeness(*actual, *expected, 1e-10);
        }
    }

    #[test]
    fn impulse_1024_over_a_512_floor() {
        let strategy = DecomposeStrategy::plan(1024, &[512], 1 << 20);
        assert_eq!(strategy.radix_path(), vec![2]);

        let mut src = vec![Complex::new(0.0_f64, 0.0); 1024];
        src[0] = Complex::new(1.0, 0.0);
        let twiddles = build_twiddles::<f64>(&strategy);
        let (mut dst, mut scratch) = buffers::<f64>(&strategy);
        let registry = f64::registry();
        let caps = CapabilityVector::baseline();

        assert!(forward(&mut dst, &src, &strategy, &twiddles, &mut scratch, registry, &caps));
        for (actual, expected) in dst.iter().zip(naive_dft(&src, false)) {
            assert_complex_closeness(*actual, expected, 1e-5);
        }
    }

    #[test]
    fn every_radix_matches_the_reference() {
        let registry = f64::registry();
        let caps = CapabilityVector::detect();
        for (size, codelets) in [
            (1024, vec![512]),
            (256, vec![64]),
            (512, vec![64]),
            (4096, vec![8, 16, 32, 64]),
            (75, vec![2, 4, 8]),
            (45, vec![2, 4, 8]),
            (48, vec![16, 32]),
            (1 << 14, vec![2, 4, 8, 16, 32, 64, 128, 256, 512, 1024]),
        ] {
            let strategy = DecomposeStrategy::plan(size, &codelets, 1 << 20);
            check_roundtrip_f64(&strategy, registry, caps);
        }
    }

    #[test]
    fn empty_registry_falls_back_to_the_generic_kernel() {
        let registry = CodeletRegistry::<f64>::new();
        let strategy = DecomposeStrategy::plan(2048, &[16, 32, 64], 0);
        check_roundtrip_f64(&strategy, &registry, CapabilityVector::baseline());

        let lone_leaf = DecomposeStrategy::leaf(60);
        check_roundtrip_f64(&lone_leaf, &registry, CapabilityVector::baseline());
    }

    #[test]
    fn results_do_not_depend_on_the_capability_tier() {
        let registry = f64::registry();
        let strategy = DecomposeStrategy::plan(2048, &[16, 128], 1 << 20);
        for tier in SimdTier::ALL {
            check_roundtrip_f64(&strategy, registry, CapabilityVector::with_only(tier));
        }
    }

    #[test]
    fn single_precision_roundtrip() {
        let registry = f32::registry();
        let caps = CapabilityVector::baseline();
        let strategy = DecomposeStrategy::plan(4096, &registry.available_sizes(&caps), 1 << 20);
        let mut src = vec![Complex::new(0.0_f32, 0.0); 4096];
        gen_random_signal(&mut src);
        let twiddles = build_twiddles::<f32>(&strategy);
        let (mut spectrum, mut scratch) = buffers::<f32>(&strategy);

        assert!(forward(&mut spectrum, &src, &strategy, &twiddles, &mut scratch, registry, &caps));
        let mut back = vec![Complex::default(); 4096];
        assert!(inverse(&mut back, &spectrum, &strategy, &twiddles, &mut scratch, registry, &caps));
        for (actual, expected) in back.iter().zip(src.iter()) {
            assert_complex_closeness(*actual, *expected, 1e-4);
        }
    }

    #[test]
    fn short_buffers_are_rejected() {
        let strategy = DecomposeStrategy::plan(256, &[16], 1 << 20);
        let twiddles = build_twiddles::<f64>(&strategy);
        let registry = f64::registry();
        let caps = CapabilityVector::baseline();
        let src = vec![Complex::new(1.0_f64, 0.0); 256];
        let mut dst = vec![Complex::default(); 256];

        let mut scratch = vec![Complex::default(); strategy.scratch_len() - 1];
        assert!(!forward(&mut dst, &src, &strategy, &twiddles, &mut scratch, registry, &caps));

        let mut scratch = vec![Complex::default(); strategy.scratch_len()];
        let short_src = &src[..255];
        assert!(!forward(&mut dst, short_src, &strategy, &twiddles, &mut scratch, registry, &caps));
        let short_tw = &twiddles[..10];
        assert!(!forward(&mut dst, &src, &strategy, short_tw, &mut scratch, registry, &caps));
        assert!(forward(&mut dst, &src, &strategy, &twiddles, &mut scratch, registry, &caps));
    }
}

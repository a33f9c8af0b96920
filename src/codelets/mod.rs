//! Codelet Registry
//!
//! A per-precision catalog of fixed-size kernels. Several variants may be registered for one size;
//! [`CodeletRegistry::lookup`] picks the best one a [`CapabilityVector`] can run.
//!
//! ## Organization
//!
//! - `butterflies`: hard-coded kernels for sizes 2, 4, 8 and 16
//! - `dit`: the power-of-two radix-2 codelet and the generic direct kernel
//! - `tiers`: the same kernels instantiated for every [`SimdTier`]
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use num_complex::Complex;
use parking_lot::RwLock;

use crate::bit_reversal::bit_reversal_permutation;
use crate::capabilities::{CapabilityVector, SimdTier};
use crate::precision::FftNum;

pub(crate) mod butterflies;
pub(crate) mod dit;
mod tiers;

pub(crate) use dit::generic_direct;

/// `fn(dst, src, twiddles, scratch, permutation) -> bool`
///
/// Every slice must cover at least the codelet size, `twiddles` is the full `N`-point table
/// `W_N^k`, and `permutation` may be empty for kernels that need no reordering. Returns `false`
/// instead of panicking when a precondition does not hold.
pub type CodeletFn<T> =
    fn(&mut [Complex<T>], &[Complex<T>], &[Complex<T>], &mut [Complex<T>], &[usize]) -> bool;

/// Builds the index table a codelet expects for a given size.
pub type PermutationFn = fn(usize) -> Vec<usize>;

/// Algorithm a codelet implements
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlgorithmTag {
    /// Hard-coded butterfly network
    Butterfly,
    /// Radix-2 decimation in time over bit reversed input
    RadixTwoDit,
}

/// One registered kernel.
#[derive(Copy, Clone)]
pub struct CodeletVariant<T> {
    pub size: usize,
    pub forward: CodeletFn<T>,
    pub inverse: CodeletFn<T>,
    pub algorithm: AlgorithmTag,
    pub tier: SimdTier,
    /// Stable identifier used by [`CodeletRegistry::lookup_by_signature`]
    pub signature: &'static str,
    pub priority: i32,
    pub permutation: Option<PermutationFn>,
}

impl<T> Debug for CodeletVariant<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeletVariant")
            .field("size", &self.size)
            .field("algorithm", &self.algorithm)
            .field("tier", &self.tier)
            .field("signature", &self.signature)
            .field("priority", &self.priority)
            .field("permutation", &self.permutation.is_some())
            .finish()
    }
}

/// A variant selected by the registry, together with its precomputed permutation table.
#[derive(Debug, Clone)]
pub struct Codelet<T> {
    pub variant: CodeletVariant<T>,
    /// Empty when the variant needs no reordering
    pub permutation: Arc<[usize]>,
}

impl<T> Codelet<T> {
    pub fn forward(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        twiddles: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        (self.variant.forward)(dst, src, twiddles, scratch, &self.permutation)
    }

    pub fn inverse(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        twiddles: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        (self.variant.inverse)(dst, src, twiddles, scratch, &self.permutation)
    }
}

/// Per-precision codelet catalog.
///
/// Registration takes the write lock; lookups only ever take the read lock and never allocate.
pub struct CodeletRegistry<T> {
    variants: RwLock<BTreeMap<usize, Vec<Codelet<T>>>>,
}

impl<T: FftNum> Default for CodeletRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FftNum> CodeletRegistry<T> {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            variants: RwLock::new(BTreeMap::new()),
        }
    }

    /// A registry holding every built-in codelet for every tier.
    pub fn with_builtin_codelets() -> Self {
        let registry = Self::new();
        register_builtin(&registry);
        registry
    }

    /// Append `variant` to the list for its size. Duplicates are allowed.
    ///
    /// The permutation table, if any, is built here so that lookups stay allocation free.
    pub fn register(&self, variant: CodeletVariant<T>) {
        let permutation: Arc<[usize]> = match variant.permutation {
            Some(build) => build(variant.size).into(),
            None => Arc::from(Vec::new()),
        };

        self.variants
            .write()
            .entry(variant.size)
            .or_default()
            .push(Codelet {
                variant,
                permutation,
            });
    }

    /// Best variant of `size` runnable under `capabilities`: highest tier, then highest priority,
    /// then earliest registration.
    pub fn lookup(&self, size: usize, capabilities: &CapabilityVector) -> Option<Codelet<T>> {
        let variants = self.variants.read();
        let mut best: Option<&Codelet<T>> = None;

        for candidate in variants.get(&size)? {
            if !capabilities.supports(candidate.variant.tier) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    (candidate.variant.tier, candidate.variant.priority)
                        > (current.variant.tier, current.variant.priority)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        best.cloned()
    }

    /// Exact match on size and signature, regardless of capabilities.
    pub fn lookup_by_signature(&self, size: usize, signature: &str) -> Option<Codelet<T>> {
        self.variants
            .read()
            .get(&size)?
            .iter()
            .find(|codelet| codelet.variant.signature == signature)
            .cloned()
    }

    /// Sorted sizes with at least one variant runnable under `capabilities`.
    pub fn available_sizes(&self, capabilities: &CapabilityVector) -> Vec<usize> {
        self.variants
            .read()
            .iter()
            .filter(|(_, variants)| {
                variants
                    .iter()
                    .any(|codelet| capabilities.supports(codelet.variant.tier))
            })
            .map(|(&size, _)| size)
            .collect()
    }

    /// All variants registered for `size`, in registration order.
    pub fn variants(&self, size: usize) -> Vec<CodeletVariant<T>> {
        self.variants
            .read()
            .get(&size)
            .map(|variants| variants.iter().map(|codelet| codelet.variant).collect())
            .unwrap_or_default()
    }
}

/// Smallest and largest power-of-two sizes served by the radix-2 DIT codelet.
pub(crate) const MIN_DIT_CODELET: usize = 16;
pub(crate) const MAX_DIT_CODELET: usize = 1024;

const BUTTERFLY_PRIORITY: i32 = 10;
const DIT_PRIORITY: i32 = 0;

macro_rules! register_tier {
    ($registry:expr, $tier:expr, $module:ident, $prefix:literal) => {{
        use tiers::$module as tier;

        let butterflies: [(usize, CodeletFn<T>, CodeletFn<T>, &'static str); 4] = [
            (
                2,
                tier::butterfly2_forward::<T>,
                tier::butterfly2_inverse::<T>,
                concat!("butterfly2/", $prefix),
            ),
            (
                4,
                tier::butterfly4_forward::<T>,
                tier::butterfly4_inverse::<T>,
                concat!("butterfly4/", $prefix),
            ),
            (
                8,
                tier::butterfly8_forward::<T>,
                tier::butterfly8_inverse::<T>,
                concat!("butterfly8/", $prefix),
            ),
            (
                16,
                tier::butterfly16_forward::<T>,
                tier::butterfly16_inverse::<T>,
                concat!("butterfly16/", $prefix),
            ),
        ];
        for (size, forward, inverse, signature) in butterflies {
            $registry.register(CodeletVariant {
                size,
                forward,
                inverse,
                algorithm: AlgorithmTag::Butterfly,
                tier: $tier,
                signature,
                priority: BUTTERFLY_PRIORITY,
                permutation: None,
            });
        }

        let mut size = MIN_DIT_CODELET;
        while size <= MAX_DIT_CODELET {
            $registry.register(CodeletVariant {
                size,
                forward: tier::dit_forward::<T>,
                inverse: tier::dit_inverse::<T>,
                algorithm: AlgorithmTag::RadixTwoDit,
                tier: $tier,
                signature: concat!("dit-radix2/", $prefix),
                priority: DIT_PRIORITY,
                permutation: Some(bit_reversal_permutation),
            });
            size <<= 1;
        }
    }};
}

fn register_builtin<T: FftNum>(registry: &CodeletRegistry<T>) {
    register_tier!(registry, SimdTier::Baseline, baseline, "baseline");
    register_tier!(registry, SimdTier::Mid, mid, "mid");
    register_tier!(registry, SimdTier::Wide, wide, "wide");
    register_tier!(registry, SimdTier::ArmSimd, arm_simd, "arm-simd");
}

#[cfg(test)]
mod tests {
    use utilities::{assert_complex_closeness, gen_random_signal, naive_dft};

    use super::*;
    use crate::twiddles::leaf_twiddles;

    fn noop<T>(
        _: &mut [Complex<T>],
        _: &[Complex<T>],
        _: &[Complex<T>],
        _: &mut [Complex<T>],
        _: &[usize],
    ) -> bool {
        true
    }

    fn variant(
        size: usize,
        tier: SimdTier,
        priority: i32,
        signature: &'static str,
    ) -> CodeletVariant<f64> {
        CodeletVariant {
            size,
            forward: noop::<f64>,
            inverse: noop::<f64>,
            algorithm: AlgorithmTag::Butterfly,
            tier,
            signature,
            priority,
            permutation: None,
        }
    }

    #[test]
    fn lookup_prefers_tier_then_priority_then_registration_order() {
        let registry = CodeletRegistry::<f64>::new();
        registry.register(variant(32, SimdTier::Baseline, 1, "base-low"));
        registry.register(variant(32, SimdTier::Baseline, 5, "base-high"));
        registry.register(variant(32, SimdTier::Baseline, 5, "base-high-late"));
        registry.register(variant(32, SimdTier::Mid, 0, "mid"));
        registry.register(variant(32, SimdTier::Wide, 3, "wide-low"));
        registry.register(variant(32, SimdTier::Wide, 7, "wide-high"));

        let pick = |caps: CapabilityVector| registry.lookup(32, &caps).unwrap().variant.signature;

        assert_eq!(pick(CapabilityVector::baseline()), "base-high");
        assert_eq!(pick(CapabilityVector::with_only(SimdTier::Mid)), "mid");
        assert_eq!(pick(CapabilityVector::with_only(SimdTier::Wide)), "wide-high");
        assert_eq!(pick(CapabilityVector::with_only(SimdTier::ArmSimd)), "base-high");
        assert_eq!(
            pick(CapabilityVector::with_only(SimdTier::Wide).with_force_generic(true)),
            "base-high"
        );
    }

    #[test]
    fn lookup_never_exceeds_claimed_tier() {
        let registry = CodeletRegistry::<f64>::with_builtin_codelets();
        for tier in SimdTier::ALL {
            let caps = CapabilityVector::with_only(tier);
            for size in registry.available_sizes(&caps) {
                let variants = registry.variants(size);
                if variants.len() < 2 {
                    continue;
                }
                let chosen = registry.lookup(size, &caps).unwrap().variant;
                assert!(chosen.tier <= tier);
                assert!(caps.supports(chosen.tier));

                let best_priority = variants
                    .iter()
                    .filter(|v| v.tier == chosen.tier)
                    .map(|v| v.priority)
                    .max()
                    .unwrap();
                assert_eq!(chosen.priority, best_priority);
            }
        }
    }

    #[test]
    fn missing_sizes_return_none() {
        let registry = CodeletRegistry::<f32>::with_builtin_codelets();
        assert!(registry.lookup(3, &CapabilityVector::baseline()).is_none());
        assert!(registry.lookup(2048, &CapabilityVector::baseline()).is_none());
        assert!(CodeletRegistry::<f32>::new()
            .lookup(8, &CapabilityVector::baseline())
            .is_none());
    }

    #[test]
    fn available_sizes_respect_capabilities() {
        let registry = CodeletRegistry::<f64>::new();
        registry.register(variant(64, SimdTier::Wide, 0, "wide-only"));
        registry.register(variant(8, SimdTier::Baseline, 0, "portable"));

        assert_eq!(registry.available_sizes(&CapabilityVector::baseline()), vec![8]);
        assert_eq!(
            registry.available_sizes(&CapabilityVector::with_only(SimdTier::Wide)),
            vec![8, 64]
        );
    }

    #[test]
    fn builtin_sizes_cover_butterflies_and_dit() {
        let registry = CodeletRegistry::<f64>::with_builtin_codelets();
        let sizes = registry.available_sizes(&CapabilityVector::baseline());
        assert_eq!(sizes, vec![2, 4, 8, 16, 32, 64, 128, 256, 512, 1024]);

        // size 16 has both a butterfly and a DIT codelet; the butterfly wins on priority
        let chosen = registry.lookup(16, &CapabilityVector::baseline()).unwrap();
        assert_eq!(chosen.variant.algorithm, AlgorithmTag::Butterfly);
        assert!(chosen.permutation.is_empty());

        let dit = registry.lookup_by_signature(64, "dit-radix2/wide").unwrap();
        assert_eq!(dit.variant.tier, SimdTier::Wide);
        assert_eq!(dit.permutation.len(), 64);
        assert!(registry.lookup_by_signature(64, "dit-radix2/unknown").is_none());
    }

    macro_rules! test_builtin_variants_for {
        ($test_name:ident, $precision:ty, $epsilon:expr) => {
            #[test]
            fn $test_name() {
                let registry = CodeletRegistry::<$precision>::with_builtin_codelets();
                for size in registry.available_sizes(&CapabilityVector::baseline()) {
                    let mut src = vec![Complex::<$precision>::default(); size];
                    gen_random_signal(&mut src);
                    let expected = naive_dft(&src, false);
                    let twiddles = leaf_twiddles::<$precision>(size);
                    let scale = (size as $precision).sqrt();

                    for variant in registry.variants(size) {
                        let codelet =
                            registry.lookup_by_signature(size, variant.signature).unwrap();
                        let mut scratch = vec![Complex::default(); size];
                        let mut dst = vec![Complex::default(); size];
                        assert!(codelet.forward(&mut dst, &src, &twiddles, &mut scratch));
                        for (actual, expected) in dst.iter().zip(expected.iter()) {
                            assert_complex_closeness(*actual / scale, *expected / scale, $epsilon);
                        }

                        let mut back = vec![Complex::default(); size];
                        assert!(codelet.inverse(&mut back, &dst, &twiddles, &mut scratch));
                        for (actual, expected) in back.iter().zip(src.iter()) {
                            assert_complex_closeness(*actual, *expected, $epsilon);
                        }
                    }
                }
            }
        };
    }

    test_builtin_variants_for!(every_builtin_variant_computes_the_dft_64, f64, 1e-10);
    test_builtin_variants_for!(every_builtin_variant_computes_the_dft_32, f32, 1e-4);
}

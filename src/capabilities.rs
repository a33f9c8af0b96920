//! CPU capability snapshot used to pick codelet variants.
//!
//! Only the resulting vector matters to the planner; [`CapabilityVector::detect`] is a thin wrapper
//! over the standard library's runtime feature macros. Tests construct vectors by hand.
use std::fmt::{Display, Formatter};

/// SIMD tiers a codelet variant can be compiled for.
///
/// The discriminant is the bit position of the tier in the wisdom file's `CPUFeatureMask`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimdTier {
    /// Portable scalar code, always supported
    Baseline = 0,
    /// 128-bit vectors (SSE4.2 class)
    Mid = 1,
    /// 256-bit vectors with FMA (AVX2 class)
    Wide = 2,
    /// ARM Advanced SIMD (NEON)
    ArmSimd = 3,
}

impl SimdTier {
    pub const ALL: [SimdTier; 4] = [Self::Baseline, Self::Mid, Self::Wide, Self::ArmSimd];

    /// Bit of this tier in a capability mask
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Mid => "mid",
            Self::Wide => "wide",
            Self::ArmSimd => "arm-simd",
        }
    }
}

impl Display for SimdTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Architecture tag of the capability snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    X86,
    Aarch64,
    Other,
}

impl Arch {
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Self::X86_64
        } else if cfg!(target_arch = "x86") {
            Self::X86
        } else if cfg!(target_arch = "aarch64") {
            Self::Aarch64
        } else {
            Self::Other
        }
    }
}

/// Immutable record of the SIMD tiers available to the planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityVector {
    pub mid: bool,
    pub wide: bool,
    pub arm_simd: bool,
    pub arch: Arch,
    /// Disables every tier except [`SimdTier::Baseline`]
    pub force_generic: bool,
}

impl Default for CapabilityVector {
    fn default() -> Self {
        Self::baseline()
    }
}

impl CapabilityVector {
    /// A vector that only claims the portable tier.
    pub const fn baseline() -> Self {
        Self {
            mid: false,
            wide: false,
            arm_simd: false,
            arch: Arch::current(),
            force_generic: false,
        }
    }

    /// Detect the tiers of the running CPU.
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut caps = Self::baseline();

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            caps.mid = std::arch::is_x86_feature_detected!("sse4.2");
            caps.wide = std::arch::is_x86_feature_detected!("avx2")
                && std::arch::is_x86_feature_detected!("fma");
        }

        #[cfg(target_arch = "aarch64")]
        {
            caps.arm_simd = std::arch::is_aarch64_feature_detected!("neon");
        }

        caps
    }

    /// Baseline plus exactly one additional tier.
    pub const fn with_only(tier: SimdTier) -> Self {
        Self::baseline().with_tier(tier, true)
    }

    #[must_use]
    pub const fn with_tier(mut self, tier: SimdTier, enabled: bool) -> Self {
        match tier {
            SimdTier::Baseline => {}
            SimdTier::Mid => self.mid = enabled,
            SimdTier::Wide => self.wide = enabled,
            SimdTier::ArmSimd => self.arm_simd = enabled,
        }
        self
    }

    #[must_use]
    pub const fn with_force_generic(mut self, force_generic: bool) -> Self {
        self.force_generic = force_generic;
        self
    }

    /// Whether codelets compiled for `tier` may run under this vector.
    pub const fn supports(&self, tier: SimdTier) -> bool {
        let flag = match tier {
            SimdTier::Baseline => return true,
            SimdTier::Mid => self.mid,
            SimdTier::Wide => self.wide,
            SimdTier::ArmSimd => self.arm_simd,
        };
        flag && !self.force_generic
    }

    /// Highest supported tier
    pub fn max_tier(&self) -> SimdTier {
        SimdTier::ALL
            .into_iter()
            .filter(|tier| self.supports(*tier))
            .max()
            .unwrap_or(SimdTier::Baseline)
    }

    /// Effective tiers as a `CPUFeatureMask` (bit 0 is always set).
    pub fn mask(&self) -> u32 {
        SimdTier::ALL
            .into_iter()
            .filter(|tier| self.supports(*tier))
            .fold(0, |mask, tier| mask | tier.bit())
    }
}

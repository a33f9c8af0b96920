//! The plan module provides a convenient interface for planning and executing a Fast Fourier
//! Transform (FFT). A [`Plan`] resolves the algorithm family once, precomputes everything that
//! family needs (decomposition tree and twiddles, Bluestein filter, six-step sub-plans), and can
//! then be executed any number of times, from any number of threads, without allocating.
use std::sync::Arc;

use log::debug;
use num_complex::Complex;
use thiserror::Error;

use crate::bluestein::Bluestein;
use crate::capabilities::CapabilityVector;
use crate::codelets::CodeletRegistry;
use crate::decompose::DecomposeStrategy;
use crate::engine;
use crate::precision::FftNum;
use crate::session::PlannerSession;
use crate::square::SquareTransform;
use crate::strategy::{is_5_smooth, AlgorithmFamily};
use crate::twiddles::{build_twiddles, TwiddleBuffer};

/// Reverse is for running the Inverse Fast Fourier Transform (IFFT)
/// Forward is for running the regular FFT
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Leave the exponent term in the twiddle factor alone
    Forward = 1,
    /// Multiply the exponent term in the twiddle factor by -1
    Reverse = -1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FftError {
    #[error("cannot plan a transform of length 0")]
    EmptyTransform,
    #[error("buffer length {actual} does not match the expected length {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("scratch buffer of length {actual} is shorter than the required {required}")]
    ScratchTooSmall { required: usize, actual: usize },
    #[error("a kernel rejected its inputs while transforming {size} points")]
    KernelRejected { size: usize },
}

enum Kernel<T: FftNum> {
    Tree {
        strategy: DecomposeStrategy,
        twiddles: TwiddleBuffer<T>,
    },
    Square(Box<SquareTransform<T>>),
    Bluestein(Box<Bluestein<T>>),
}

/// A reusable transform of one length.
pub struct Plan<T: FftNum> {
    len: usize,
    family: AlgorithmFamily,
    kernel: Kernel<T>,
    capabilities: CapabilityVector,
    registry: Arc<CodeletRegistry<T>>,
}

impl<T: FftNum> std::fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("len", &self.len)
            .field("family", &self.family)
            .field("scratch_len", &self.scratch_len())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl<T: FftNum> Plan<T> {
    /// Plan a transform of `len` points with the process-wide session.
    pub fn new(len: usize) -> Result<Self, FftError> {
        Self::with_session(len, PlannerSession::global())
    }

    /// Plan with `session`, letting it resolve the algorithm family.
    pub fn with_session(len: usize, session: &PlannerSession) -> Result<Self, FftError> {
        Self::with_registry(len, session, Arc::clone(T::registry()))
    }

    /// Plan with `session` and a caller-provided codelet registry.
    pub fn with_registry(
        len: usize,
        session: &PlannerSession,
        registry: Arc<CodeletRegistry<T>>,
    ) -> Result<Self, FftError> {
        let family = session.resolve(len, T::PRECISION);
        Self::build(len, family, session, &registry)
    }

    /// Plan with an explicit family, bypassing the resolver.
    ///
    /// Families that cannot serve `len` are replaced by the session's fallback, and direct or
    /// recursive plans for sizes that are not 5-smooth above the direct threshold use Bluestein.
    pub fn with_family(
        len: usize,
        family: AlgorithmFamily,
        session: &PlannerSession,
    ) -> Result<Self, FftError> {
        Self::build(len, family, session, T::registry())
    }

    pub(crate) fn build(
        len: usize,
        family: AlgorithmFamily,
        session: &PlannerSession,
        registry: &Arc<CodeletRegistry<T>>,
    ) -> Result<Self, FftError> {
        if len == 0 {
            return Err(FftError::EmptyTransform);
        }

        let options = session.options();
        let capabilities = session.capabilities();

        let family = if family.is_applicable(len) {
            family
        } else {
            session.fallback_family(len)
        };
        let family = match family {
            AlgorithmFamily::Direct | AlgorithmFamily::Recursive
                if !is_5_smooth(len) && len > options.direct_threshold =>
            {
                AlgorithmFamily::Bluestein
            }
            family => family,
        };

        let kernel = match family {
            AlgorithmFamily::Direct => {
                let strategy = DecomposeStrategy::leaf(len);
                let twiddles = build_twiddles(&strategy);
                Kernel::Tree { strategy, twiddles }
            }
            AlgorithmFamily::Recursive => {
                let codelet_sizes = registry.available_sizes(&capabilities);
                let strategy =
                    DecomposeStrategy::plan(len, &codelet_sizes, options.cache_size_bytes);
                let twiddles = build_twiddles(&strategy);
                Kernel::Tree { strategy, twiddles }
            }
            AlgorithmFamily::SixStep | AlgorithmFamily::EightStep => {
                let blocked = family == AlgorithmFamily::EightStep;
                Kernel::Square(Box::new(SquareTransform::new(
                    len, blocked, session, registry,
                )?))
            }
            AlgorithmFamily::Bluestein => {
                Kernel::Bluestein(Box::new(Bluestein::new(len, session, registry)?))
            }
        };

        let plan = Self {
            len,
            family,
            kernel,
            capabilities,
            registry: Arc::clone(registry),
        };
        debug!(
            "planned {len}-point {} transform as {family}, scratch {}",
            T::PRECISION,
            plan.scratch_len()
        );
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; plans of length 0 cannot be built.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn family(&self) -> AlgorithmFamily {
        self.family
    }

    /// Capability snapshot the plan selects codelets with
    pub fn capabilities(&self) -> CapabilityVector {
        self.capabilities
    }

    /// The decomposition tree, for direct and recursive plans
    pub fn strategy(&self) -> Option<&DecomposeStrategy> {
        match &self.kernel {
            Kernel::Tree { strategy, .. } => Some(strategy),
            _ => None,
        }
    }

    /// Scratch needed by [`Self::forward`] and [`Self::inverse`]
    pub fn scratch_len(&self) -> usize {
        match &self.kernel {
            Kernel::Tree { strategy, .. } => strategy.scratch_len(),
            Kernel::Square(square) => square.scratch_len(),
            Kernel::Bluestein(bluestein) => bluestein.scratch_len(),
        }
    }

    /// Scratch needed by [`Self::process`] and [`Self::process_interleaved`]
    pub fn inplace_scratch_len(&self) -> usize {
        self.len + self.scratch_len()
    }

    /// Scratch needed by [`Self::process_split`]
    pub fn split_scratch_len(&self) -> usize {
        2 * self.len + self.scratch_len()
    }

    /// Run the transform without validating buffer lengths beyond what the kernels check.
    pub(crate) fn execute<const INVERSE: bool>(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        match &self.kernel {
            Kernel::Tree { strategy, twiddles } => {
                let run = if INVERSE {
                    engine::inverse::<T>
                } else {
                    engine::forward::<T>
                };
                run(
                    dst,
                    src,
                    strategy,
                    twiddles,
                    scratch,
                    &self.registry,
                    &self.capabilities,
                )
            }
            Kernel::Square(square) => square.execute::<INVERSE>(dst, src, scratch),
            Kernel::Bluestein(bluestein) => bluestein.execute::<INVERSE>(dst, src, scratch),
        }
    }

    fn check(
        &self,
        buffer_len: usize,
        scratch_len: usize,
        required: usize,
    ) -> Result<(), FftError> {
        if buffer_len != self.len {
            return Err(FftError::LengthMismatch {
                expected: self.len,
                actual: buffer_len,
            });
        }
        if scratch_len < required {
            return Err(FftError::ScratchTooSmall {
                required,
                actual: scratch_len,
            });
        }
        Ok(())
    }

    fn run<const INVERSE: bool>(
        &self,
        src: &[Complex<T>],
        dst: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        self.check(src.len(), scratch.len(), self.scratch_len())?;
        self.check(dst.len(), scratch.len(), self.scratch_len())?;

        if self.execute::<INVERSE>(dst, src, scratch) {
            Ok(())
        } else {
            Err(FftError::KernelRejected { size: self.len })
        }
    }

    /// Forward transform of `src` into `dst`. `scratch` needs [`Self::scratch_len`] elements.
    pub fn forward(
        &self,
        src: &[Complex<T>],
        dst: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        self.run::<false>(src, dst, scratch)
    }

    /// Inverse transform of `src` into `dst`, normalized by `1 / len`.
    pub fn inverse(
        &self,
        src: &[Complex<T>],
        dst: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        self.run::<true>(src, dst, scratch)
    }

    /// In-place transform. `scratch` needs [`Self::inplace_scratch_len`] elements.
    pub fn process(
        &self,
        buffer: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
        direction: Direction,
    ) -> Result<(), FftError> {
        self.check(buffer.len(), scratch.len(), self.inplace_scratch_len())?;

        let (input, rest) = scratch.split_at_mut(self.len);
        input.copy_from_slice(buffer);

        let ok = match direction {
            Direction::Forward => self.execute::<false>(buffer, input, rest),
            Direction::Reverse => self.execute::<true>(buffer, input, rest),
        };
        if ok {
            Ok(())
        } else {
            Err(FftError::KernelRejected { size: self.len })
        }
    }

    /// In-place transform of interleaved `[re, im, re, im, ...]` data.
    pub fn process_interleaved(
        &self,
        buffer: &mut [T],
        scratch: &mut [Complex<T>],
        direction: Direction,
    ) -> Result<(), FftError> {
        let mismatch = FftError::LengthMismatch {
            expected: 2 * self.len,
            actual: buffer.len(),
        };
        let complex: &mut [Complex<T>] =
            bytemuck::try_cast_slice_mut(buffer).map_err(|_| mismatch.clone())?;
        if complex.len() != self.len {
            return Err(mismatch);
        }
        self.process(complex, scratch, direction)
    }

    /// In-place transform of separate real and imaginary buffers.
    ///
    /// `scratch` needs [`Self::split_scratch_len`] elements.
    pub fn process_split(
        &self,
        reals: &mut [T],
        imags: &mut [T],
        scratch: &mut [Complex<T>],
        direction: Direction,
    ) -> Result<(), FftError> {
        self.check(reals.len(), scratch.len(), self.split_scratch_len())?;
        self.check(imags.len(), scratch.len(), self.split_scratch_len())?;

        let (input, rest) = scratch.split_at_mut(self.len);
        let (output, rest) = rest.split_at_mut(self.len);
        for ((z, re), im) in input.iter_mut().zip(reals.iter()).zip(imags.iter()) {
            *z = Complex::new(*re, *im);
        }

        let ok = match direction {
            Direction::Forward => self.execute::<false>(output, input, rest),
            Direction::Reverse => self.execute::<true>(output, input, rest),
        };
        if !ok {
            return Err(FftError::KernelRejected { size: self.len });
        }

        for ((z, re), im) in output.iter().zip(reals.iter_mut()).zip(imags.iter_mut()) {
            *re = z.re;
            *im = z.im;
        }
        Ok(())
    }
}

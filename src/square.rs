//! Six-step and eight-step transforms for perfect-square lengths.
//!
//! For `n = m^2`, the input is viewed as an `m x m` row-major matrix:
//!
//! 1. transpose
//! 2. `m` row transforms of length `m`
//! 3. multiply element `(r, c)` by `W_n^(r*c)`
//! 4. transpose
//! 5. `m` row transforms of length `m`
//! 6. transpose
//!
//! The eight-step variant tiles every transpose into `block x block` squares and folds step 3 into
//! the transpose of step 4.
use std::sync::Arc;

use num_complex::Complex;

use crate::codelets::CodeletRegistry;
use crate::options::integer_sqrt;
use crate::plan::{FftError, Plan};
use crate::precision::{directed, FftNum};
use crate::session::PlannerSession;
use crate::twiddles::square_twiddles;

pub(crate) struct SquareTransform<T: FftNum> {
    len: usize,
    side: usize,
    /// Transpose tile edge; equal to `side` for the six-step variant
    block: usize,
    blocked: bool,
    twiddles: Vec<Complex<T>>,
    rows: Plan<T>,
}

/// `dst[c * side + r] = src[r * side + c] * tw[r * side + c]`, tile by tile.
fn transpose<T: FftNum, const INVERSE: bool>(
    dst: &mut [Complex<T>],
    src: &[Complex<T>],
    side: usize,
    block: usize,
    twiddles: Option<&[Complex<T>]>,
) {
    for row_start in (0..side).step_by(block) {
        let row_end = (row_start + block).min(side);
        for col_start in (0..side).step_by(block) {
            let col_end = (col_start + block).min(side);

            for r in row_start..row_end {
                for c in col_start..col_end {
                    let index = r * side + c;
                    let z = match twiddles {
                        Some(tw) => src[index] * directed::<T, INVERSE>(tw[index]),
                        None => src[index],
                    };
                    dst[c * side + r] = z;
                }
            }
        }
    }
}

impl<T: FftNum> SquareTransform<T> {
    /// # Errors
    ///
    /// Fails if the row plan cannot be built.
    pub(crate) fn new(
        len: usize,
        blocked: bool,
        session: &PlannerSession,
        registry: &Arc<CodeletRegistry<T>>,
    ) -> Result<Self, FftError> {
        let side = integer_sqrt(len);
        if side * side != len {
            return Err(FftError::LengthMismatch {
                expected: side * side,
                actual: len,
            });
        }

        let row_family = session.resolve(side, T::PRECISION);
        let rows = Plan::build(side, row_family, session, registry)?;
        let block = if blocked {
            session.options().transpose_block.clamp(1, side)
        } else {
            side
        };

        Ok(Self {
            len,
            side,
            block,
            blocked,
            twiddles: square_twiddles(side),
            rows,
        })
    }

    pub(crate) fn scratch_len(&self) -> usize {
        2 * self.len + self.rows.scratch_len()
    }

    fn row_transforms<const INVERSE: bool>(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        dst.chunks_exact_mut(self.side)
            .zip(src.chunks_exact(self.side))
            .all(|(out, row)| self.rows.execute::<INVERSE>(out, row, scratch))
    }

    pub(crate) fn execute<const INVERSE: bool>(
        &self,
        dst: &mut [Complex<T>],
        src: &[Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> bool {
        let (n, side, block) = (self.len, self.side, self.block);
        if src.len() != n || dst.len() != n || scratch.len() < self.scratch_len() {
            return false;
        }

        let (a, rest) = scratch.split_at_mut(n);
        let (b, row_scratch) = rest.split_at_mut(n);

        transpose::<T, INVERSE>(a, src, side, block, None);
        if !self.row_transforms::<INVERSE>(b, a, row_scratch) {
            return false;
        }

        if self.blocked {
            transpose::<T, INVERSE>(a, b, side, block, Some(&self.twiddles));
        } else {
            for (z, w) in b.iter_mut().zip(&self.twiddles) {
                *z = *z * directed::<T, INVERSE>(*w);
            }
            transpose::<T, INVERSE>(a, b, side, block, None);
        }

        if !self.row_transforms::<INVERSE>(b, a, row_scratch) {
            return false;
        }
        transpose::<T, INVERSE>(dst, b, side, block, None);
        true
    }
}

//! Twiddle precomputation.
//!
//! The buffer mirrors the decomposition tree: every internal node stores its `radix * sub_size`
//! combine twiddles, immediately followed by the buffer of its (shared) child, and the leaf stores
//! its full `N`-point table. A node at offset `o` of size `N` thus finds its child at `o + N`.
use std::ops::Deref;

use num_complex::Complex;

use crate::decompose::{DecomposeStrategy, NodeId};
use crate::precision::{root_of_unity, FftNum};

/// `W_n^k` for `k = 0..n`
pub(crate) fn leaf_twiddles<T: FftNum>(n: usize) -> Vec<Complex<T>> {
    let mut table = Vec::with_capacity(n);
    push_leaf_twiddles(n, &mut table);
    table
}

fn push_leaf_twiddles<T: FftNum>(n: usize, out: &mut Vec<Complex<T>>) {
    out.extend((0..n).map(|k| root_of_unity::<T>(k, n)));
}

/// `W_n^(j*k)` for `j = 0..radix` (major) and `k = 0..sub_size`
fn push_combine_twiddles<T: FftNum>(
    n: usize,
    radix: usize,
    sub_size: usize,
    out: &mut Vec<Complex<T>>,
) {
    for j in 0..radix {
        out.extend((0..sub_size).map(|k| root_of_unity::<T>((j * k) % n, n)));
    }
}

/// `W_n^(r*c)` at `[r * side + c]`, `n = side^2`, for the six-step twiddle pass
pub(crate) fn square_twiddles<T: FftNum>(side: usize) -> Vec<Complex<T>> {
    let n = side * side;
    let mut table = Vec::with_capacity(n);
    push_combine_twiddles(n, side, side, &mut table);
    table
}

/// Flat, offset addressed twiddle storage for one [`DecomposeStrategy`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwiddleBuffer<T> {
    data: Vec<Complex<T>>,
}

impl<T> Deref for TwiddleBuffer<T> {
    type Target = [Complex<T>];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> AsRef<[Complex<T>]> for TwiddleBuffer<T> {
    fn as_ref(&self) -> &[Complex<T>] {
        &self.data
    }
}

/// Precompute every twiddle the engine reads while executing `strategy`.
pub fn build_twiddles<T: FftNum>(strategy: &DecomposeStrategy) -> TwiddleBuffer<T> {
    let mut data = Vec::with_capacity(strategy.twiddle_len());
    let mut next: Option<NodeId> = Some(strategy.root());

    while let Some(id) = next {
        let node = strategy.node(id);
        if node.is_leaf() {
            push_leaf_twiddles(node.size, &mut data);
        } else {
            push_combine_twiddles(node.size, node.radix, node.sub_size, &mut data);
        }
        next = node.child();
    }

    TwiddleBuffer { data }
}

//! Bit reversal permutation tables for the radix-2 DIT codelets.
//!
//! Tables are built once, when a codelet is registered, by running the Gray code bit reversal
//! over the identity permutation. The generic direct kernel never allocates a table; it computes
//! reversed indices on the fly with [`reverse_index`].

/// Bit reversal permutation of `0..n`, i.e. `table[i] == reverse_index(i, log2(n))`.
///
/// Returns an empty table if `n` is not a power of two, which codelets treat as "no permutation".
pub fn bit_reversal_permutation(n: usize) -> Vec<usize> {
    if !n.is_power_of_two() {
        return Vec::new();
    }
    let mut table: Vec<usize> = (0..n).collect();
    bit_rev_gray(&mut table, n.ilog2() as usize);
    table
}

/// Reverse the lowest `log_n` bits of `index`.
#[inline(always)]
pub(crate) fn reverse_index(index: usize, log_n: u32) -> usize {
    if log_n == 0 {
        0
    } else {
        index.reverse_bits() >> (usize::BITS - log_n)
    }
}

/// In-place bit reversal of `buf` (length `2^log_n`), walking the even indices in Gray code order
/// so each step toggles a single bit of the index and of its reversal.
///
/// ## References
/// [1] <https://www.katjaas.nl/bitreversal/bitreversal.html>
pub(crate) fn bit_rev_gray<T>(buf: &mut [T], log_n: usize) {
    let n: usize = 1 << log_n;
    let half = n >> 1;
    let quarter = n >> 2;
    let mask = n - 1;

    let mut even = half;
    let mut even_rev = 1;

    for step in (1..=quarter).rev() {
        let zeros = step.trailing_zeros();
        even ^= 2 << zeros;
        even_rev ^= quarter >> zeros;

        if even < even_rev {
            buf.swap(even, even_rev);
            buf.swap(mask ^ even, mask ^ even_rev);
        }

        // odd partner of `even` reverses to `even_rev + half`
        buf.swap(even ^ 1, even_rev ^ half);
    }
}

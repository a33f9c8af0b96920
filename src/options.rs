/// Tunables of the planner.
///
/// Creating a session without specifying options selects reasonable defaults for a 1 MiB cache.
///
/// You only need to tune these options if you are trying to squeeze maximum performance
/// out of a known hardware platform that you can benchmark at varying input sizes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Cache budget the decomposition planner tries to keep each node within
    pub cache_size_bytes: usize,
    /// Sizes up to this use the direct family; larger ones recurse
    pub direct_threshold: usize,
    /// Smallest perfect square handed to the six-step executor
    pub six_step_threshold: usize,
    /// Smallest perfect square handed to the eight-step executor
    pub eight_step_threshold: usize,
    /// Edge of the square tiles used by the blocked transposes of the eight-step executor
    pub transpose_block: usize,
}

/// Bytes of one `Complex<f64>`
const ELEMENT_BYTES: usize = 16;

const DEFAULT_CACHE_SIZE: usize = 1 << 20;
const DEFAULT_DIRECT_THRESHOLD: usize = 64;

impl Default for PlannerOptions {
    fn default() -> Self {
        Self::from_cache_size(DEFAULT_CACHE_SIZE)
    }
}

impl PlannerOptions {
    /// Derive every threshold from the size of the cache.
    ///
    /// Six-step starts once four cache-fulls of elements are transformed, eight-step at 64. The
    /// transpose tile is the largest square that keeps a quarter of the cache busy.
    pub fn from_cache_size(cache_size_bytes: usize) -> Self {
        let cache_elems = (cache_size_bytes / ELEMENT_BYTES).max(1);

        Self {
            cache_size_bytes,
            direct_threshold: DEFAULT_DIRECT_THRESHOLD,
            six_step_threshold: cache_elems.saturating_mul(4),
            eight_step_threshold: cache_elems.saturating_mul(64),
            transpose_block: integer_sqrt(cache_elems / 4).clamp(8, 64),
        }
    }

    #[must_use]
    pub fn with_cache_size(mut self, cache_size_bytes: usize) -> Self {
        self.cache_size_bytes = cache_size_bytes;
        self
    }

    #[must_use]
    pub fn with_direct_threshold(mut self, direct_threshold: usize) -> Self {
        self.direct_threshold = direct_threshold;
        self
    }

    #[must_use]
    pub fn with_six_step_threshold(mut self, six_step_threshold: usize) -> Self {
        self.six_step_threshold = six_step_threshold;
        self
    }

    #[must_use]
    pub fn with_eight_step_threshold(mut self, eight_step_threshold: usize) -> Self {
        self.eight_step_threshold = eight_step_threshold;
        self
    }

    #[must_use]
    pub fn with_transpose_block(mut self, transpose_block: usize) -> Self {
        self.transpose_block = transpose_block.max(1);
        self
    }
}

/// `floor(sqrt(n))`
pub(crate) fn integer_sqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut root = (n as f64).sqrt() as usize;
    while root.saturating_mul(root) > n {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }
    root
}

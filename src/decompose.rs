//! Recursive decomposition planner.
//!
//! A [`DecomposeStrategy`] is an arena of [`DecomposeNode`]s. An internal node of size `N` splits
//! its input into `radix` decimated sub-sequences of size `N / radix`, all of which have the same
//! shape, so every child slot of a node refers to one shared child node. The tree is therefore a
//! chain in memory even though it describes `radix` children per level, and both the twiddle buffer
//! and the engine walk it with a single running offset.

/// Index of a node inside a [`DecomposeStrategy`]
pub type NodeId = usize;

/// Size of the widest element the planner reasons about (`Complex<f64>`)
const ELEMENT_BYTES: usize = 16;

/// Power-of-two radices, most preferred first
const POW2_RADICES: [usize; 3] = [8, 4, 2];

/// Radices tried for sizes with no power-of-two factor
const ODD_RADICES: [usize; 2] = [5, 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposeNode {
    pub size: usize,
    /// `1` for leaves
    pub radix: usize,
    /// Equal to `size` for leaves
    pub sub_size: usize,
    /// `radix` entries, all naming the same shared child. Empty for leaves.
    pub children: Vec<NodeId>,
}

impl DecomposeNode {
    fn leaf(size: usize) -> Self {
        Self {
            size,
            radix: 1,
            sub_size: size,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// The node every child slot refers to, if any
    pub fn child(&self) -> Option<NodeId> {
        self.children.first().copied()
    }
}

/// Split tree for one transform size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposeStrategy {
    nodes: Vec<DecomposeNode>,
    root: NodeId,
}

struct Planner<'a> {
    codelet_sizes: &'a [usize],
    floor: usize,
    cache_size_bytes: usize,
}

impl Planner<'_> {
    fn is_leaf_size(&self, size: usize) -> bool {
        size <= 1 || size < self.floor || self.codelet_sizes.contains(&size)
    }

    fn choose_radix(&self, size: usize) -> Option<usize> {
        if self.is_leaf_size(size) {
            return None;
        }

        let dividing = POW2_RADICES.iter().copied().filter(|r| size % r == 0);
        let admissible: Vec<usize> = dividing.clone().filter(|r| size / r >= self.floor).collect();

        if let Some(&largest) = admissible.first() {
            let fits_in_cache = size.saturating_mul(ELEMENT_BYTES) <= self.cache_size_bytes;
            if fits_in_cache {
                if let Some(&exact) = admissible
                    .iter()
                    .find(|&&r| self.codelet_sizes.contains(&(size / r)))
                {
                    return Some(exact);
                }
            }
            return Some(largest);
        }

        if let Some(smallest) = dividing.last() {
            return Some(smallest);
        }

        ODD_RADICES
            .iter()
            .copied()
            .find(|r| size % r == 0 && size / r >= self.floor)
    }

    fn build(&self, size: usize, nodes: &mut Vec<DecomposeNode>) -> NodeId {
        let node = match self.choose_radix(size) {
            None => DecomposeNode::leaf(size),
            Some(radix) => {
                let sub_size = size / radix;
                let child = self.build(sub_size, nodes);
                DecomposeNode {
                    size,
                    radix,
                    sub_size,
                    children: vec![child; radix],
                }
            }
        };
        nodes.push(node);
        nodes.len() - 1
    }
}

impl DecomposeStrategy {
    /// Build the split tree for `size`.
    ///
    /// Nodes whose size is one of `codelet_sizes`, or smaller than all of them, become leaves. An
    /// empty `codelet_sizes` puts the floor at 1. `cache_size_bytes` only steers the radix choice.
    pub fn plan(size: usize, codelet_sizes: &[usize], cache_size_bytes: usize) -> Self {
        let planner = Planner {
            codelet_sizes,
            floor: codelet_sizes.iter().copied().min().unwrap_or(1),
            cache_size_bytes,
        };

        let mut nodes = Vec::new();
        let root = planner.build(size, &mut nodes);
        Self { nodes, root }
    }

    /// A single leaf, executed directly by a codelet or the generic kernel
    pub fn leaf(size: usize) -> Self {
        Self {
            nodes: vec![DecomposeNode::leaf(size)],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this strategy.
    pub fn node(&self, id: NodeId) -> &DecomposeNode {
        &self.nodes[id]
    }

    /// Transform size at the root
    pub fn size(&self) -> usize {
        self.nodes[self.root].size
    }

    /// Walk from the root down to the leaf.
    fn path(&self) -> impl Iterator<Item = &DecomposeNode> {
        std::iter::successors(Some(&self.nodes[self.root]), |node| {
            node.child().map(|id| &self.nodes[id])
        })
    }

    /// Number of internal levels; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.path().filter(|node| !node.is_leaf()).count()
    }

    /// Number of leaf transforms executed per call, counting every child slot.
    pub fn codelet_count(&self) -> usize {
        self.path().map(|node| node.radix).product()
    }

    /// Size of the (single, shared) leaf node
    pub fn leaf_size(&self) -> usize {
        self.path().last().map_or(0, |node| node.size)
    }

    /// Size of every leaf transform, with multiplicity. Sums to [`Self::size`].
    pub fn leaf_sizes(&self) -> Vec<usize> {
        vec![self.leaf_size(); self.codelet_count()]
    }

    /// Radices from the root downwards
    pub fn radix_path(&self) -> Vec<usize> {
        self.path()
            .filter(|node| !node.is_leaf())
            .map(|node| node.radix)
            .collect()
    }

    /// Length of the twiddle buffer built for this tree
    pub fn twiddle_len(&self) -> usize {
        self.path().map(|node| node.size).sum()
    }

    /// Scratch the engine needs: `2n` at the leaf and `n` more per internal level above it.
    pub fn scratch_len(&self) -> usize {
        self.path()
            .map(|node| if node.is_leaf() { 2 * node.size } else { node.size })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: usize = 1 << 20;
    const BUILTIN: [usize; 10] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

    #[test]
    fn codelet_sizes_are_leaves() {
        let strategy = DecomposeStrategy::plan(512, &BUILTIN, CACHE);
        assert!(strategy.node(strategy.root()).is_leaf());
        assert_eq!(strategy.depth(), 0);
        assert_eq!(strategy.codelet_count(), 1);
        assert_eq!(strategy.leaf_sizes(), vec![512]);
        assert_eq!(strategy.scratch_len(), 1024);
    }

    #[test]
    fn below_the_floor_is_a_leaf() {
        let strategy = DecomposeStrategy::plan(8, &[16, 32], CACHE);
        assert!(strategy.node(strategy.root()).is_leaf());
        assert_eq!(strategy.size(), 8);
    }

    #[test]
    fn radix_2_when_only_half_reaches_the_floor() {
        let strategy = DecomposeStrategy::plan(1024, &[512], CACHE);
        let root = strategy.node(strategy.root());
        assert_eq!(root.radix, 2);
        assert_eq!(root.sub_size, 512);
        assert_eq!(root.num_children(), 2);
        assert_eq!(strategy.depth(), 1);
        assert_eq!(strategy.leaf_sizes(), vec![512, 512]);
    }

    #[test]
    fn prefers_radix_8() {
        let strategy = DecomposeStrategy::plan(4096, &[64], 0);
        assert_eq!(strategy.radix_path(), vec![8, 8]);
        assert_eq!(strategy.leaf_size(), 64);
        assert_eq!(strategy.codelet_count(), 8 * 8);
    }

    #[test]
    fn in_cache_nodes_prefer_exact_codelet_sizes() {
        let greedy = DecomposeStrategy::plan(2048, &[128, 1024], 0);
        assert_eq!(greedy.radix_path(), vec![8, 2]);
        let exact = DecomposeStrategy::plan(2048, &[128, 1024], CACHE);
        assert_eq!(exact.radix_path(), vec![2]);

        let strategy = DecomposeStrategy::plan(4096, &[16, 1024], CACHE);
        assert_eq!(strategy.radix_path(), vec![4]);
        assert_eq!(strategy.leaf_size(), 1024);

        let out_of_cache = DecomposeStrategy::plan(4096, &[16, 1024], 0);
        assert_eq!(out_of_cache.radix_path()[0], 8);
        assert_eq!(out_of_cache.leaf_sizes().iter().sum::<usize>(), 4096);
    }

    #[test]
    fn odd_sizes_split_by_5_then_3() {
        let strategy = DecomposeStrategy::plan(75, &[2, 4, 8], CACHE);
        assert_eq!(strategy.radix_path(), vec![5, 5]);
        assert_eq!(strategy.leaf_size(), 3);

        let strategy = DecomposeStrategy::plan(27, &[2, 4, 8], CACHE);
        assert_eq!(strategy.radix_path(), vec![3, 3]);
        assert_eq!(strategy.leaf_size(), 3);

        let prime = DecomposeStrategy::plan(97, &[2, 4, 8], CACHE);
        assert_eq!(prime.depth(), 0);
    }

    #[test]
    fn mixed_sizes_take_the_smallest_power_of_two_radix_below_the_floor() {
        // 48 / 8 = 6 and 48 / 4 = 12 are below the floor of 16, 48 / 2 = 24 is not a codelet
        let strategy = DecomposeStrategy::plan(48, &[16, 32], CACHE);
        assert_eq!(strategy.radix_path()[0], 2);
        assert_eq!(strategy.leaf_sizes().iter().sum::<usize>(), 48);
    }

    #[test]
    fn depth_and_leaf_sum_properties() {
        for log_floor in 1..6 {
            let floor = 1usize << log_floor;
            for log_n in log_floor..20 {
                let n = 1usize << log_n;
                let strategy = DecomposeStrategy::plan(n, &[floor], CACHE);
                let log_ratio: usize = log_n - log_floor;

                assert_eq!(strategy.leaf_sizes().iter().sum::<usize>(), n);
                assert_eq!(strategy.leaf_size(), floor);
                // ceil(log_8(n / floor)) <= depth <= log_2(n / floor)
                assert!(strategy.depth() >= log_ratio.div_ceil(3));
                assert!(strategy.depth() <= log_ratio);
                assert_eq!(strategy.radix_path().iter().product::<usize>() * floor, n);
            }
        }
    }

    #[test]
    fn empty_codelet_list_floors_at_one() {
        let strategy = DecomposeStrategy::plan(64, &[], CACHE);
        assert_eq!(strategy.radix_path(), vec![8, 8]);
        assert_eq!(strategy.leaf_size(), 1);
    }

    #[test]
    fn twiddle_and_scratch_lengths_follow_the_path() {
        let strategy = DecomposeStrategy::plan(1 << 12, &[64], 0);
        // 4096 -> 512 -> 64
        assert_eq!(strategy.twiddle_len(), 4096 + 512 + 64);
        assert_eq!(strategy.scratch_len(), 4096 + 512 + 128);
    }
}

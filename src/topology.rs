//! Shape arithmetic for the perfect K-ary indicator tree.
//!
//! The tree is embedded level-order in one array: index 0 is the root, the
//! parent of node `i >= 1` is `(i - 1) / K`, and the leaves occupy the last
//! `K^H` indices. [`Topology`] fixes the shape at construction and answers
//! every index question the operations need; nothing in it mutates
//! afterwards.
//!
//! # Thread assignment
//!
//! Threads are mapped to leaves in linear blocks: with `T` threads and `L`
//! leaves, each leaf serves `ceil(T / L)` consecutive thread ids. Packing
//! several threads onto one leaf is deliberate. A leaf serving a single
//! thread would forward every zero transition straight to its parent and
//! concentrate contention there instead of absorbing it.

use thiserror::Error;

/// Practical ceiling on `K^(H+1)`: shapes past this are rejected rather
/// than silently overflowing the index arithmetic.
pub const MAX_TREE_WEIGHT: u64 = 1 << 32;

/// Shape parameters rejected by [`Topology::new`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    /// The arity `K` must be at least 2.
    #[error("tree arity must be at least 2, got {0}")]
    ArityTooSmall(usize),

    /// `K^(H+1)` exceeds [`MAX_TREE_WEIGHT`].
    #[error("K^(H+1) for K={arity}, H={height} exceeds the supported maximum of 2^32 nodes")]
    TreeTooLarge {
        /// Requested arity.
        arity: usize,
        /// Requested height.
        height: u32,
    },
}

/// Immutable shape of a perfect K-ary indicator tree for `T` threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    arity: usize,
    height: u32,
    thread_count: usize,
    node_count: usize,
    leaf_count: usize,
    threads_per_leaf: usize,
}

impl Topology {
    /// Validate `(K, H, T)` and derive the node counts and the thread→leaf
    /// assignment.
    ///
    /// # Errors
    ///
    /// [`TopologyError::ArityTooSmall`] when `arity < 2`, and
    /// [`TopologyError::TreeTooLarge`] when `K^(H+1)` exceeds
    /// [`MAX_TREE_WEIGHT`].
    pub fn new(arity: usize, height: u32, thread_count: usize) -> Result<Self, TopologyError> {
        if arity < 2 {
            return Err(TopologyError::ArityTooSmall(arity));
        }

        let weight = match pow_checked(arity as u64, height + 1) {
            Some(weight) if weight <= MAX_TREE_WEIGHT => weight,
            _ => return Err(TopologyError::TreeTooLarge { arity, height }),
        };

        let node_count = ((weight - 1) / (arity as u64 - 1)) as usize;
        let leaf_count = pow(arity, height);

        // ceil(T / L), floored at one thread per leaf so the map stays
        // total for T = 0.
        let threads_per_leaf = thread_count.div_ceil(leaf_count).max(1);

        Ok(Self {
            arity,
            height,
            thread_count,
            node_count,
            leaf_count,
            threads_per_leaf,
        })
    }

    /// The arity `K`.
    #[inline]
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// The height `H`. A height of 0 collapses the tree to its root.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The thread count `T` the shape was sized for.
    #[inline]
    #[must_use]
    pub const fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Total node count `(K^(H+1) - 1) / (K - 1)`, root included.
    #[inline]
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Leaf count `K^H`.
    #[inline]
    #[must_use]
    pub const fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Index of the first leaf in the level-order array.
    #[inline]
    #[must_use]
    pub const fn leaf_offset(&self) -> usize {
        self.node_count - self.leaf_count
    }

    /// Number of consecutive thread ids sharing one leaf.
    #[inline]
    #[must_use]
    pub const fn threads_per_leaf(&self) -> usize {
        self.threads_per_leaf
    }

    /// Parent index of node `index`.
    ///
    /// The root has no parent; `index` must be at least 1.
    #[inline]
    #[must_use]
    pub const fn parent_of(&self, index: usize) -> usize {
        debug_assert!(index >= 1, "the root has no parent");
        (index - 1) / self.arity
    }

    /// The leaf where thread `tid` performs its arrive/depart operations.
    ///
    /// For a height-0 tree this is index 0: the root doubles as the only
    /// leaf and the operations go to it directly.
    #[inline]
    #[must_use]
    pub const fn leaf_of(&self, tid: usize) -> usize {
        self.leaf_offset() + (tid / self.threads_per_leaf) % self.leaf_count
    }
}

/// `base^exp` by iterated multiplication. Callers guarantee the result
/// fits; shapes are validated against [`MAX_TREE_WEIGHT`] up front.
#[must_use]
pub const fn pow(base: usize, exp: u32) -> usize {
    let mut result: usize = 1;
    let mut i = 0;
    while i < exp {
        result *= base;
        i += 1;
    }
    result
}

/// Total node count of a perfect K-ary tree of height `height`.
#[must_use]
pub const fn node_count(arity: usize, height: u32) -> usize {
    (pow(arity, height + 1) - 1) / (arity - 1)
}

/// Leaf count of a perfect K-ary tree of height `height`.
#[must_use]
pub const fn leaf_count(arity: usize, height: u32) -> usize {
    pow(arity, height)
}

const fn pow_checked(base: u64, exp: u32) -> Option<u64> {
    let mut result: u64 = 1;
    let mut i = 0;
    while i < exp {
        result = match result.checked_mul(base) {
            Some(next) => next,
            None => return None,
        };
        i += 1;
    }
    Some(result)
}

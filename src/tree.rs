//! The indicator tree and its three public variants.
//!
//! [`SnziTree`] owns the root plus a level-order array of non-root nodes
//! and routes every operation: `arrive(tid)` and `depart(tid)` resolve the
//! thread's leaf through the [`Topology`] and run the node protocol there,
//! `query()` is a single atomic load of the root counter. The variants
//! differ only in the contention policy plugged into the nodes:
//!
//! - [`NoContentionSnzi`]: bare propagation on every zero transition.
//! - [`SemiContentionSnzi`]: announce-gated propagation that collapses
//!   duplicate parent traffic during transitions.
//! - [`FullContentionSnzi`]: announce-gated tree plus a direct-root fast
//!   path; threads escalate onto the tree permanently once the root CAS
//!   contends.

use crate::node::{AnnounceGate, Announced, Bare, ContentionStatus, RootNode, SnziNode};
use crate::topology::{Topology, TopologyError};

// ============================================================================
//  Generic core
// ============================================================================

/// A perfect K-ary tree of surplus counters with policy `G` at every
/// non-root node.
#[derive(Debug)]
pub(crate) struct SnziTree<G: AnnounceGate> {
    root: RootNode,
    /// Level-order node array. Slot 0 is never touched (the root lives in
    /// its own field); keeping it makes node indices coincide with their
    /// level-order positions, so `parent_of` needs no offset fixups.
    nodes: Box<[SnziNode<G>]>,
    shape: Topology,
}

impl<G: AnnounceGate> SnziTree<G> {
    pub(crate) fn new(
        arity: usize,
        height: u32,
        thread_count: usize,
    ) -> Result<Self, TopologyError> {
        let shape = Topology::new(arity, height, thread_count)?;

        let nodes = (0..shape.node_count())
            .map(|index| {
                let parent = if index == 0 { 0 } else { shape.parent_of(index) };
                SnziNode::new(parent)
            })
            .collect();

        Ok(Self {
            root: RootNode::new(),
            nodes,
            shape,
        })
    }

    /// Run an arrive at `index`, where 0 addresses the root.
    pub(crate) fn arrive_at(&self, index: usize) {
        if index == 0 {
            self.root.arrive();
        } else {
            self.nodes[index].arrive(self);
        }
    }

    /// Run a depart at `index`, where 0 addresses the root.
    pub(crate) fn depart_at(&self, index: usize) {
        if index == 0 {
            self.root.depart();
        } else {
            self.nodes[index].depart(self);
        }
    }

    fn arrive(&self, tid: usize) {
        debug_assert!(
            tid < self.shape.thread_count().max(1),
            "thread id {tid} out of range"
        );
        self.arrive_at(self.shape.leaf_of(tid));
    }

    fn depart(&self, tid: usize) {
        debug_assert!(
            tid < self.shape.thread_count().max(1),
            "thread id {tid} out of range"
        );
        self.depart_at(self.shape.leaf_of(tid));
    }

    fn query(&self) -> bool {
        self.root.query()
    }

    /// True when no presence is held anywhere: the root reads zero, every
    /// node counter is zero, and no announce flag is raised. Only
    /// meaningful with no operation in flight.
    fn is_quiescent(&self) -> bool {
        !self.query()
            && self
                .nodes
                .iter()
                .skip(1)
                .all(|node| node.surplus() == 0 && !node.is_announced())
    }

    fn root_arrive_directly(&self, status: &mut ContentionStatus) {
        self.root.arrive_directly(status);
    }

    fn root_depart_directly(&self, status: &mut ContentionStatus) {
        self.root.depart_directly(status);
    }
}

// ============================================================================
//  Public variants
// ============================================================================

/// Scalable nonzero indicator without contention mitigation.
///
/// Every zero transition at a node propagates to the parent immediately.
/// The cheapest variant when transitions are rare; under heavy churn on a
/// shared leaf the redundant propagation shows up at the parent.
#[derive(Debug)]
pub struct NoContentionSnzi {
    tree: SnziTree<Bare>,
}

impl NoContentionSnzi {
    /// Build an indicator shaped as a perfect `arity`-ary tree of height
    /// `height`, sized for `thread_count` threads.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] when `arity < 2` or the shape exceeds the
    /// supported node budget.
    pub fn new(
        arity: usize,
        height: u32,
        thread_count: usize,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            tree: SnziTree::new(arity, height, thread_count)?,
        })
    }

    /// Declare the presence of thread `tid`.
    ///
    /// `tid` must be in `[0, T)`, owned by exactly one live thread, and
    /// later matched by a [`depart`](Self::depart) on the same id.
    #[inline]
    pub fn arrive(&self, tid: usize) {
        self.tree.arrive(tid);
    }

    /// Retract a presence previously declared by [`arrive`](Self::arrive)
    /// on the same `tid`.
    #[inline]
    pub fn depart(&self, tid: usize) {
        self.tree.depart(tid);
    }

    /// Whether a surplus of arrives exists right now.
    ///
    /// Wait-free: one atomic load of the root counter.
    #[inline]
    #[must_use]
    pub fn query(&self) -> bool {
        self.tree.query()
    }

    /// Whether every counter in the tree is clear.
    ///
    /// Only meaningful when no operation is in flight; meant for
    /// tear-down assertions, not concurrent use.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.tree.is_quiescent()
    }

    /// The validated shape this indicator was built with.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.tree.shape
    }
}

/// Scalable nonzero indicator with announce-gated propagation.
///
/// Each node carries an announce flag raised for the duration of an upward
/// propagation. Arrivals that find the flag raised wait out a bounded spin
/// for the counter to leave zero instead of stacking a duplicate arrive on
/// the parent.
#[derive(Debug)]
pub struct SemiContentionSnzi {
    tree: SnziTree<Announced>,
}

impl SemiContentionSnzi {
    /// Build an indicator shaped as a perfect `arity`-ary tree of height
    /// `height`, sized for `thread_count` threads.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] when `arity < 2` or the shape exceeds the
    /// supported node budget.
    pub fn new(
        arity: usize,
        height: u32,
        thread_count: usize,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            tree: SnziTree::new(arity, height, thread_count)?,
        })
    }

    /// Declare the presence of thread `tid`.
    ///
    /// `tid` must be in `[0, T)`, owned by exactly one live thread, and
    /// later matched by a [`depart`](Self::depart) on the same id.
    #[inline]
    pub fn arrive(&self, tid: usize) {
        self.tree.arrive(tid);
    }

    /// Retract a presence previously declared by [`arrive`](Self::arrive)
    /// on the same `tid`.
    #[inline]
    pub fn depart(&self, tid: usize) {
        self.tree.depart(tid);
    }

    /// Whether a surplus of arrives exists right now.
    ///
    /// Wait-free: one atomic load of the root counter.
    #[inline]
    #[must_use]
    pub fn query(&self) -> bool {
        self.tree.query()
    }

    /// Whether every counter and announce flag in the tree is clear.
    ///
    /// Only meaningful when no operation is in flight.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.tree.is_quiescent()
    }

    /// The validated shape this indicator was built with.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.tree.shape
    }
}

/// Scalable nonzero indicator with announce gating and per-thread
/// escalation.
///
/// Threads start on a direct CAS fast path at the root; a thread whose
/// root CAS keeps failing switches to the tree permanently. Each thread
/// passes its own [`ContentionStatus`], initialized all-false and never
/// shared.
#[derive(Debug)]
pub struct FullContentionSnzi {
    tree: SnziTree<Announced>,
}

impl FullContentionSnzi {
    /// Build an indicator shaped as a perfect `arity`-ary tree of height
    /// `height`, sized for `thread_count` threads.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] when `arity < 2` or the shape exceeds the
    /// supported node budget.
    pub fn new(
        arity: usize,
        height: u32,
        thread_count: usize,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            tree: SnziTree::new(arity, height, thread_count)?,
        })
    }

    /// Declare the presence of thread `tid`.
    ///
    /// Routes through the direct-root fast path until `status` has been
    /// escalated, then through the tree. `status` must be the private
    /// status of the calling thread.
    #[inline]
    pub fn arrive(&self, tid: usize, status: &mut ContentionStatus) {
        if !status.uses_tree_in_arrive() {
            self.tree.root_arrive_directly(status);
            return;
        }
        self.tree.arrive(tid);
    }

    /// Retract a presence previously declared by
    /// [`arrive`](Self::arrive) with the same `tid` and `status`.
    #[inline]
    pub fn depart(&self, tid: usize, status: &mut ContentionStatus) {
        if !status.uses_tree_in_depart() {
            self.tree.root_depart_directly(status);
            return;
        }
        self.tree.depart(tid);
    }

    /// Whether a surplus of arrives exists right now.
    ///
    /// Wait-free: one atomic load of the root counter.
    #[inline]
    #[must_use]
    pub fn query(&self) -> bool {
        self.tree.query()
    }

    /// Whether every counter and announce flag in the tree is clear.
    ///
    /// Only meaningful when no operation is in flight.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.tree.is_quiescent()
    }

    /// The validated shape this indicator was built with.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.tree.shape
    }
}

// ============================================================================
//  Tests
// ============================================================================

//! Node-level arrive/depart protocols.
//!
//! The tree has two node kinds. The root holds the only counter `query`
//! ever reads, so its operations are plain fetch-add/fetch-sub. Every
//! other node counts the surplus of its own subtree lazily: the first
//! arrive that lifts the counter off zero propagates one arrive to the
//! parent, and the depart that drops it back to zero propagates one
//! depart. At any instant a subtree holds at most one presence
//! announcement at its parent.
//!
//! # Concurrency Model
//!
//! Arrive on a non-root node is a CAS loop. A thread that observes zero
//! first raises the parent, then tries to install `1`; if another thread
//! won the race and the counter is already nonzero by the time the CAS
//! succeeds, the loser retracts its duplicate announcement with one
//! compensating parent depart. Depart decrements by CAS and propagates
//! exactly when it takes the counter from 1 to 0.
//!
//! The contention-handling variants thread an [`AnnounceGate`] through the
//! same loop: a per-node flag marks an upward propagation in flight, and
//! arrivals that observe it wait briefly for the counter to leave zero
//! instead of stacking redundant parent traffic.

use std::sync::atomic::{AtomicBool, AtomicU64};

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::ordering::{ANNOUNCE_ORD, CAS_FAILURE, COUNTER_LOAD, COUNTER_RMW, QUERY_ORD};
use crate::tree::SnziTree;

/// CAS failures within a single direct root arrive that flip the calling
/// thread onto the tree path for all subsequent operations.
pub const ESCALATION_FAILURE_LIMIT: u32 = 5;

/// Number of counter re-checks an arrival performs while another thread's
/// announcement is in flight, before announcing anyway.
pub const ANNOUNCE_SPIN_BUDGET: u32 = 16;

// ============================================================================
//  ContentionStatus
// ============================================================================

/// Per-thread routing state for [`FullContentionSnzi`].
///
/// Every thread starts on the direct-root fast path. When a single arrive
/// accumulates [`ESCALATION_FAILURE_LIMIT`] CAS failures at the root, the
/// status is marked, and the next depart promotes the thread onto the tree
/// path permanently. Escalation is one-way: a thread that once contended
/// is assumed to keep contending.
///
/// The status belongs to exactly one thread and is never shared.
///
/// [`FullContentionSnzi`]: crate::FullContentionSnzi
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentionStatus {
    tree_arrive: bool,
    tree_depart: bool,
    escalate: bool,
}

impl ContentionStatus {
    /// A fresh status on the direct-root fast path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree_arrive: false,
            tree_depart: false,
            escalate: false,
        }
    }

    /// Whether arrives for this thread go through the tree.
    #[inline]
    #[must_use]
    pub const fn uses_tree_in_arrive(&self) -> bool {
        self.tree_arrive
    }

    /// Whether departs for this thread go through the tree.
    #[inline]
    #[must_use]
    pub const fn uses_tree_in_depart(&self) -> bool {
        self.tree_depart
    }

    /// Whether root contention has been recorded but the switch to the
    /// tree path has not happened yet. It takes effect at the next depart,
    /// so the in-flight arrive/depart pair finishes on the path it started
    /// on.
    #[inline]
    #[must_use]
    pub const fn escalation_pending(&self) -> bool {
        self.escalate
    }

    /// A status already promoted onto the tree path.
    ///
    ///  WARN: ONLY FOR TESTING.
    #[cfg(test)]
    pub(crate) const fn tree_routed() -> Self {
        Self {
            tree_arrive: true,
            tree_depart: true,
            escalate: true,
        }
    }

    fn record_contention(&mut self) {
        self.escalate = true;
    }

    fn promote_if_pending(&mut self) {
        if self.escalate {
            self.tree_arrive = true;
            self.tree_depart = true;
        }
    }
}

// ============================================================================
//  Root node
// ============================================================================

/// The distinguished top node. Its counter is the sole source of truth
/// for `query`.
#[derive(Debug)]
pub(crate) struct RootNode {
    surplus: CachePadded<AtomicU64>,
}

impl RootNode {
    pub(crate) fn new() -> Self {
        Self {
            surplus: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub(crate) fn arrive(&self) {
        self.surplus.fetch_add(1, COUNTER_RMW);
    }

    #[inline]
    pub(crate) fn depart(&self) {
        self.surplus.fetch_sub(1, COUNTER_RMW);
    }

    #[inline]
    pub(crate) fn query(&self) -> bool {
        self.surplus.load(QUERY_ORD) != 0
    }

    #[cfg(test)]
    pub(crate) fn surplus(&self) -> u64 {
        self.surplus.load(COUNTER_LOAD)
    }

    /// Fast-path arrive: CAS-increment under backoff, counting failures.
    /// A call that fails [`ESCALATION_FAILURE_LIMIT`] or more times records
    /// the contention in `status`.
    pub(crate) fn arrive_directly(&self, status: &mut ContentionStatus) {
        let mut backoff = Backoff::new();
        let mut failures: u32 = 0;
        let mut observed = self.surplus.load(COUNTER_LOAD);

        while let Err(value) =
            self.surplus
                .compare_exchange_weak(observed, observed + 1, COUNTER_RMW, CAS_FAILURE)
        {
            observed = value;
            failures += 1;
            backoff.backoff();
        }

        if failures >= ESCALATION_FAILURE_LIMIT {
            status.record_contention();
        }
    }

    /// Fast-path depart. Promotes the thread onto the tree path when a
    /// preceding [`arrive_directly`](Self::arrive_directly) recorded
    /// contention.
    pub(crate) fn depart_directly(&self, status: &mut ContentionStatus) {
        self.depart();
        status.promote_if_pending();
    }
}

// ============================================================================
//  Announce gates
// ============================================================================

/// Contention policy threaded through the non-root arrive/depart loops.
///
/// Two strategies exist: [`Bare`] propagates every zero transition
/// immediately, [`Announced`] gates propagation behind a per-node flag
/// that collapses duplicate announcements while one is in flight.
pub(crate) trait AnnounceGate: Default + Send + Sync {
    /// Decide whether the caller should raise the parent for a counter it
    /// observed at zero. May re-read `counter` into `observed` while
    /// waiting out another thread's in-flight announcement; returns false
    /// when the wait saw the counter leave zero, in which case no parent
    /// arrive is owed.
    fn claim(&self, counter: &AtomicU64, observed: &mut u64) -> bool;

    /// Called in the depart loop on observing a counter value of 1,
    /// before the decrement that takes it to zero becomes visible.
    fn retract(&self);

    /// CAS flavor for the depart loop. [`Bare`] tolerates spurious
    /// failures; [`Announced`] must not fail spuriously at 1, or the flag
    /// would be stored twice.
    fn depart_compare_exchange(counter: &AtomicU64, current: u64, new: u64)
    -> Result<u64, u64>;

    /// Whether an announcement is currently held. Quiescence checks only.
    fn is_announced(&self) -> bool;
}

/// No contention handling: claim always succeeds, departs use weak CAS.
#[derive(Debug, Default)]
pub(crate) struct Bare;

impl AnnounceGate for Bare {
    #[inline]
    fn claim(&self, _counter: &AtomicU64, _observed: &mut u64) -> bool {
        true
    }

    #[inline]
    fn retract(&self) {}

    #[inline]
    fn depart_compare_exchange(
        counter: &AtomicU64,
        current: u64,
        new: u64,
    ) -> Result<u64, u64> {
        counter.compare_exchange_weak(current, new, COUNTER_RMW, CAS_FAILURE)
    }

    #[inline]
    fn is_announced(&self) -> bool {
        false
    }
}

/// Announce-gated propagation for the contention-handling variants.
///
/// The flag lives on its own cache line, away from the counter it guards.
#[derive(Debug, Default)]
pub(crate) struct Announced {
    flag: CachePadded<AtomicBool>,
}

impl AnnounceGate for Announced {
    fn claim(&self, counter: &AtomicU64, observed: &mut u64) -> bool {
        if self.flag.load(ANNOUNCE_ORD) {
            // Another thread is announcing this subtree right now. Give its
            // counter store a bounded window to land before adding parent
            // traffic of our own.
            let mut backoff = Backoff::new();
            for _ in 0..ANNOUNCE_SPIN_BUDGET {
                *observed = counter.load(COUNTER_LOAD);
                if *observed != 0 {
                    return false;
                }
                backoff.backoff();
            }
        }

        self.flag.store(true, ANNOUNCE_ORD);
        true
    }

    #[inline]
    fn retract(&self) {
        self.flag.store(false, ANNOUNCE_ORD);
    }

    #[inline]
    fn depart_compare_exchange(
        counter: &AtomicU64,
        current: u64,
        new: u64,
    ) -> Result<u64, u64> {
        // Strong CAS: a spurious failure at current == 1 would route the
        // loop through retract() a second time.
        counter.compare_exchange(current, new, COUNTER_RMW, CAS_FAILURE)
    }

    #[inline]
    fn is_announced(&self) -> bool {
        self.flag.load(ANNOUNCE_ORD)
    }
}

// ============================================================================
//  Non-root node
// ============================================================================

/// A non-root tree node: a lazily propagated subtree surplus counter plus
/// the gate state of the active contention policy.
///
/// Parenthood is an index into the tree's node array (index 0 meaning the
/// root), fixed at construction. Node operations borrow the owning tree to
/// reach the parent; nodes never point at each other.
#[derive(Debug)]
pub(crate) struct SnziNode<G: AnnounceGate> {
    surplus: CachePadded<AtomicU64>,
    gate: G,
    parent: usize,
}

impl<G: AnnounceGate> SnziNode<G> {
    pub(crate) fn new(parent: usize) -> Self {
        Self {
            surplus: CachePadded::new(AtomicU64::new(0)),
            gate: G::default(),
            parent,
        }
    }

    /// Increment the subtree surplus, announcing the zero transition to
    /// the parent.
    pub(crate) fn arrive(&self, tree: &SnziTree<G>) {
        let mut raised_parent = false;
        let mut observed = self.surplus.load(COUNTER_LOAD);

        loop {
            if observed == 0
                && !raised_parent
                && self.gate.claim(&self.surplus, &mut observed)
            {
                tree.arrive_at(self.parent);
                raised_parent = true;
            }

            match self.surplus.compare_exchange_weak(
                observed,
                observed + 1,
                COUNTER_RMW,
                CAS_FAILURE,
            ) {
                Ok(_) => break,
                Err(value) => observed = value,
            }
        }

        // We raised the parent for a zero counter, but a concurrent arrive
        // beat our increment: the subtree now holds two announcements, so
        // hand one back.
        if raised_parent && observed != 0 {
            tree.depart_at(self.parent);
        }
    }

    /// Decrement the subtree surplus, retracting the announcement from the
    /// parent on the 1 → 0 transition.
    pub(crate) fn depart(&self, tree: &SnziTree<G>) {
        let mut observed = self.surplus.load(COUNTER_LOAD);

        loop {
            debug_assert!(observed > 0, "depart without a matching arrive");

            if observed == 1 {
                self.gate.retract();
            }

            match G::depart_compare_exchange(&self.surplus, observed, observed - 1) {
                Ok(_) => break,
                Err(value) => observed = value,
            }
        }

        if observed == 1 {
            tree.depart_at(self.parent);
        }
    }

    /// Current subtree surplus. Quiescence checks only.
    pub(crate) fn surplus(&self) -> u64 {
        self.surplus.load(COUNTER_LOAD)
    }

    /// Whether this node currently holds an announcement at its parent.
    pub(crate) fn is_announced(&self) -> bool {
        self.gate.is_announced()
    }
}

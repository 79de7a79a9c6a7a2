//! # SNZI
//!
//! A Scalable NonZero Indicator: a concurrent object answering "is there
//! currently a surplus of arrive operations over depart operations?"
//! without funneling every thread through one hot counter.
//!
//! The indicator is a perfect K-ary tree of cache-padded atomic counters.
//! Threads arrive and depart at an assigned leaf; only the transitions of
//! a subtree between zero and nonzero propagate toward the root, so under
//! load most operations touch nothing but their own leaf's cache line.
//! `query` reads a single counter, the root's, and is wait-free.
//!
//! ## Variants
//!
//! Three variants share the tree and differ in contention mitigation:
//!
//! - [`NoContentionSnzi`] propagates every zero transition immediately.
//! - [`SemiContentionSnzi`] gates propagation behind a per-node announce
//!   flag that collapses duplicate parent traffic during transitions.
//! - [`FullContentionSnzi`] adds a direct CAS fast path at the root;
//!   threads that contend there escalate onto the tree permanently,
//!   tracked by a private per-thread [`ContentionStatus`].
//!
//! ## Contract
//!
//! Thread ids are dense in `[0, T)`, one per live thread, and every
//! `depart(tid)` must be preceded by a matching completed `arrive(tid)`.
//! The structure does not detect misuse; debug builds assert.
//!
//! ## Example
//!
//! ```rust
//! use snzi::SemiContentionSnzi;
//!
//! let snzi = SemiContentionSnzi::new(2, 1, 4)?;
//!
//! snzi.arrive(0);
//! assert!(snzi.query());
//!
//! snzi.depart(0);
//! assert!(!snzi.query());
//! # Ok::<(), snzi::TopologyError>(())
//! ```

pub mod backoff;
mod node;
mod ordering;
pub mod stamped;
pub mod topology;
mod tree;

#[cfg(all(test, feature = "shuttle"))]
mod shuttle_tests;

pub use node::{ANNOUNCE_SPIN_BUDGET, ContentionStatus, ESCALATION_FAILURE_LIMIT};
pub use topology::{Topology, TopologyError};
pub use tree::{FullContentionSnzi, NoContentionSnzi, SemiContentionSnzi};

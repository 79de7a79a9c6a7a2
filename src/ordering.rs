//! Standard memory orderings for the arrive/depart protocols.
//!
//! These constants ensure consistent ordering usage across the codebase
//! and make the intent clear at each access point. The whole structure
//! runs sequentially consistent: an arrive whose propagation reaches the
//! root must be visible to every later `query`, and `SeqCst` everywhere is
//! the simplest discipline that guarantees it. Relaxing the interior
//! counters to acquire-release is possible but requires re-proving the
//! root linearization argument first.

use std::sync::atomic::Ordering;

/// Ordering for read-modify-write on node and root counters
/// (fetch-add, fetch-sub, CAS success).
pub const COUNTER_RMW: Ordering = Ordering::SeqCst;

/// Ordering for plain loads of a node counter inside a retry loop.
pub const COUNTER_LOAD: Ordering = Ordering::SeqCst;

/// Ordering observed on CAS failure.
pub const CAS_FAILURE: Ordering = Ordering::SeqCst;

/// Ordering for loads and stores of an announce flag.
pub const ANNOUNCE_ORD: Ordering = Ordering::SeqCst;

/// Ordering for the root load behind `query`.
/// Must observe every arrive whose root propagation completed before it.
pub const QUERY_ORD: Ordering = Ordering::SeqCst;

//! Property-based tests for the tree shape arithmetic.
//!
//! These verify the indexing identities for all generated shapes: every
//! thread lands on a leaf, every leaf chains to the root in exactly H
//! parent steps, and the closed-form node counts match first principles.

use proptest::prelude::*;
use snzi::topology::{Topology, leaf_count, node_count};

// ============================================================================
//  Strategies
// ============================================================================

/// Shapes kept small enough that exhaustive per-shape walks stay cheap:
/// arity 2..=8, height 0..=4, threads 1..=128.
fn shape() -> impl Strategy<Value = (usize, u32, usize)> {
    (2usize..=8, 0u32..=4, 1usize..=128)
}

// ============================================================================
//  Closed forms
// ============================================================================

proptest! {
    #[test]
    fn node_count_matches_level_sum((arity, height, _) in shape()) {
        // Sum the levels directly: K^0 + K^1 + ... + K^H.
        let mut level_sum = 0usize;
        let mut level_width = 1usize;
        for _ in 0..=height {
            level_sum += level_width;
            level_width *= arity;
        }

        prop_assert_eq!(node_count(arity, height), level_sum);
    }

    #[test]
    fn leaf_count_is_the_last_level((arity, height, _) in shape()) {
        let mut width = 1usize;
        for _ in 0..height {
            width *= arity;
        }

        prop_assert_eq!(leaf_count(arity, height), width);
    }

    #[test]
    fn counts_are_consistent((arity, height, threads) in shape()) {
        let shape = Topology::new(arity, height, threads).unwrap();

        prop_assert_eq!(shape.node_count(), node_count(arity, height));
        prop_assert_eq!(shape.leaf_count(), leaf_count(arity, height));
        prop_assert!(shape.threads_per_leaf() >= 1);
        prop_assert_eq!(
            shape.leaf_offset(),
            shape.node_count() - shape.leaf_count()
        );
    }
}

// ============================================================================
//  Thread → leaf assignment
// ============================================================================

proptest! {
    #[test]
    fn every_thread_lands_on_a_leaf((arity, height, threads) in shape()) {
        let shape = Topology::new(arity, height, threads).unwrap();

        for tid in 0..threads {
            let leaf = shape.leaf_of(tid);
            prop_assert!(leaf >= shape.leaf_offset());
            prop_assert!(leaf < shape.node_count());
        }
    }

    #[test]
    fn assignment_is_deterministic((arity, height, threads) in shape()) {
        let first = Topology::new(arity, height, threads).unwrap();
        let second = Topology::new(arity, height, threads).unwrap();

        for tid in 0..threads {
            prop_assert_eq!(first.leaf_of(tid), second.leaf_of(tid));
        }
    }

    #[test]
    fn consecutive_ids_fill_leaves_in_blocks((arity, height, threads) in shape()) {
        let shape = Topology::new(arity, height, threads).unwrap();

        // Within one block of threads_per_leaf consecutive ids, the leaf
        // never changes.
        for tid in 0..threads {
            let block_start = tid - tid % shape.threads_per_leaf();
            prop_assert_eq!(shape.leaf_of(tid), shape.leaf_of(block_start));
        }
    }
}

// ============================================================================
//  Parenthood
// ============================================================================

proptest! {
    #[test]
    fn leaves_chain_to_root_in_height_steps((arity, height, threads) in shape()) {
        let shape = Topology::new(arity, height, threads).unwrap();

        for tid in 0..threads {
            let mut index = shape.leaf_of(tid);
            for _ in 0..height {
                prop_assert!(index >= 1);
                index = shape.parent_of(index);
                prop_assert!(index < shape.node_count());
            }
            prop_assert_eq!(index, 0);
        }
    }

    #[test]
    fn parents_precede_children((arity, height, threads) in shape()) {
        let shape = Topology::new(arity, height, threads).unwrap();

        // Level-order embedding: a parent index is always strictly
        // smaller than the child's.
        for index in 1..shape.node_count() {
            prop_assert!(shape.parent_of(index) < index);
        }
    }
}

// ============================================================================
//  Literal shape checks
// ============================================================================

#[test]
fn ternary_height_two_reference_values() {
    let shape = Topology::new(3, 2, 9).unwrap();

    assert_eq!(shape.node_count(), 13);
    assert_eq!(shape.leaf_count(), 9);
    assert_eq!(shape.leaf_of(0), 4);
    assert_eq!(shape.leaf_of(8), 12);
    assert_eq!(shape.parent_of(12), 3);
    assert_eq!(shape.parent_of(3), 0);
}

#[test]
fn binary_tree_reference_values() {
    assert_eq!(node_count(2, 0), 1);
    assert_eq!(node_count(2, 1), 3);
    assert_eq!(node_count(2, 2), 7);
    assert_eq!(leaf_count(4, 1), 4);
    assert_eq!(node_count(4, 1), 5);
}

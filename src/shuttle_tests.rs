//! Shuttle tests for whole-tree quiescence.
//!
//! Shuttle drives the real variant types through randomized thread
//! schedules. Unlike the loom models these run the actual tree code, so
//! they cover the facade routing and the announce gates as shipped.
//!
//! Run with: `cargo test --lib shuttle_tests --features shuttle`

use shuttle::sync::Arc;
use shuttle::thread;

use crate::{ContentionStatus, FullContentionSnzi, NoContentionSnzi, SemiContentionSnzi};

const SCHEDULES: usize = 500;

#[test]
fn bare_variant_reaches_quiescence() {
    shuttle::check_random(
        || {
            let snzi = Arc::new(NoContentionSnzi::new(2, 1, 3).unwrap());

            let handles: Vec<_> = (0..3)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    thread::spawn(move || {
                        for _ in 0..2 {
                            snzi.arrive(tid);
                            snzi.depart(tid);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert!(!snzi.query());
            assert!(snzi.is_quiescent());
        },
        SCHEDULES,
    );
}

#[test]
fn announce_variant_reaches_quiescence() {
    shuttle::check_random(
        || {
            let snzi = Arc::new(SemiContentionSnzi::new(2, 1, 4).unwrap());

            let handles: Vec<_> = (0..4)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    thread::spawn(move || {
                        snzi.arrive(tid);
                        snzi.depart(tid);
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert!(!snzi.query());
            assert!(snzi.is_quiescent());
        },
        SCHEDULES,
    );
}

#[test]
fn surplus_outlives_balanced_peers() {
    shuttle::check_random(
        || {
            let snzi = Arc::new(SemiContentionSnzi::new(2, 1, 2).unwrap());

            // Thread 1 balances its own visits; thread 0 leaves a surplus.
            let peer = {
                let snzi = Arc::clone(&snzi);
                thread::spawn(move || {
                    snzi.arrive(1);
                    snzi.depart(1);
                })
            };

            snzi.arrive(0);
            peer.join().unwrap();

            assert!(snzi.query());
            snzi.depart(0);
            assert!(!snzi.query());
            assert!(snzi.is_quiescent());
        },
        SCHEDULES,
    );
}

#[test]
fn full_variant_reaches_quiescence_on_both_paths() {
    shuttle::check_random(
        || {
            let snzi = Arc::new(FullContentionSnzi::new(2, 1, 2).unwrap());

            let handles: Vec<_> = (0..2)
                .map(|tid| {
                    let snzi = Arc::clone(&snzi);
                    thread::spawn(move || {
                        // Escalation is schedule-dependent; the status keeps
                        // each thread's routing coherent either way.
                        let mut status = ContentionStatus::new();
                        for _ in 0..3 {
                            snzi.arrive(tid, &mut status);
                            snzi.depart(tid, &mut status);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert!(!snzi.query());
            assert!(snzi.is_quiescent());
        },
        SCHEDULES,
    );
}

//! Concurrent readers and writers
//!
//! Readers walk snapshots while writer threads apply events. Every snapshot
//! a reader sees must be a complete permutation of the initial rules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use acl_reorder::rules::{DependencySet, ReorderEngine, ReorderPolicy, RuleId, RuleSpec};

const RULE_COUNT: u64 = 32;
const READER_COUNT: usize = 4;
const WRITER_EVENTS: usize = 5_000;

fn build_engine(policy: ReorderPolicy) -> Arc<ReorderEngine> {
    let specs = (0..RULE_COUNT)
        .map(|id| RuleSpec::new(id, 0.5 + (id % 5) as f64 * 0.1))
        .collect();
    let deps = DependencySet::from_pairs([(10, 9), (20, 19)]);
    Arc::new(ReorderEngine::new(specs, deps, policy).unwrap())
}

fn is_permutation(order: &[RuleId]) -> bool {
    let mut seen = vec![false; RULE_COUNT as usize];
    order.len() == RULE_COUNT as usize
        && order.iter().all(|&id| {
            let slot = &mut seen[id as usize];
            !std::mem::replace(slot, true)
        })
}

#[test]
fn test_readers_see_whole_permutations() {
    for policy in [ReorderPolicy::adaptive(2.0, 50), ReorderPolicy::Positional] {
        let engine = build_engine(policy);
        let stop = Arc::new(AtomicBool::new(false));
        let start = Arc::new(Barrier::new(READER_COUNT + 1));

        let readers: Vec<_> = (0..READER_COUNT)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let stop = Arc::clone(&stop);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut last_version = 0;
                    let mut reads = 0u64;
                    while !stop.load(Ordering::Acquire) {
                        let snapshot = engine.load();
                        assert!(is_permutation(&snapshot.order()));
                        // Dependent pairs never cross.
                        assert!(snapshot.position_of(9) < snapshot.position_of(10));
                        assert!(snapshot.position_of(19) < snapshot.position_of(20));
                        assert!(snapshot.version() >= last_version);
                        last_version = snapshot.version();
                        reads += 1;
                    }
                    reads
                })
            })
            .collect();

        start.wait();
        for i in 0..WRITER_EVENTS {
            engine.on_match((i * 7 + i / 3) % RULE_COUNT as usize).unwrap();
        }
        stop.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(engine.stats().matches, WRITER_EVENTS as u64);
    }
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let engine = build_engine(ReorderPolicy::adaptive(2.0, 10));
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..1_000u64 {
                    engine.on_match_rule((i * 3 + w) % RULE_COUNT).unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    let stats = engine.stats();
    assert_eq!(stats.matches, 4_000);
    assert_eq!(stats.normalizations, 400);
    // Adaptive publishes once per event.
    assert_eq!(engine.version(), 4_000);
    assert!(is_permutation(&engine.current_order()));
}

#[test]
fn test_reports_match_their_counters() {
    for policy in [ReorderPolicy::adaptive(2.0, 50), ReorderPolicy::Positional] {
        let adaptive = matches!(policy, ReorderPolicy::Adaptive { .. });
        let engine = build_engine(policy);
        let stop = Arc::new(AtomicBool::new(false));
        let start = Arc::new(Barrier::new(READER_COUNT + 1));

        let readers: Vec<_> = (0..READER_COUNT)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let stop = Arc::clone(&stop);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut reads = 0u64;
                    while !stop.load(Ordering::Acquire) {
                        let report = engine.report();
                        // Adaptive events always update rule state; positional
                        // ones only when they swap.
                        if adaptive {
                            assert_eq!(report.version, report.stats.matches);
                        } else {
                            assert_eq!(report.version, report.stats.swaps);
                        }
                        let moved = report.stats.swaps + report.stats.blocked_by_dependency;
                        assert!(moved <= report.stats.matches);
                        reads += 1;
                    }
                    reads
                })
            })
            .collect();

        start.wait();
        for i in 0..WRITER_EVENTS {
            engine.on_match((i * 7 + i / 3) % RULE_COUNT as usize).unwrap();
        }
        stop.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
    }
}

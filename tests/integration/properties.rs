//! Ordering properties
//!
//! Each test feeds an engine a sequence of match events and checks a
//! property that must hold regardless of the sequence.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use acl_reorder::report::{PersistedAcl, RuleState};
use acl_reorder::rules::{
    expected_latency, normalize, swap_is_beneficial, DependencySet, ReorderEngine, ReorderPolicy,
    Rule, RuleId, RuleSpec,
};
use acl_reorder::EngineError;

// ============================================================================
// Helper Functions
// ============================================================================

fn unit_specs(n: u64) -> Vec<RuleSpec> {
    (1..=n).map(|id| RuleSpec::new(id, 1.0)).collect()
}

fn mixed_specs(n: u64) -> Vec<RuleSpec> {
    (1..=n)
        .map(|id| RuleSpec::new(id, 0.25 + (id % 4) as f64 * 0.25))
        .collect()
}

fn sorted(mut ids: Vec<RuleId>) -> Vec<RuleId> {
    ids.sort_unstable();
    ids
}

// ============================================================================
// Permutation invariant
// ============================================================================

#[test]
fn test_order_stays_a_permutation() {
    let policies = [ReorderPolicy::adaptive(2.0, 7), ReorderPolicy::Positional];
    for policy in policies {
        let deps = DependencySet::from_pairs([(3, 1), (6, 5)]);
        let engine = ReorderEngine::new(mixed_specs(8), deps, policy).unwrap();
        let initial = sorted(engine.current_order());
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..2_000 {
            engine.on_match(rng.gen_range(0..8)).unwrap();
            assert_eq!(sorted(engine.current_order()), initial, "policy {policy}");
        }
    }
}

// ============================================================================
// Dependency safety
// ============================================================================

#[test]
fn test_dependent_pair_keeps_relative_order() {
    let policies = [ReorderPolicy::adaptive(2.0, 5), ReorderPolicy::Positional];
    for policy in policies {
        // Rule 4 overlaps rule 3; they must never exchange places.
        let deps = DependencySet::builder().add(4, 3).build();
        let engine = ReorderEngine::new(unit_specs(5), deps, policy).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1_000 {
            // Mostly target the pair itself.
            let id = if rng.gen_bool(0.8) { 4 } else { rng.gen_range(1..=5) };
            engine.on_match_rule(id).unwrap();

            let p3 = engine.position_of(3).unwrap();
            let p4 = engine.position_of(4).unwrap();
            assert!(p3 < p4, "policy {policy}: order {:?}", engine.current_order());
        }
        assert!(engine.stats().blocked_by_dependency > 0);
    }
}

#[test]
fn test_dependency_is_checked_by_identity_after_moves() {
    // Matrix given over the initial order: rule 30 depends on rule 10.
    let ids = [10, 20, 30];
    let matrix = vec![vec![0, 0, 0], vec![0, 0, 0], vec![1, 0, 0]];
    let deps = DependencySet::from_matrix(&ids, &matrix).unwrap();
    let specs = ids.iter().map(|&id| RuleSpec::new(id, 1.0)).collect();
    let engine = ReorderEngine::new(specs, deps, ReorderPolicy::Positional).unwrap();

    // 30 passes 20, then sits behind 10 for good.
    assert!(engine.on_match(2).unwrap().swapped);
    assert_eq!(engine.current_order(), vec![10, 30, 20]);

    let outcome = engine.on_match(1).unwrap();
    assert!(!outcome.swapped);
    assert!(outcome.blocked_by_dependency);
    assert_eq!(engine.current_order(), vec![10, 30, 20]);

    // 20 is free to pass 30 again.
    assert!(engine.on_match(2).unwrap().swapped);
    assert_eq!(engine.current_order(), vec![10, 20, 30]);
}

// ============================================================================
// Normalization invariance
// ============================================================================

#[test]
fn test_normalization_preserves_swap_decisions() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let mut rules: Vec<Rule> = (0..6)
            .map(|id| {
                let spec = RuleSpec::new(id, rng.gen_range(0.1..5.0));
                Rule::with_hit_rate(spec, rng.gen_range(1e-3..1_000.0)).unwrap()
            })
            .collect();

        let before: Vec<bool> = rules
            .windows(2)
            .map(|w| swap_is_beneficial(&w[1], &w[0]))
            .collect();

        let log_sum = normalize(&mut rules).unwrap();
        assert!(log_sum.is_finite());

        let total: f64 = rules.iter().map(Rule::hit_rate).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let after: Vec<bool> = rules
            .windows(2)
            .map(|w| swap_is_beneficial(&w[1], &w[0]))
            .collect();
        assert_eq!(before, after);
    }
}

#[test]
fn test_periodic_normalization_bounds_hit_rates() {
    let engine = ReorderEngine::builder()
        .rules(unit_specs(4))
        .policy(ReorderPolicy::adaptive(2.0, 10))
        .build()
        .unwrap();

    for _ in 0..1_000 {
        engine.on_match_rule(4).unwrap();
    }

    let report = engine.report();
    assert_eq!(report.stats.normalizations, 100);
    let total: f64 = report.rules.iter().map(|r| r.hit_rate).sum();
    // Exactly normalized at the last event.
    assert!((total - 1.0).abs() < 1e-9);
    assert!(report.expected_latency.is_finite());
}

// ============================================================================
// Metric monotonicity under pure reinforcement
// ============================================================================

#[test]
fn test_reinforced_rule_moves_to_front() {
    // Normalizing after every event keeps `expected_latency` on one scale.
    let engine = ReorderEngine::new(
        unit_specs(5),
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 1),
    )
    .unwrap();

    let target = engine.current_order()[3];
    let mut position = 3;
    let mut latency = engine.expected_latency();

    for _ in 0..10 {
        engine.on_match(position).unwrap();

        let next = engine.position_of(target).unwrap();
        if position > 0 {
            assert_eq!(next, position - 1);
        } else {
            assert_eq!(next, 0);
        }
        position = next;

        let current = engine.expected_latency();
        assert!(current <= latency + 1e-12, "{current} > {latency}");
        latency = current;
    }

    assert_eq!(position, 0);
    assert_eq!(engine.current_order(), vec![4, 1, 2, 3, 5]);
}

#[test]
fn test_each_swap_lowers_latency_for_current_hit_rates() {
    // Unnormalized hit-rates grow with every match, so the raw metric may
    // rise between events. Against the hit-rates of one moment, though, the
    // new order must never cost more than the order it replaced.
    let engine = ReorderEngine::new(
        unit_specs(5),
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 100),
    )
    .unwrap();

    let initial = engine.expected_latency();
    for _ in 0..10 {
        let before = engine.current_order();
        engine.on_match_rule(4).unwrap();
        let after = engine.export_state();

        let rules_after: Vec<Rule> = after
            .rules
            .iter()
            .map(|r| Rule::with_log_hit_rate(r.spec(), r.log_hit_rate.unwrap()).unwrap())
            .collect();
        let rules_before: Vec<Rule> = before
            .iter()
            .map(|id| rules_after.iter().find(|r| r.id() == *id).unwrap().clone())
            .collect();

        assert!(expected_latency(&rules_after) <= expected_latency(&rules_before) + 1e-9);
    }

    assert_eq!(engine.current_order()[0], 4);
    assert!(engine.expected_latency() > initial);
}

#[test]
fn test_skewed_then_shifted_traffic_reorders() {
    let engine = ReorderEngine::new(
        vec![RuleSpec::new(1, 1.0), RuleSpec::new(2, 1.0)],
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 100),
    )
    .unwrap();

    for _ in 0..1_200 {
        engine.on_match_rule(1).unwrap();
    }
    let report = engine.report();
    assert_eq!(report.order, vec![1, 2]);
    assert!(report.rules[1].log_hit_rate.unwrap().is_finite());

    for _ in 0..100_000 {
        engine.on_match_rule(2).unwrap();
    }
    assert_eq!(engine.current_order(), vec![2, 1]);
    assert_eq!(engine.stats().swaps, 1);
}

#[test]
fn test_reinforced_rule_stops_at_dependency() {
    // Rule 4 overlaps rule 2, so it can pass 3 but never 2.
    let deps = DependencySet::from_pairs([(4, 2)]);
    let engine =
        ReorderEngine::new(unit_specs(5), deps, ReorderPolicy::adaptive(2.0, 1)).unwrap();

    for _ in 0..10 {
        engine.on_match_rule(4).unwrap();
    }

    assert_eq!(engine.current_order(), vec![1, 2, 4, 3, 5]);
    assert_eq!(engine.stats().swaps, 1);
    assert_eq!(engine.stats().blocked_by_dependency, 9);
}

// ============================================================================
// Positional statelessness
// ============================================================================

#[test]
fn test_positional_ignores_hit_rates() {
    let specs = mixed_specs(6);
    let deps = || DependencySet::from_pairs([(2, 1), (5, 6)]);

    let fresh = ReorderEngine::new(specs.clone(), deps(), ReorderPolicy::Positional).unwrap();

    // Same rules, wildly different stored hit-rates.
    let state = PersistedAcl {
        rules: specs
            .iter()
            .map(|s| RuleState {
                id: s.id,
                latency: s.latency,
                hit_rate: (s.id * s.id) as f64 * 1_000.0,
                log_hit_rate: None,
            })
            .collect(),
        dependencies: deps().sorted(),
    };
    let restored = ReorderEngine::restore(state, ReorderPolicy::Positional).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let position = rng.gen_range(0..6);
        let a = fresh.on_match(position).unwrap();
        let b = restored.on_match(position).unwrap();
        assert_eq!(a.swapped, b.swapped);
        assert_eq!(fresh.current_order(), restored.current_order());
    }

    // Positional never touches hit-rates.
    assert!(fresh.report().rules.iter().all(|r| r.hit_rate == 1.0));
}

// ============================================================================
// Concrete scenario
// ============================================================================

#[test]
fn test_three_rule_scenario() {
    let engine = ReorderEngine::new(
        unit_specs(3),
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 3),
    )
    .unwrap();
    assert_eq!(engine.current_order(), vec![1, 2, 3]);

    let outcome = engine.on_match(2).unwrap();
    assert!(outcome.swapped);
    assert_eq!(outcome.rule_id, 3);
    assert_eq!(engine.current_order(), vec![1, 3, 2]);
    assert!((engine.report().rules[1].hit_rate - 2.0).abs() < 1e-12);

    let outcome = engine.on_match(1).unwrap();
    assert!(outcome.swapped);
    assert_eq!(engine.current_order(), vec![3, 1, 2]);
    assert!((engine.report().rules[0].hit_rate - 4.0).abs() < 1e-12);

    // Third event triggers normalization: 8 + 1 + 1 = 10.
    let outcome = engine.on_match(0).unwrap();
    assert!(outcome.normalized);
    let rates: Vec<f64> = engine.report().rules.iter().map(|r| r.hit_rate).collect();
    assert!((rates[0] - 0.8).abs() < 1e-12);
    assert!((rates[1] - 0.1).abs() < 1e-12);
    assert!((rates[2] - 0.1).abs() < 1e-12);
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_out_of_range_leaves_state_unchanged() {
    let engine = ReorderEngine::new(
        unit_specs(3),
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 3),
    )
    .unwrap();
    engine.on_match(2).unwrap();
    let before = engine.export_state();
    let version = engine.version();

    let err = engine.on_match(99).unwrap_err();
    assert_eq!(err, EngineError::OutOfRange { position: 99, len: 3 });
    assert!(err.is_recoverable());

    assert_eq!(engine.export_state(), before);
    assert_eq!(engine.version(), version);
    assert_eq!(engine.stats().rejected, 1);
}

#[test]
fn test_invalid_construction_rejected() {
    let bad_latency = ReorderEngine::new(
        vec![RuleSpec::new(1, 1.0), RuleSpec::new(2, 0.0)],
        DependencySet::empty(),
        ReorderPolicy::default(),
    );
    assert!(matches!(bad_latency, Err(EngineError::Configuration(_))));

    let bad_theta = ReorderEngine::new(
        unit_specs(2),
        DependencySet::empty(),
        ReorderPolicy::adaptive(1.0, 10),
    );
    assert!(matches!(bad_theta, Err(EngineError::Configuration(_))));

    let bad_window = ReorderEngine::new(
        unit_specs(2),
        DependencySet::empty(),
        ReorderPolicy::adaptive(2.0, 0),
    );
    assert!(matches!(bad_window, Err(EngineError::Configuration(_))));

    let duplicate = ReorderEngine::new(
        vec![RuleSpec::new(1, 1.0), RuleSpec::new(1, 2.0)],
        DependencySet::empty(),
        ReorderPolicy::Positional,
    );
    assert!(matches!(duplicate, Err(EngineError::Configuration(_))));

    let unknown_dep = ReorderEngine::new(
        unit_specs(2),
        DependencySet::from_pairs([(1, 9)]),
        ReorderPolicy::Positional,
    );
    assert!(matches!(unknown_dep, Err(EngineError::Configuration(_))));
}

#[test]
fn test_empty_list_rejects_every_event() {
    let engine =
        ReorderEngine::new(Vec::new(), DependencySet::empty(), ReorderPolicy::default()).unwrap();
    assert!(engine.is_empty());
    assert_eq!(engine.expected_latency(), 0.0);
    assert!(engine.on_match(0).is_err());

    let ids: HashSet<RuleId> = engine.current_order().into_iter().collect();
    assert!(ids.is_empty());
}

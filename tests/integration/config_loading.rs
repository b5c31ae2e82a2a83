//! Configuration files, simulations and persisted state

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use acl_reorder::config::{load_config, Config, WorkloadConfig};
use acl_reorder::feed::simulate;
use acl_reorder::report::PersistedAcl;
use acl_reorder::rules::{ReorderEngine, ReorderPolicy};
use acl_reorder::{AclError, ConfigError};

const MATRIX_CONFIG: &str = r#"{
    "rules": [
        { "id": 100, "latency": 0.9 },
        { "id": 200, "latency": 0.6 },
        { "id": 300, "latency": 0.8 },
        { "id": 400, "latency": 0.5 }
    ],
    "dependency_matrix": [
        [0, 0, 0, 0],
        [0, 0, 0, 0],
        [0, 0, 0, 0],
        [0, 0, 1, 0]
    ],
    "policy": { "type": "adaptive", "theta": 2.0, "normalize_every": 10 },
    "log": { "level": "debug", "format": "json" },
    "simulation": {
        "packets": 40,
        "report_every": 10,
        "seed": 9,
        "compare_policies": false,
        "workload": { "type": "weighted_rules", "weights": [0.0, 0.0, 0.0, 1.0] }
    }
}"#;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_matrix_config() {
    let file = write_config(MATRIX_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.rules.len(), 4);
    assert_eq!(config.log.format, "json");
    assert_eq!(config.policy, ReorderPolicy::adaptive(2.0, 10));
    assert_eq!(config.policies(), vec![ReorderPolicy::adaptive(2.0, 10)]);

    let deps = config.dependency_set().unwrap();
    assert!(deps.depends(400, 300));
    assert!(!deps.may_swap(300, 400));
    assert_eq!(deps.len(), 1);
}

#[test]
fn test_reject_bad_matrix_shape() {
    let json = r#"{
        "rules": [{ "id": 1, "latency": 1.0 }, { "id": 2, "latency": 1.0 }],
        "dependency_matrix": [[0, 1]]
    }"#;
    let file = write_config(json);
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_reject_unknown_dependency() {
    let json = r#"{
        "rules": [{ "id": 1, "latency": 1.0 }],
        "dependencies": [{ "rule": 1, "depends_on": 7 }]
    }"#;
    let file = write_config(json);
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_reject_growth_overflow() {
    let json = r#"{
        "rules": [{ "id": 1, "latency": 1.0 }],
        "policy": { "type": "adaptive", "theta": 1000.0, "normalize_every": 200 }
    }"#;
    let file = write_config(json);
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_simulate_from_file_respects_matrix() {
    let file = write_config(MATRIX_CONFIG);
    let config = load_config(file.path()).unwrap();

    let runs = simulate(&config).await.unwrap();
    assert_eq!(runs.len(), 1);

    let run = &runs[0];
    assert_eq!(run.feed.processed, 40);
    assert_eq!(run.feed.reports.len(), 4);
    // 400 is hit every time but may never pass 300.
    assert_eq!(run.last.order, vec![100, 200, 300, 400]);
    assert_eq!(run.last.stats.swaps, 0);
    assert_eq!(run.last.stats.blocked_by_dependency, 40);
    assert_eq!(run.last.stats.normalizations, 4);
}

#[tokio::test]
async fn test_simulate_rejects_invalid_workload() {
    let mut config = Config::default_config();
    config.simulation.workload = WorkloadConfig::WeightedRules { weights: vec![1.0] };

    let err = simulate(&config).await.unwrap_err();
    assert!(matches!(err, AclError::Config(_)));
}

#[test]
fn test_persist_and_restore_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acl-state.json");

    let config = Config::default_config();
    let engine = config.build_engine(ReorderPolicy::adaptive(2.0, 50)).unwrap();
    for _ in 0..5 {
        engine.on_match_rule(4).unwrap();
    }
    let state = engine.export_state();
    state.save(&path).unwrap();

    let loaded = PersistedAcl::load(&path).unwrap();
    assert_eq!(loaded, state);

    let restored = ReorderEngine::restore(loaded, ReorderPolicy::adaptive(2.0, 50)).unwrap();
    assert_eq!(restored.current_order(), engine.current_order());
    assert!((restored.expected_latency() - engine.expected_latency()).abs() < 1e-12);
    assert!(restored.dependencies().depends(1, 2));

    // Both engines evolve identically from here.
    for id in [5, 3, 5, 5, 2] {
        engine.on_match_rule(id).unwrap();
        restored.on_match_rule(id).unwrap();
        assert_eq!(restored.current_order(), engine.current_order());
    }
}

#[test]
fn test_missing_state_file() {
    assert!(matches!(
        PersistedAcl::load("/nonexistent/acl-state.json"),
        Err(ConfigError::FileNotFound { .. })
    ));
}

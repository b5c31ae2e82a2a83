//! Configuration types for acl-reorder
//!
//! This module defines all configuration structures used by the binary.
//! Configuration is loaded from JSON files and validated at startup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};
use crate::rules::{
    Dependency, DependencySet, ReorderEngine, ReorderPolicy, RuleId, RuleSpec,
    DEFAULT_NORMALIZE_EVERY, DEFAULT_THETA, INITIAL_HIT_RATE,
};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Rules in their initial evaluation order
    pub rules: Vec<RuleSpec>,

    /// Dependency edges between rule ids
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Optional 0/1 dependency matrix indexed by initial rule order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_matrix: Option<Vec<Vec<u8>>>,

    /// Reordering policy
    #[serde(default)]
    pub policy: ReorderPolicy,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Simulated traffic configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one rule must be configured".into(),
            ));
        }

        let mut ids: HashSet<RuleId> = HashSet::with_capacity(self.rules.len());
        for rule in &self.rules {
            rule.validate()?;
            if !ids.insert(rule.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate rule id: {}",
                    rule.id
                )));
            }
        }

        self.dependency_set()?.validate_against(&ids)?;

        for policy in self.policies() {
            policy.validate()?;
            policy.validate_growth(self.rules.len(), INITIAL_HIT_RATE.ln())?;
        }

        self.log.validate()?;
        self.simulation.validate(self.rules.len())?;

        Ok(())
    }

    /// Merge explicit dependency edges and the optional matrix
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the matrix shape does not
    /// match the rule list.
    pub fn dependency_set(&self) -> Result<DependencySet, ConfigError> {
        let mut edges: Vec<Dependency> = self.dependencies.clone();
        if let Some(matrix) = &self.dependency_matrix {
            let ids: Vec<RuleId> = self.rules.iter().map(|r| r.id).collect();
            edges.extend(DependencySet::from_matrix(&ids, matrix)?.iter());
        }
        Ok(edges.into_iter().collect())
    }

    /// Policies to simulate
    ///
    /// The configured policy comes first. With `compare_policies` the other
    /// variant is added so both can be run over the same traffic.
    #[must_use]
    pub fn policies(&self) -> Vec<ReorderPolicy> {
        let mut policies = vec![self.policy];
        if self.simulation.compare_policies {
            policies.push(match self.policy {
                ReorderPolicy::Adaptive { .. } => ReorderPolicy::Positional,
                ReorderPolicy::Positional => {
                    ReorderPolicy::adaptive(DEFAULT_THETA, DEFAULT_NORMALIZE_EVERY)
                }
            });
        }
        policies
    }

    /// Build a fresh engine over the configured rules
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the rules, dependencies or
    /// policy are invalid.
    pub fn build_engine(&self, policy: ReorderPolicy) -> Result<ReorderEngine, EngineError> {
        let dependencies = self
            .dependency_set()
            .map_err(|e| EngineError::configuration(e.to_string()))?;
        ReorderEngine::new(self.rules.clone(), dependencies, policy)
    }

    /// Create a small default configuration
    ///
    /// Five rules with latencies in `[0.5, 1.0)`; the first rule shadows
    /// the second, so those two never exchange places.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            rules: vec![
                RuleSpec::new(1, 0.92),
                RuleSpec::new(2, 0.61),
                RuleSpec::new(3, 0.78),
                RuleSpec::new(4, 0.55),
                RuleSpec::new(5, 0.87),
            ],
            dependencies: vec![Dependency::new(1, 2)],
            dependency_matrix: None,
            policy: ReorderPolicy::default(),
            log: LogConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate the logging configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unknown format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Log format must be 'json' or 'text', got '{other}'"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: true,
        }
    }
}

/// Simulated traffic configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Number of packets to simulate per policy
    #[serde(default = "default_packets")]
    pub packets: u64,

    /// Emit a report every N packets (0 disables periodic reports)
    #[serde(default = "default_report_every")]
    pub report_every: u64,

    /// RNG seed; every policy sees the same traffic for a given seed
    #[serde(default)]
    pub seed: u64,

    /// Traffic model
    #[serde(default)]
    pub workload: WorkloadConfig,

    /// Also simulate the other policy variant for comparison
    #[serde(default = "default_true")]
    pub compare_policies: bool,

    /// Channel capacity between the traffic source and the engine
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SimulationConfig {
    /// Validate the simulation configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the channel capacity is
    /// zero or the workload does not fit the rule list.
    pub fn validate(&self, rule_count: usize) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.channel_capacity must be at least 1".into(),
            ));
        }
        self.workload.validate(rule_count)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            packets: default_packets(),
            report_every: default_report_every(),
            seed: 0,
            workload: WorkloadConfig::default(),
            compare_policies: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Traffic model for the simulation
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadConfig {
    /// Each packet matches a uniformly random current position
    #[default]
    UniformPosition,

    /// Each packet matches a rule drawn by weight, wherever it sits
    WeightedRules {
        /// One non-negative weight per configured rule, in config order
        weights: Vec<f64>,
    },
}

impl WorkloadConfig {
    /// Validate against the number of configured rules
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if weights are missing,
    /// negative or all zero.
    pub fn validate(&self, rule_count: usize) -> Result<(), ConfigError> {
        if let Self::WeightedRules { weights } = self {
            if weights.len() != rule_count {
                return Err(ConfigError::ValidationError(format!(
                    "workload has {} weights for {rule_count} rules",
                    weights.len()
                )));
            }
            if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
                return Err(ConfigError::ValidationError(
                    "workload weights must be finite and non-negative".into(),
                ));
            }
            if weights.iter().all(|w| *w == 0.0) {
                return Err(ConfigError::ValidationError(
                    "at least one workload weight must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

const fn default_packets() -> u64 {
    20
}

const fn default_report_every() -> u64 {
    5
}

const fn default_channel_capacity() -> usize {
    1024
}

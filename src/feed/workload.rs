//! Simulated traffic sources
//!
//! A traffic source produces the stream of "which rule matched this packet"
//! events that drives the engine. Two models are provided:
//!
//! - [`UniformPositionSource`]: every packet matches a uniformly random
//!   position of the current order.
//! - [`WeightedRuleSource`]: every packet matches a rule identity drawn by
//!   weight. The engine resolves the identity to its current position, so
//!   popular rules keep being hit wherever they move.
//!
//! Sources are seeded so that several engines can be fed identical traffic.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WorkloadConfig;
use crate::error::{ConfigError, EngineError};
use crate::rules::{MatchOutcome, ReorderEngine, RuleId, RuleSpec};

/// A single match event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The rule at this position of the current order matched
    Position(usize),

    /// This rule matched, wherever it currently is
    Rule(RuleId),
}

impl MatchEvent {
    /// Apply this event to `engine`
    ///
    /// # Errors
    ///
    /// Propagates the engine's rejection of the event.
    pub fn apply(self, engine: &ReorderEngine) -> Result<MatchOutcome, EngineError> {
        match self {
            Self::Position(position) => engine.on_match(position),
            Self::Rule(id) => engine.on_match_rule(id),
        }
    }
}

/// Producer of match events
pub trait TrafficSource: Send {
    /// Produce the next event
    fn next_event(&mut self) -> MatchEvent;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Uniformly random positions
#[derive(Debug)]
pub struct UniformPositionSource {
    rng: StdRng,
    rule_count: usize,
}

impl UniformPositionSource {
    /// Create a source over `rule_count` positions
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `rule_count` is zero.
    pub fn new(rule_count: usize, seed: u64) -> Result<Self, ConfigError> {
        if rule_count == 0 {
            return Err(ConfigError::ValidationError(
                "uniform workload needs at least one rule".into(),
            ));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            rule_count,
        })
    }
}

impl TrafficSource for UniformPositionSource {
    fn next_event(&mut self) -> MatchEvent {
        MatchEvent::Position(self.rng.gen_range(0..self.rule_count))
    }

    fn name(&self) -> &'static str {
        "uniform_position"
    }
}

/// Rule identities drawn by weight
#[derive(Debug)]
pub struct WeightedRuleSource {
    rng: StdRng,
    ids: Vec<RuleId>,
    distribution: WeightedIndex<f64>,
}

impl WeightedRuleSource {
    /// Create a source from `(rule, weight)` pairs
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the weights are empty,
    /// negative or all zero.
    pub fn new(weights: &[(RuleId, f64)], seed: u64) -> Result<Self, ConfigError> {
        let distribution = WeightedIndex::new(weights.iter().map(|&(_, w)| w))
            .map_err(|e| ConfigError::ValidationError(format!("invalid workload weights: {e}")))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            ids: weights.iter().map(|&(id, _)| id).collect(),
            distribution,
        })
    }
}

impl TrafficSource for WeightedRuleSource {
    fn next_event(&mut self) -> MatchEvent {
        MatchEvent::Rule(self.ids[self.distribution.sample(&mut self.rng)])
    }

    fn name(&self) -> &'static str {
        "weighted_rules"
    }
}

/// Build the traffic source described by `config`
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` if the workload does not fit
/// `rules`.
pub fn source_from_config(
    config: &WorkloadConfig,
    rules: &[RuleSpec],
    seed: u64,
) -> Result<Box<dyn TrafficSource>, ConfigError> {
    config.validate(rules.len())?;
    Ok(match config {
        WorkloadConfig::UniformPosition => Box::new(UniformPositionSource::new(rules.len(), seed)?),
        WorkloadConfig::WeightedRules { weights } => {
            let pairs: Vec<(RuleId, f64)> = rules
                .iter()
                .zip(weights)
                .map(|(rule, &w)| (rule.id, w))
                .collect();
            Box::new(WeightedRuleSource::new(&pairs, seed)?)
        }
    })
}

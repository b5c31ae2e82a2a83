//! Reordering policies
//!
//! A policy decides, for each match event, whether the matched rule is
//! promoted one position towards the front. Two variants exist:
//!
//! - [`ReorderPolicy::Adaptive`] ("delta-opt"): reinforces the matched
//!   rule's hit-rate by `theta`, swaps only when the hit-rate/latency
//!   trade-off favours it, and renormalizes every `normalize_every` events.
//! - [`ReorderPolicy::Positional`] ("epsilon-opt"): stateless transpose
//!   heuristic; promotes on every hit. Cheaper, but can thrash under
//!   alternating match patterns.
//!
//! Both variants refuse a swap when the two rules depend on each other.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dependency::DependencySet;
use super::latency::swap_is_beneficial;
use super::normalize::normalize;
use super::types::{Rule, RuleId};
use crate::error::EngineError;

/// Default reinforcement factor for the adaptive policy
pub const DEFAULT_THETA: f64 = 2.0;

/// Default number of events between two normalizations
pub const DEFAULT_NORMALIZE_EVERY: u64 = 100;

const fn default_theta() -> f64 {
    DEFAULT_THETA
}

const fn default_normalize_every() -> u64 {
    DEFAULT_NORMALIZE_EVERY
}

/// Policy selected at engine construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReorderPolicy {
    /// Hit-rate weighted promotion with periodic normalization
    Adaptive {
        /// Reinforcement factor applied to the matched rule (must be > 1)
        #[serde(default = "default_theta")]
        theta: f64,

        /// Events between two normalizations (must be > 0)
        #[serde(default = "default_normalize_every")]
        normalize_every: u64,
    },

    /// Unconditional promotion on every hit
    Positional,
}

impl Default for ReorderPolicy {
    fn default() -> Self {
        Self::adaptive(DEFAULT_THETA, DEFAULT_NORMALIZE_EVERY)
    }
}

impl ReorderPolicy {
    /// Create an adaptive policy
    #[must_use]
    pub const fn adaptive(theta: f64, normalize_every: u64) -> Self {
        Self::Adaptive {
            theta,
            normalize_every,
        }
    }

    /// Short name used in logs and reports
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Adaptive { .. } => "adaptive",
            Self::Positional => "positional",
        }
    }

    /// Validate policy parameters
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if `theta` is not a finite value
    /// greater than 1, or if `normalize_every` is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Self::Adaptive {
            theta,
            normalize_every,
        } = *self
        {
            if !(theta.is_finite() && theta > 1.0) {
                return Err(EngineError::configuration(format!(
                    "adaptive theta must be a finite value > 1, got {theta}"
                )));
            }
            if normalize_every == 0 {
                return Err(EngineError::configuration(
                    "adaptive normalize_every must be at least 1",
                ));
            }
        }
        Ok(())
    }

    /// Check that reported hit-rates stay finite between two normalizations
    ///
    /// Hit-rates are stored as logarithms, so the engine itself never
    /// overflows. `Rule::hit_rate` and the expected-latency metric
    /// exponentiate them, though, and in the worst case one rule is matched
    /// on every event of a window: the sum can reach `rule_count *
    /// exp(max_log_hit_rate) * theta^normalize_every`. That bound must fit in
    /// an `f64`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the bound overflows.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate_growth(
        &self,
        rule_count: usize,
        max_log_hit_rate: f64,
    ) -> Result<(), EngineError> {
        if let Self::Adaptive {
            theta,
            normalize_every,
        } = *self
        {
            let scale = (rule_count.max(1) as f64).ln() + max_log_hit_rate.max(0.0);
            let growth = normalize_every as f64 * theta.ln();
            if scale + growth >= f64::MAX.ln() {
                return Err(EngineError::configuration(format!(
                    "theta={theta} over {normalize_every} events overflows hit-rates; \
                     lower theta or normalize more often"
                )));
            }
        }
        Ok(())
    }

    /// Apply one match event at `position` to `rules`
    ///
    /// Runs the whole decision (reinforce, trade-off, constraint, swap,
    /// normalization) on the caller's working copy. On error `rules` and
    /// `state` may be partially updated; callers discard both.
    ///
    /// # Errors
    ///
    /// - `EngineError::OutOfRange` if `position >= rules.len()`
    /// - `EngineError::InternalConsistency` if normalization fails
    pub fn apply(
        &self,
        rules: &mut [Rule],
        position: usize,
        dependencies: &DependencySet,
        state: &mut PolicyState,
    ) -> Result<MatchOutcome, EngineError> {
        if position >= rules.len() {
            return Err(EngineError::out_of_range(position, rules.len()));
        }

        let mut outcome = MatchOutcome::new(position, rules[position].id());

        match *self {
            Self::Adaptive {
                theta,
                normalize_every,
            } => {
                rules[position].reinforce(theta);

                if position > 0 && swap_is_beneficial(&rules[position], &rules[position - 1]) {
                    outcome.apply_swap(rules, position, dependencies);
                }

                state.matches_since_normalize += 1;
                if state.matches_since_normalize >= normalize_every {
                    normalize(rules)?;
                    state.matches_since_normalize = 0;
                    outcome.normalized = true;
                }
            }
            Self::Positional => {
                if position > 0 {
                    outcome.apply_swap(rules, position, dependencies);
                }
            }
        }

        Ok(outcome)
    }
}

impl fmt::Display for ReorderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive {
                theta,
                normalize_every,
            } => write!(f, "adaptive(theta={theta}, normalize_every={normalize_every})"),
            Self::Positional => write!(f, "positional"),
        }
    }
}

/// Mutable state carried by a policy between events
///
/// Scoped to one engine; reset only at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyState {
    /// Events processed since the last normalization
    pub matches_since_normalize: u64,
}

/// What a single match event did to the rule list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    /// Position reported by the event
    pub position: usize,

    /// Rule that occupied `position` when the event arrived
    pub rule_id: RuleId,

    /// The rule was moved to `position - 1`
    pub swapped: bool,

    /// A swap was wanted but the dependency relation forbade it
    pub blocked_by_dependency: bool,

    /// Hit-rates were renormalized after this event
    pub normalized: bool,
}

impl MatchOutcome {
    const fn new(position: usize, rule_id: RuleId) -> Self {
        Self {
            position,
            rule_id,
            swapped: false,
            blocked_by_dependency: false,
            normalized: false,
        }
    }

    /// Transpose `position` and `position - 1` unless their identities depend
    fn apply_swap(&mut self, rules: &mut [Rule], position: usize, dependencies: &DependencySet) {
        let (prev, current) = (rules[position - 1].id(), rules[position].id());
        if dependencies.may_swap(current, prev) {
            rules.swap(position - 1, position);
            self.swapped = true;
        } else {
            self.blocked_by_dependency = true;
        }
    }
}

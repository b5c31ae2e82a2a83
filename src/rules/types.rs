//! Core rule types for the reordering engine
//!
//! This module defines the fundamental types for ACL rules:
//! - [`RuleId`]: Stable rule identity
//! - [`RuleSpec`]: Construction input (identity and latency)
//! - [`Rule`]: A rule with its evaluation cost and hit-rate statistic

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Stable rule identity, never reused or mutated
pub type RuleId = u64;

/// Initial hit-rate assigned to every new rule
pub const INITIAL_HIT_RATE: f64 = 1.0;

/// Construction input for a single rule
///
/// # Examples
///
/// ```
/// use acl_reorder::rules::RuleSpec;
///
/// let spec = RuleSpec::new(1, 0.75);
/// assert!(spec.validate().is_ok());
/// assert!(RuleSpec::new(2, 0.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Unique identifier for this rule
    pub id: RuleId,

    /// Cost of evaluating this rule (must be positive and finite)
    pub latency: f64,
}

impl RuleSpec {
    /// Create a new rule spec
    #[must_use]
    pub const fn new(id: RuleId, latency: f64) -> Self {
        Self { id, latency }
    }

    /// Validate this spec
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the latency is not a positive
    /// finite number.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.latency.is_finite() && self.latency > 0.0) {
            return Err(EngineError::configuration(format!(
                "rule {} has invalid latency {} (must be positive and finite)",
                self.id, self.latency
            )));
        }
        Ok(())
    }
}

impl From<(RuleId, f64)> for RuleSpec {
    fn from((id, latency): (RuleId, f64)) -> Self {
        Self::new(id, latency)
    }
}

/// A single ACL rule as seen by the reordering engine
///
/// Identity and latency are fixed at creation. The hit-rate is only
/// changed by the adaptive policy and the normalizer inside this crate.
///
/// The hit-rate is kept as its natural logarithm. Reinforcement and
/// normalization become additions, so a rule that went unmatched for a long
/// time keeps a finite (very negative) log and can still win back its place.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    id: RuleId,
    latency: f64,
    log_hit_rate: f64,
}

impl Rule {
    /// Create a rule from a validated spec with the initial hit-rate
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the spec is invalid.
    pub fn from_spec(spec: RuleSpec) -> Result<Self, EngineError> {
        spec.validate()?;
        Ok(Self {
            id: spec.id,
            latency: spec.latency,
            log_hit_rate: INITIAL_HIT_RATE.ln(),
        })
    }

    /// Create a rule with an explicit hit-rate (used when restoring state)
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the latency is invalid or the
    /// hit-rate is not a positive finite number.
    pub fn with_hit_rate(spec: RuleSpec, hit_rate: f64) -> Result<Self, EngineError> {
        if !(hit_rate.is_finite() && hit_rate > 0.0) {
            return Err(EngineError::configuration(format!(
                "rule {} has invalid hit-rate {hit_rate} (must be positive and finite)",
                spec.id
            )));
        }
        Self::with_log_hit_rate(spec, hit_rate.ln())
    }

    /// Create a rule from the logarithm of its hit-rate
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the latency is invalid or
    /// `log_hit_rate` is not finite.
    pub fn with_log_hit_rate(spec: RuleSpec, log_hit_rate: f64) -> Result<Self, EngineError> {
        spec.validate()?;
        if !log_hit_rate.is_finite() {
            return Err(EngineError::configuration(format!(
                "rule {} has invalid log hit-rate {log_hit_rate}",
                spec.id
            )));
        }
        Ok(Self {
            id: spec.id,
            latency: spec.latency,
            log_hit_rate,
        })
    }

    /// Rule identity
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// Evaluation cost
    #[must_use]
    pub const fn latency(&self) -> f64 {
        self.latency
    }

    /// Current (unnormalized) hit-rate
    ///
    /// May round to `0.0` for long-unmatched rules; the stored logarithm
    /// does not.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        self.log_hit_rate.exp()
    }

    /// Natural logarithm of the hit-rate
    #[must_use]
    pub const fn log_hit_rate(&self) -> f64 {
        self.log_hit_rate
    }

    /// `ln(hit_rate / latency)`; higher values belong nearer the front
    #[must_use]
    pub fn log_priority(&self) -> f64 {
        self.log_hit_rate - self.latency.ln()
    }

    pub(crate) fn reinforce(&mut self, theta: f64) {
        self.log_hit_rate += theta.ln();
    }

    pub(crate) fn shift_log_hit_rate(&mut self, offset: f64) {
        self.log_hit_rate -= offset;
    }

    /// Identity and latency as a spec
    #[must_use]
    pub const fn spec(&self) -> RuleSpec {
        RuleSpec::new(self.id, self.latency)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}(λ={:.2}, h={:.2})",
            self.id,
            self.latency,
            self.hit_rate()
        )
    }
}

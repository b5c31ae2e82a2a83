//! Reporting and persistence
//!
//! [`AclReport`] is the read-only view handed to reporting consumers.
//! [`PersistedAcl`] is the state an embedding system may store and later
//! pass to [`ReorderEngine::restore`](crate::rules::ReorderEngine::restore):
//! the current order as `(id, latency, hit_rate)` tuples plus the
//! dependency relation. The JSON encoding is a convenience, not a
//! canonical format.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::{Dependency, Rule, RuleId, RuleSpec};
use crate::stats::EngineStatsSnapshot;

/// Per-rule state in list order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleState {
    /// Rule identity
    pub id: RuleId,
    /// Evaluation cost
    pub latency: f64,
    /// Hit-rate at the time of the snapshot
    pub hit_rate: f64,
    /// Natural logarithm of the hit-rate
    ///
    /// Exact even where `hit_rate` has rounded to zero. When present it is
    /// used instead of `hit_rate` on restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_hit_rate: Option<f64>,
}

impl RuleState {
    /// Identity and latency of this rule
    #[must_use]
    pub const fn spec(&self) -> RuleSpec {
        RuleSpec::new(self.id, self.latency)
    }
}

impl From<&Rule> for RuleState {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id(),
            latency: rule.latency(),
            hit_rate: rule.hit_rate(),
            log_hit_rate: Some(rule.log_hit_rate()),
        }
    }
}

/// Report of one engine at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct AclReport {
    /// Policy name ("adaptive" or "positional")
    pub policy: String,
    /// Snapshot version the report was taken from
    pub version: u64,
    /// Rule ids in evaluation order
    pub order: Vec<RuleId>,
    /// Rule states in evaluation order
    pub rules: Vec<RuleState>,
    /// Expected scan cost of the current order
    pub expected_latency: f64,
    /// Engine counters
    pub stats: EngineStatsSnapshot,
}

impl fmt::Display for AclReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "R{}(λ={:.2}, h={:.2})",
                rule.id, rule.latency, rule.hit_rate
            )?;
        }
        write!(f, "], E = {:.2}", self.expected_latency)
    }
}

/// Persistable engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAcl {
    /// Rules in current evaluation order
    pub rules: Vec<RuleState>,
    /// Dependency relation, sorted
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl PersistedAcl {
    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize ACL state: {e}")))
    }

    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse ACL state: {e}")))
    }

    /// Write state to a file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read state from a file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

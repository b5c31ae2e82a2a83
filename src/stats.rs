//! Reordering statistics tracking
//!
//! Counters for applied events travel inside each published
//! `OrderSnapshot`, so a report never shows a swap that its order does not
//! contain. Rejected events leave no snapshot behind and are counted by a
//! lock-free atomic instead.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::rules::MatchOutcome;

/// Counters kept outside the published snapshots
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Events rejected (out of range or unknown rule)
    rejected: AtomicU64,
}

impl EngineStats {
    /// Create new engine statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejected event
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get rejected events
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Combine the counters of one snapshot with the rejected count
    #[must_use]
    pub fn snapshot(&self, applied: EngineStatsSnapshot) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            rejected: self.rejected(),
            ..applied
        }
    }
}

/// Snapshot of engine statistics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatsSnapshot {
    /// Applied match events
    pub matches: u64,
    /// Committed swaps
    pub swaps: u64,
    /// Swaps refused by dependencies
    pub blocked_by_dependency: u64,
    /// Normalizations performed
    pub normalizations: u64,
    /// Rejected events
    pub rejected: u64,
}

impl EngineStatsSnapshot {
    /// Count an applied match event
    pub fn record_outcome(&mut self, outcome: &MatchOutcome) {
        self.matches += 1;
        if outcome.swapped {
            self.swaps += 1;
        }
        if outcome.blocked_by_dependency {
            self.blocked_by_dependency += 1;
        }
        if outcome.normalized {
            self.normalizations += 1;
        }
    }

    /// Fraction of applied events that moved a rule, as a percentage (0-100)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn swap_rate(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            (self.swaps as f64 / self.matches as f64) * 100.0
        }
    }
}

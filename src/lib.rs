//! acl-reorder: Self-optimizing ACL rule ordering
//!
//! An access control list is scanned front to back until a rule matches, so
//! the order of its rules decides the expected classification cost. This
//! crate keeps that order adapted to live traffic: each match event may
//! promote the matched rule by one position, unless the rule overlaps its
//! predecessor in a way that would change classification results.
//!
//! # Features
//!
//! - **Adaptive policy**: hit-rate reinforcement with a hit-rate/latency
//!   trade-off test and periodic normalization
//! - **Positional policy**: stateless promote-on-hit transpose heuristic
//! - **Dependency safety**: swaps are checked against an identity-keyed
//!   dependency relation
//! - **Lock-free reads**: lookups load an immutable snapshot via `ArcSwap`
//! - **Reporting**: expected-latency metric, counters, persistable state
//!
//! # Architecture
//!
//! ```text
//! TrafficSource → mpsc → run_feed() → ReorderEngine::on_match()
//!                                            ↓
//!                                   ReorderPolicy::apply()
//!                                     (dependency check)
//!                                            ↓
//!                              ArcSwap<OrderSnapshot> ← lookups / reports
//! ```
//!
//! # Quick Start
//!
//! ```
//! use acl_reorder::rules::{ReorderEngine, ReorderPolicy};
//!
//! let engine = ReorderEngine::builder()
//!     .rule(1, 1.0)
//!     .rule(2, 1.0)
//!     .rule(3, 1.0)
//!     .policy(ReorderPolicy::adaptive(2.0, 3))
//!     .build()
//!     .unwrap();
//!
//! engine.on_match(2).unwrap();
//! assert_eq!(engine.current_order(), vec![1, 3, 2]);
//! println!("E = {:.2}", engine.expected_latency());
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`feed`]: Traffic sources and the event intake loop
//! - [`report`]: Reports and persisted state
//! - [`rules`]: Rules, dependencies, policies and the engine
//! - [`stats`]: Engine counters

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod feed;
pub mod report;
pub mod rules;
pub mod stats;

// Re-export commonly used types at the crate root
pub use config::{Config, LogConfig, SimulationConfig, WorkloadConfig};
pub use error::{AclError, ConfigError, EngineError};
pub use feed::{MatchEvent, TrafficSource};
pub use report::{AclReport, PersistedAcl, RuleState};
pub use rules::{
    expected_latency, DependencySet, MatchOutcome, OrderSnapshot, ReorderEngine, ReorderPolicy,
    Rule, RuleId, RuleSpec,
};
pub use stats::{EngineStats, EngineStatsSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

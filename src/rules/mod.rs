//! Adaptive rule ordering
//!
//! This module provides:
//! - Rule types ([`Rule`], [`RuleSpec`], [`RuleId`])
//! - The identity-keyed dependency relation ([`DependencySet`])
//! - The expected-latency metric ([`expected_latency`])
//! - Hit-rate normalization ([`normalize`])
//! - Reordering policies ([`ReorderPolicy`])
//! - The lock-free-read engine ([`ReorderEngine`])
//!
//! # Architecture
//!
//! Rules are evaluated front to back until one matches. Each match event
//! may promote the matched rule by one position, provided the rule and its
//! predecessor do not depend on each other. Over time frequently matched,
//! cheap rules drift to the front and the expected scan cost drops.
//!
//! # Example
//!
//! ```
//! use acl_reorder::rules::{ReorderEngine, ReorderPolicy};
//!
//! let engine = ReorderEngine::builder()
//!     .rule(1, 1.0)
//!     .rule(2, 1.0)
//!     .rule(3, 1.0)
//!     .rule(4, 1.0)
//!     .policy(ReorderPolicy::adaptive(2.0, 100))
//!     .build()
//!     .unwrap();
//!
//! let before = engine.expected_latency();
//! for _ in 0..3 {
//!     let pos = engine.position_of(4).unwrap();
//!     engine.on_match(pos).unwrap();
//! }
//! assert_eq!(engine.current_order()[0], 4);
//! assert!(engine.expected_latency() > before); // hit-rates grew
//! ```

pub mod dependency;
pub mod engine;
pub mod latency;
pub mod normalize;
pub mod policy;
pub mod types;

// Re-exports
pub use dependency::{Dependency, DependencySet, DependencySetBuilder};
pub use engine::{OrderSnapshot, ReorderEngine, ReorderEngineBuilder};
pub use latency::{expected_latency, swap_is_beneficial};
pub use normalize::normalize;
pub use policy::{
    MatchOutcome, PolicyState, ReorderPolicy, DEFAULT_NORMALIZE_EVERY, DEFAULT_THETA,
};
pub use types::{Rule, RuleId, RuleSpec, INITIAL_HIT_RATE};

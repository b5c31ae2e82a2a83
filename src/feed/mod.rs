//! Match-event feed
//!
//! Everything between traffic and the engine: simulated traffic sources
//! ([`workload`]) and the asynchronous intake loop ([`runner`]) that applies
//! events strictly in arrival order and emits periodic reports.

pub mod runner;
pub mod workload;

pub use runner::{run_feed, simulate, spawn_source, FeedSummary, SimulationRun};
pub use workload::{
    source_from_config, MatchEvent, TrafficSource, UniformPositionSource, WeightedRuleSource,
};

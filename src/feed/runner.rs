//! Event intake loop
//!
//! Traffic sources run as their own task and hand events to the engine
//! through a bounded `mpsc` channel. A single consumer drains the channel,
//! so events reach each engine strictly in arrival order.
//!
//! ```text
//! TrafficSource task --mpsc--> run_feed() --on_match()--> ReorderEngine
//!                                  |
//!                                  +-- every N packets --> AclReport (tracing)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::workload::{source_from_config, MatchEvent, TrafficSource};
use crate::config::Config;
use crate::error::{AclError, EngineError};
use crate::report::AclReport;
use crate::rules::{ReorderEngine, ReorderPolicy};

/// Result of draining one event channel
#[derive(Debug, Clone)]
pub struct FeedSummary {
    /// Events applied to the engine
    pub processed: u64,
    /// Events the engine rejected
    pub rejected: u64,
    /// Periodic reports, in order
    pub reports: Vec<AclReport>,
}

/// Spawn a task pushing `packets` events from `source` into a channel
///
/// The task stops early if the receiver is dropped.
pub fn spawn_source(
    mut source: Box<dyn TrafficSource>,
    packets: u64,
    capacity: usize,
) -> (JoinHandle<()>, mpsc::Receiver<MatchEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let name = source.name();
        for sent in 0..packets {
            if tx.send(source.next_event()).await.is_err() {
                debug!(source = name, sent, "Event receiver closed, stopping source");
                return;
            }
        }
        debug!(source = name, packets, "Traffic source finished");
    });
    (handle, rx)
}

/// Apply every event from `rx` to `engine` until the channel closes
///
/// Rejected events (out of range, unknown rule) are counted and skipped.
/// A report is logged and collected every `report_every` applied events;
/// zero disables periodic reports.
///
/// # Errors
///
/// Returns the first unrecoverable `EngineError`; the engine keeps the
/// state it had before that event.
pub async fn run_feed(
    engine: Arc<ReorderEngine>,
    mut rx: mpsc::Receiver<MatchEvent>,
    report_every: u64,
) -> Result<FeedSummary, EngineError> {
    let mut summary = FeedSummary {
        processed: 0,
        rejected: 0,
        reports: Vec::new(),
    };

    while let Some(event) = rx.recv().await {
        match event.apply(&engine) {
            Ok(_) => summary.processed += 1,
            Err(e) if e.is_recoverable() => {
                summary.rejected += 1;
                continue;
            }
            Err(e) => return Err(e),
        }

        if report_every > 0 && summary.processed % report_every == 0 {
            let report = engine.report();
            info!(
                policy = %report.policy,
                packets = summary.processed,
                expected_latency = report.expected_latency,
                "After {} packets: {}",
                summary.processed,
                report
            );
            summary.reports.push(report);
        }
    }

    if summary.rejected > 0 {
        warn!(rejected = summary.rejected, "Some match events were rejected");
    }

    Ok(summary)
}

/// Outcome of simulating one policy
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// Policy simulated
    pub policy: ReorderPolicy,
    /// Report before any traffic
    pub initial: AclReport,
    /// Report after all traffic
    pub last: AclReport,
    /// Intake summary
    pub feed: FeedSummary,
}

/// Run the configured simulation for every configured policy
///
/// Each policy gets a fresh engine and the same seeded traffic.
///
/// # Errors
///
/// Returns `AclError` if an engine cannot be built, the workload is
/// invalid, or an event fails unrecoverably.
pub async fn simulate(config: &Config) -> Result<Vec<SimulationRun>, AclError> {
    let sim = &config.simulation;
    let mut runs = Vec::new();

    for policy in config.policies() {
        let engine = Arc::new(config.build_engine(policy)?);
        let initial = engine.report();
        info!(policy = %policy, "Initial order: {}", initial);

        let source = source_from_config(&sim.workload, &config.rules, sim.seed)?;
        let (producer, rx) = spawn_source(source, sim.packets, sim.channel_capacity);

        let feed = run_feed(Arc::clone(&engine), rx, sim.report_every).await?;
        if let Err(e) = producer.await {
            warn!(error = %e, "Traffic source task failed");
        }

        let last = engine.report();
        info!(
            policy = %policy,
            swaps = last.stats.swaps,
            blocked = last.stats.blocked_by_dependency,
            normalizations = last.stats.normalizations,
            "Final order: {}",
            last
        );

        runs.push(SimulationRun {
            policy,
            initial,
            last,
            feed,
        });
    }

    Ok(runs)
}

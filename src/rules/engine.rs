//! Self-optimizing rule list engine.
//!
//! The engine keeps the current rule order as an immutable `OrderSnapshot`
//! published through `ArcSwap`, so classification lookups read it without
//! locking. Match events are applied by a single writer at a time.
//!
//! # Architecture
//!
//! ```text
//! Lookup  -> ReorderEngine::load() -> ArcSwap::load() -> OrderSnapshot
//!                                          |
//!                                   (lock-free read)
//!
//! Event   -> ReorderEngine::on_match() -> Mutex<PolicyState> (single writer)
//!                  |
//!            clone snapshot -> ReorderPolicy::apply() -> ArcSwap::store()
//!                                                            |
//!                                                   (atomic publish)
//! ```
//!
//! A reader always sees either the order before an event or the order after
//! it, never a half-applied transposition. A failed event publishes nothing.
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
//!     .policy(ReorderPolicy::adaptive(2.0, 3))
//!     .build()
//!     .unwrap();
//!
//! engine.on_match(2).unwrap();
//! assert_eq!(engine.current_order(), vec![1, 3, 2]);
//!
//! engine.on_match(1).unwrap();
//! assert_eq!(engine.current_order(), vec![3, 1, 2]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::dependency::DependencySet;
use super::latency::expected_latency;
use super::policy::{MatchOutcome, PolicyState, ReorderPolicy};
use super::types::{Rule, RuleId, RuleSpec};
use crate::error::EngineError;
use crate::report::{AclReport, PersistedAcl, RuleState};
use crate::stats::{EngineStats, EngineStatsSnapshot};

/// Immutable view of the rule order at one point in time.
///
/// Designed to be wrapped in `Arc` and swapped atomically. Carries the
/// counters of every event applied up to this point, so order and counters
/// are always read together.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    rules: Arc<Vec<Rule>>,
    version: u64,
    stats: EngineStatsSnapshot,
}

impl OrderSnapshot {
    /// Rules in evaluation order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rule-state updates before this snapshot
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Counters of the events applied up to this snapshot
    ///
    /// `rejected` is always zero here; see [`ReorderEngine::stats`].
    #[must_use]
    pub const fn stats(&self) -> EngineStatsSnapshot {
        self.stats
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule at `position`
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Rule> {
        self.rules.get(position)
    }

    /// Rule ids in evaluation order
    #[must_use]
    pub fn order(&self) -> Vec<RuleId> {
        self.rules.iter().map(Rule::id).collect()
    }

    /// Current position of a rule
    #[must_use]
    pub fn position_of(&self, id: RuleId) -> Option<usize> {
        self.rules.iter().position(|r| r.id() == id)
    }

    /// Expected scan cost of this order
    #[must_use]
    pub fn expected_latency(&self) -> f64 {
        expected_latency(&self.rules)
    }

    /// Walk the order and return the first rule accepted by `matches`
    ///
    /// This is the linear scan whose cost the engine optimizes. The
    /// returned position can be fed straight back into
    /// [`ReorderEngine::on_match`].
    pub fn first_match<F>(&self, mut matches: F) -> Option<(usize, RuleId)>
    where
        F: FnMut(&Rule) -> bool,
    {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| matches(rule))
            .map(|(pos, rule)| (pos, rule.id()))
    }
}

/// Adaptive ACL rule list.
///
/// # Thread Safety
///
/// Safe to share across threads. Reads are lock-free; `on_match` calls are
/// serialized so each event is applied atomically and in arrival order.
pub struct ReorderEngine {
    /// Current order (lock-free reads via `ArcSwap`).
    snapshot: ArcSwap<OrderSnapshot>,

    /// Writer lock; also owns the policy's normalization counter.
    writer: Mutex<PolicyState>,

    dependencies: DependencySet,
    policy: ReorderPolicy,
    stats: EngineStats,
}

impl ReorderEngine {
    /// Create an engine over `rules` in the given initial order.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if:
    /// - any latency is not a positive finite number
    /// - rule ids are duplicated
    /// - a dependency references an unknown rule
    /// - the policy parameters are invalid (`theta <= 1`, `normalize_every == 0`)
    /// - hit-rates could overflow between two normalizations
    pub fn new(
        rules: Vec<RuleSpec>,
        dependencies: DependencySet,
        policy: ReorderPolicy,
    ) -> Result<Self, EngineError> {
        let rules = rules
            .into_iter()
            .map(Rule::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rules(rules, dependencies, policy)
    }

    /// Create a builder
    #[must_use]
    pub fn builder() -> ReorderEngineBuilder {
        ReorderEngineBuilder::new()
    }

    /// Rebuild an engine from persisted state.
    ///
    /// Order and hit-rates are taken as stored; the normalization counter
    /// starts from zero.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` for the same reasons as
    /// [`ReorderEngine::new`], or if a stored hit-rate is not a positive
    /// finite number.
    pub fn restore(state: PersistedAcl, policy: ReorderPolicy) -> Result<Self, EngineError> {
        let rules = state
            .rules
            .iter()
            .map(|r| match r.log_hit_rate {
                Some(log_hit_rate) => Rule::with_log_hit_rate(r.spec(), log_hit_rate),
                None => Rule::with_hit_rate(r.spec(), r.hit_rate),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let dependencies = state.dependencies.into_iter().collect();
        Self::from_rules(rules, dependencies, policy)
    }

    fn from_rules(
        rules: Vec<Rule>,
        dependencies: DependencySet,
        policy: ReorderPolicy,
    ) -> Result<Self, EngineError> {
        policy.validate()?;

        let mut ids: HashSet<RuleId> = HashSet::with_capacity(rules.len());
        for rule in &rules {
            if !ids.insert(rule.id()) {
                return Err(EngineError::configuration(format!(
                    "duplicate rule id {}",
                    rule.id()
                )));
            }
        }
        dependencies.validate_against(&ids)?;

        let max_log_hit_rate = rules
            .iter()
            .map(Rule::log_hit_rate)
            .fold(f64::NEG_INFINITY, f64::max);
        policy.validate_growth(rules.len(), max_log_hit_rate)?;

        info!(
            rules = rules.len(),
            dependencies = dependencies.len(),
            policy = %policy,
            "Reorder engine created"
        );

        Ok(Self {
            snapshot: ArcSwap::from_pointee(OrderSnapshot {
                rules: Arc::new(rules),
                version: 0,
                stats: EngineStatsSnapshot::default(),
            }),
            writer: Mutex::new(PolicyState::default()),
            dependencies,
            policy,
            stats: EngineStats::new(),
        })
    }

    /// Get the current snapshot (lock-free read).
    ///
    /// The returned `Guard` keeps the snapshot alive, so several lookups
    /// can share one consistent order.
    pub fn load(&self) -> Guard<Arc<OrderSnapshot>> {
        self.snapshot.load()
    }

    /// Apply one match event at `position` of the current order.
    ///
    /// # Errors
    ///
    /// - `EngineError::OutOfRange` if `position` is not a current index;
    ///   order and hit-rates are unchanged.
    /// - `EngineError::InternalConsistency` if normalization finds a
    ///   degenerate hit-rate sum; nothing is published.
    pub fn on_match(&self, position: usize) -> Result<MatchOutcome, EngineError> {
        let mut state = self.writer.lock();
        let current = self.snapshot.load_full();
        self.apply_locked(&mut state, &current, position)
    }

    /// Apply one match event for rule `id`, wherever it currently sits.
    ///
    /// The position is resolved under the writer lock, so it cannot go
    /// stale between lookup and update.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownRule` if `id` is not in the list, or any
    /// error of [`ReorderEngine::on_match`].
    pub fn on_match_rule(&self, id: RuleId) -> Result<MatchOutcome, EngineError> {
        let mut state = self.writer.lock();
        let current = self.snapshot.load_full();
        let Some(position) = current.position_of(id) else {
            self.stats.record_rejected();
            warn!(rule = id, "Match event for unknown rule rejected");
            return Err(EngineError::UnknownRule(id));
        };
        self.apply_locked(&mut state, &current, position)
    }

    fn apply_locked(
        &self,
        state: &mut PolicyState,
        current: &OrderSnapshot,
        position: usize,
    ) -> Result<MatchOutcome, EngineError> {
        if position >= current.len() {
            self.stats.record_rejected();
            warn!(
                position,
                len = current.len(),
                "Match event out of range rejected"
            );
            return Err(EngineError::out_of_range(position, current.len()));
        }

        let mut rules = current.rules.as_ref().clone();
        let mut next_state = *state;
        let outcome = self
            .policy
            .apply(&mut rules, position, &self.dependencies, &mut next_state)
            .map_err(|e| {
                error!(position, error = %e, "Match event failed, order left unchanged");
                e
            })?;

        *state = next_state;

        if outcome.swapped {
            debug!(
                rule = outcome.rule_id,
                from = position,
                to = position - 1,
                "Rule promoted"
            );
        } else if outcome.blocked_by_dependency {
            trace!(
                rule = outcome.rule_id,
                position,
                "Promotion blocked by dependency"
            );
        }
        if outcome.normalized {
            trace!("Hit-rates normalized");
        }

        let mut stats = current.stats;
        stats.record_outcome(&outcome);

        // Positional events without a swap leave the rules as they were.
        let rules_changed =
            outcome.swapped || matches!(self.policy, ReorderPolicy::Adaptive { .. });
        let next = if rules_changed {
            OrderSnapshot {
                rules: Arc::new(rules),
                version: current.version + 1,
                stats,
            }
        } else {
            OrderSnapshot {
                rules: Arc::clone(&current.rules),
                version: current.version,
                stats,
            }
        };
        self.snapshot.store(Arc::new(next));

        Ok(outcome)
    }

    /// Rule ids in current evaluation order.
    #[must_use]
    pub fn current_order(&self) -> Vec<RuleId> {
        self.snapshot.load().order()
    }

    /// Expected scan cost of the current order.
    #[must_use]
    pub fn expected_latency(&self) -> f64 {
        self.snapshot.load().expected_latency()
    }

    /// Current position of rule `id`.
    #[must_use]
    pub fn position_of(&self, id: RuleId) -> Option<usize> {
        self.snapshot.load().position_of(id)
    }

    /// Number of rules (fixed for the engine's lifetime).
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Check if the engine has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rule-state updates so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot.load().version
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> &ReorderPolicy {
        &self.policy
    }

    /// Dependency relation in use.
    #[must_use]
    pub const fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot(self.snapshot.load().stats)
    }

    /// Build a report from one consistent snapshot.
    ///
    /// Order, hit-rates, expected latency and applied-event counters all
    /// come from the same snapshot. Only `stats.rejected` is read separately.
    #[must_use]
    pub fn report(&self) -> AclReport {
        let snapshot = self.snapshot.load();
        AclReport {
            policy: self.policy.name().to_string(),
            version: snapshot.version,
            order: snapshot.order(),
            rules: snapshot.rules.iter().map(RuleState::from).collect(),
            expected_latency: snapshot.expected_latency(),
            stats: self.stats.snapshot(snapshot.stats),
        }
    }

    /// Export order, hit-rates and dependencies for persistence.
    #[must_use]
    pub fn export_state(&self) -> PersistedAcl {
        let snapshot = self.snapshot.load();
        PersistedAcl {
            rules: snapshot.rules.iter().map(RuleState::from).collect(),
            dependencies: self.dependencies.sorted(),
        }
    }
}

impl std::fmt::Debug for ReorderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("ReorderEngine")
            .field("version", &snapshot.version)
            .field("rules", &snapshot.len())
            .field("dependencies", &self.dependencies.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ReorderEngine`].
///
/// Rules keep the order in which they are added.
///
/// # Example
///
/// ```
/// use acl_reorder::rules::{ReorderEngine, ReorderPolicy};
///
/// let engine = ReorderEngine::builder()
///     .rule(10, 0.5)
///     .rule(20, 0.8)
///     .dependency(10, 20)
///     .policy(ReorderPolicy::Positional)
///     .build()
///     .unwrap();
///
/// // 20 depends on nothing, but 10 depends on 20: the pair is pinned.
/// engine.on_match(1).unwrap();
/// assert_eq!(engine.current_order(), vec![10, 20]);
/// ```
#[derive(Debug, Default)]
pub struct ReorderEngineBuilder {
    rules: Vec<RuleSpec>,
    dependencies: Vec<(RuleId, RuleId)>,
    policy: ReorderPolicy,
}

impl ReorderEngineBuilder {
    /// Create a builder with the default adaptive policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    #[must_use]
    pub fn rule(mut self, id: RuleId, latency: f64) -> Self {
        self.rules.push(RuleSpec::new(id, latency));
        self
    }

    /// Append several rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = RuleSpec>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Record that `rule` depends on `depends_on`.
    #[must_use]
    pub fn dependency(mut self, rule: RuleId, depends_on: RuleId) -> Self {
        self.dependencies.push((rule, depends_on));
        self
    }

    /// Select the policy.
    #[must_use]
    pub const fn policy(mut self, policy: ReorderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// See [`ReorderEngine::new`].
    pub fn build(self) -> Result<ReorderEngine, EngineError> {
        ReorderEngine::new(
            self.rules,
            DependencySet::from_pairs(self.dependencies),
            self.policy,
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

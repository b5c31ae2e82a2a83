//! Expected-latency metric
//!
//! For an ordering `r[0..n]`, a linear scan that stops at position `i` pays
//! `cumulative(i) = latency[0] + ... + latency[i]`. Weighting each stop by
//! the rule's hit-rate gives the metric
//!
//! ```text
//! E = sum_i hit_rate[i] * cumulative(i)
//! ```
//!
//! Hit-rates are unnormalized weights, so `E` is only comparable between
//! orderings that share the same hit-rate vector (or after normalization).

use super::types::Rule;

/// Compute the expected scan cost of `rules` in their current order
///
/// Pure and O(n). An empty list costs nothing.
///
/// # Example
///
/// ```
/// use acl_reorder::rules::{expected_latency, Rule, RuleSpec};
///
/// let rules: Vec<Rule> = [(1, 1.0), (2, 2.0)]
///     .into_iter()
///     .map(|r| Rule::from_spec(r.into()).unwrap())
///     .collect();
///
/// // 1.0 * 1.0 + 1.0 * (1.0 + 2.0)
/// assert!((expected_latency(&rules) - 4.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn expected_latency(rules: &[Rule]) -> f64 {
    let mut cumulative = 0.0;
    rules
        .iter()
        .map(|rule| {
            cumulative += rule.latency();
            rule.hit_rate() * cumulative
        })
        .sum()
}

/// Check whether moving `candidate` ahead of its `predecessor` lowers cost
///
/// Exchanging two adjacent rules changes `E` only through their own terms:
/// the swap helps iff `h[c] * l[p] > h[p] * l[c]`, i.e. the candidate has
/// the higher hit-rate per unit latency. The comparison is done on
/// [`Rule::log_priority`], so it stays exact for hit-rates that would
/// underflow as plain floats. Ties keep the current order.
#[must_use]
pub fn swap_is_beneficial(candidate: &Rule, predecessor: &Rule) -> bool {
    candidate.log_priority() > predecessor.log_priority()
}

//! Hit-rate normalization
//!
//! Repeated reinforcement grows hit-rates geometrically. Dividing every
//! hit-rate by their sum keeps the values bounded while preserving every
//! pairwise ratio, so no trade-off decision can change because of it.
//!
//! Hit-rates are stored as logarithms, so the division is a subtraction of
//! the log-sum-exp. Small hit-rates shrink towards minus infinity in log
//! space instead of flushing to zero.

use super::types::Rule;
use crate::error::EngineError;

/// Rescale hit-rates so they sum to 1
///
/// Returns the natural logarithm of the sum that was divided out. Rules are
/// left untouched when the list is empty or the log-sum is not finite; that
/// state is only reachable through corrupted statistics and is reported as
/// an internal-consistency error.
///
/// # Errors
///
/// Returns `EngineError::InternalConsistency` if the hit-rate sum is not a
/// positive finite number.
///
/// # Example
///
/// ```
/// use acl_reorder::rules::{normalize, Rule, RuleSpec};
///
/// let mut rules = vec![
///     Rule::with_hit_rate(RuleSpec::new(1, 1.0), 3.0).unwrap(),
///     Rule::with_hit_rate(RuleSpec::new(2, 1.0), 1.0).unwrap(),
/// ];
/// let log_sum = normalize(&mut rules).unwrap();
/// assert!((log_sum - 4.0_f64.ln()).abs() < 1e-12);
/// assert!((rules[0].hit_rate() - 0.75).abs() < 1e-12);
/// ```
pub fn normalize(rules: &mut [Rule]) -> Result<f64, EngineError> {
    let log_sum = log_sum_exp(rules);
    if !log_sum.is_finite() {
        return Err(EngineError::internal(format!(
            "cannot normalize hit-rates of {} rules: log-sum is {log_sum}",
            rules.len()
        )));
    }

    for rule in rules.iter_mut() {
        rule.shift_log_hit_rate(log_sum);
    }
    Ok(log_sum)
}

/// `ln(sum(exp(log_hit_rate)))`, shifted by the maximum to avoid overflow
fn log_sum_exp(rules: &[Rule]) -> f64 {
    let max = rules
        .iter()
        .map(Rule::log_hit_rate)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = rules
        .iter()
        .map(|rule| (rule.log_hit_rate() - max).exp())
        .sum();
    max + sum.ln()
}

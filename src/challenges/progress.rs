//! Progress accumulation policies.
//!
//! Pure folds over approved submission values; the verification module
//! applies the results transactionally.

use super::types::AccumulationPolicy;

/// Combine the current progress with a newly approved value.
pub fn apply_policy(current: f64, value: f64, policy: AccumulationPolicy) -> f64 {
    match policy {
        AccumulationPolicy::Cumulative => current + value,
        AccumulationPolicy::BestEffort => current.max(value),
        AccumulationPolicy::SingleSession => value,
    }
}

/// Rebuild progress from scratch over the approved values, oldest first.
///
/// Used when a reversal invalidates a previously applied value and the
/// incremental form can no longer be trusted (best-effort and
/// single-session folds are not invertible).
pub fn fold_progress(values_oldest_first: &[f64], policy: AccumulationPolicy) -> f64 {
    values_oldest_first
        .iter()
        .fold(0.0, |acc, value| apply_policy(acc, *value, policy))
}

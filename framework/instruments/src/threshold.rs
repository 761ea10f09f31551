use crate::stats::nearest_rank;
use serde::Serialize;

/// A run-level pass/fail condition on the duration percentiles of one operation.
///
/// Thresholds are evaluated exactly once, against the aggregated statistics, when the reporter
/// is finalized. A breached threshold marks the whole run as failed but never interrupts it.
#[derive(Debug, Clone, Serialize)]
pub struct Threshold {
    pub operation_id: String,
    pub percentile: f64,
    pub below_ms: f64,
}

impl Threshold {
    /// Require that `p(percentile)` of the operation's durations stays below `below_ms`.
    pub fn p_below(operation_id: &str, percentile: f64, below_ms: f64) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            percentile,
            below_ms,
        }
    }

    /// The expression in the shape thresholds are usually written, e.g. `p(90)<1500`.
    pub fn expression(&self) -> String {
        format!("p({})<{}", self.percentile, self.below_ms)
    }

    pub(crate) fn evaluate(&self, sorted_ms: &[f64]) -> ThresholdOutcome {
        let observed_ms = nearest_rank(sorted_ms, self.percentile);
        ThresholdOutcome {
            operation_id: self.operation_id.clone(),
            expression: self.expression(),
            observed_ms,
            passed: observed_ms < self.below_ms,
        }
    }
}

/// The result of evaluating one [Threshold] at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdOutcome {
    pub operation_id: String,
    pub expression: String,
    pub observed_ms: f64,
    pub passed: bool,
}

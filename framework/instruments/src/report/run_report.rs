use crate::check::CheckSummary;
use crate::stats::TrendStats;
use crate::threshold::{Threshold, ThresholdOutcome};
use crate::OperationRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Aggregated duration statistics and error count for one operation id.
#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub operation_id: String,
    pub stats: TrendStats,
    pub error_count: usize,
}

/// The finalized aggregate of a whole run.
///
/// This is what collectors render and what a scenario's `main` inspects to decide the process
/// exit code. Individual records do not survive finalization.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario_name: String,
    pub run_id: String,
    /// Unix timestamp in seconds for when the run started.
    pub started_at: i64,
    /// The configured run duration in seconds. Not set for soak runs.
    pub run_duration: Option<u64>,
    pub operations: Vec<OperationSummary>,
    pub checks: Vec<CheckSummary>,
    /// Iterations the pacer could not start because every VU was busy and the pool was at its
    /// maximum size.
    pub dropped_iterations: u64,
    pub thresholds: Vec<ThresholdOutcome>,
}

impl RunReport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        scenario_name: &str,
        run_id: &str,
        started_at: i64,
        run_duration: Option<u64>,
        records: &[OperationRecord],
        checks: Vec<CheckSummary>,
        dropped_iterations: u64,
        thresholds: &[Threshold],
    ) -> Self {
        // Group samples by operation id, preserving first-seen order.
        let mut order: Vec<String> = Vec::new();
        let mut samples: HashMap<String, Vec<f64>> = HashMap::new();
        let mut errors: HashMap<String, usize> = HashMap::new();

        for record in records {
            let Some(elapsed) = record.elapsed else {
                log::warn!(
                    "Skipping unfinished operation record: {}",
                    record.operation_id
                );
                continue;
            };

            if !samples.contains_key(&record.operation_id) {
                order.push(record.operation_id.clone());
            }
            samples
                .entry(record.operation_id.clone())
                .or_default()
                .push(elapsed.as_micros() as f64 / 1000.0);
            if record.is_error {
                *errors.entry(record.operation_id.clone()).or_default() += 1;
            }
        }

        for sorted in samples.values_mut() {
            sorted.sort_by(|a, b| a.total_cmp(b));
        }

        let operations = order
            .iter()
            .map(|operation_id| OperationSummary {
                operation_id: operation_id.clone(),
                stats: TrendStats::from_sorted_ms(&samples[operation_id]),
                error_count: errors.get(operation_id).copied().unwrap_or(0),
            })
            .collect();

        let thresholds = thresholds
            .iter()
            .map(|threshold| {
                let sorted = samples
                    .get(&threshold.operation_id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                threshold.evaluate(sorted)
            })
            .collect();

        Self {
            scenario_name: scenario_name.to_string(),
            run_id: run_id.to_string(),
            started_at,
            run_duration,
            operations,
            checks,
            dropped_iterations,
            thresholds,
        }
    }

    pub fn operation(&self, operation_id: &str) -> Option<&OperationSummary> {
        self.operations
            .iter()
            .find(|op| op.operation_id == operation_id)
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|check| check.name == name)
    }

    /// True when every declared threshold held. A run with no thresholds always passes.
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|outcome| outcome.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn report_serializes_to_json() {
        let records: Vec<OperationRecord> = [40u64, 50, 60]
            .iter()
            .map(|ms| {
                let mut record = OperationRecord::new("http_req");
                record.elapsed = Some(Duration::from_millis(*ms));
                record
            })
            .collect();

        let mut check = CheckSummary::new("is status 200");
        check.observe(true);

        let report = RunReport::build(
            "chat_completions",
            "run-7",
            1_700_000_000,
            Some(120),
            &records,
            vec![check],
            1,
            &[Threshold::p_below("http_req", 90.0, 1500.0)],
        );

        let json = serde_json::to_value(&report).expect("Report did not serialize");
        assert_eq!(json["scenario_name"], "chat_completions");
        assert_eq!(json["run_duration"], 120);
        assert_eq!(json["dropped_iterations"], 1);
        assert_eq!(json["operations"][0]["operation_id"], "http_req");
        assert_eq!(json["operations"][0]["stats"]["count"], 3);
        assert_eq!(json["checks"][0]["passes"], 1);
        assert_eq!(json["thresholds"][0]["passed"], true);
    }
}

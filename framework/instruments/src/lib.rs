mod check;
mod stats;
mod threshold;

pub mod report;

pub use check::{Check, CheckSummary};
pub use report::{
    HtmlReportCollector, NoopReportCollector, OperationSummary, ReportCollector, ReportConfig,
    Reporter, RunReport, SummaryReportCollector,
};
pub use stats::TrendStats;
pub use threshold::{Threshold, ThresholdOutcome};

/// Timing record for a single operation, typically one HTTP request.
///
/// Create the record just before starting the operation and finish it exactly once when the
/// response has been received, then hand it to the [Reporter](crate::Reporter).
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    pub started: std::time::Instant,
    pub elapsed: Option<std::time::Duration>,
    pub is_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            started: std::time::Instant::now(),
            elapsed: None,
            is_error: false,
        }
    }

    /// Capture the elapsed time and mark whether the operation failed.
    pub fn finish(mut self, is_error: bool) -> Self {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
        self
    }

    pub fn duration(&self) -> Option<std::time::Duration> {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_captures_elapsed() {
        let record = OperationRecord::new("op").finish(false);
        assert!(record.duration().is_some());
        assert!(!record.is_error);
    }

    #[test]
    fn unfinished_record_has_no_duration() {
        let record = OperationRecord::new("op");
        assert!(record.duration().is_none());
    }
}

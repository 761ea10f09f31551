mod html_report;
mod run_report;
mod summary_report;

use crate::check::{summarise_checks, Check};
use crate::threshold::Threshold;
use crate::OperationRecord;
use parking_lot::Mutex;
use std::path::PathBuf;

pub use html_report::HtmlReportCollector;
pub use run_report::{OperationSummary, RunReport};
pub use summary_report::SummaryReportCollector;

/// Sink for the finalized run report.
///
/// Collectors only see the aggregate, never the individual records. The reporter owns the
/// append-only record state and hands each collector the same [RunReport] once, at run end.
pub trait ReportCollector: Send + Sync {
    fn render(&self, report: &RunReport) -> anyhow::Result<()>;
}

/// A collector that discards the report. Used when a scenario runs with reporting disabled,
/// for example in tests.
pub struct NoopReportCollector;

impl ReportCollector for NoopReportCollector {
    fn render(&self, _report: &RunReport) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Configuration for which collectors a run's [Reporter] drives.
#[derive(Default)]
pub struct ReportConfig {
    enable_summary: bool,
    html_path: Option<PathBuf>,
}

impl ReportConfig {
    /// Print a console summary table when the run completes.
    pub fn enable_summary(mut self) -> Self {
        self.enable_summary = true;
        self
    }

    /// Write a self-contained HTML report to `path` when the run completes.
    pub fn enable_html(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_path = Some(path.into());
        self
    }

    pub fn init(self, scenario_name: &str, run_id: &str) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector>> = Vec::new();
        if self.enable_summary {
            collectors.push(Box::new(SummaryReportCollector::new()));
        }
        if let Some(path) = self.html_path {
            collectors.push(Box::new(HtmlReportCollector::new(path)));
        }
        if collectors.is_empty() {
            collectors.push(Box::new(NoopReportCollector));
        }

        Reporter {
            scenario_name: scenario_name.to_string(),
            run_id: run_id.to_string(),
            started_at: chrono::Utc::now().timestamp(),
            state: Mutex::new(ReporterState::default()),
            collectors,
        }
    }
}

#[derive(Default)]
struct ReporterState {
    operations: Vec<OperationRecord>,
    checks: Vec<Check>,
    dropped_iterations: u64,
}

/// The append-only statistics accumulator shared by all VUs.
///
/// This is the only state shared between iterations. Records go in during the run; the
/// aggregate comes out exactly once via [Reporter::finalize].
pub struct Reporter {
    scenario_name: String,
    run_id: String,
    started_at: i64,
    state: Mutex<ReporterState>,
    collectors: Vec<Box<dyn ReportCollector>>,
}

impl Reporter {
    pub fn add_operation(&self, record: OperationRecord) {
        debug_assert!(record.elapsed.is_some(), "Operation record was not finished");
        self.state.lock().operations.push(record);
    }

    pub fn add_check(&self, name: &str, passed: bool) {
        self.state.lock().checks.push(Check::new(name, passed));
    }

    pub fn add_dropped_iterations(&self, count: u64) {
        self.state.lock().dropped_iterations += count;
    }

    /// Aggregate everything recorded during the run, evaluate the thresholds and hand the
    /// report to every configured collector. Collector failures are logged, not propagated,
    /// so that one broken sink cannot lose the others' output.
    pub fn finalize(&self, run_duration: Option<u64>, thresholds: &[Threshold]) -> RunReport {
        let state = self.state.lock();

        let report = RunReport::build(
            &self.scenario_name,
            &self.run_id,
            self.started_at,
            run_duration,
            &state.operations,
            summarise_checks(&state.checks),
            state.dropped_iterations,
            thresholds,
        );

        for collector in &self.collectors {
            if let Err(e) = collector.render(&report) {
                log::error!("Report collector failed: {e:?}");
            }
        }

        report
    }
}

mod checks_table;
mod operations_table;

use crate::report::summary_report::checks_table::CheckRow;
use crate::report::summary_report::operations_table::OperationRow;
use crate::report::{ReportCollector, RunReport};
use tabled::settings::Style;
use tabled::Table;

/// Prints a summary of the run to the console when the run completes.
pub struct SummaryReportCollector;

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SummaryReportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollector for SummaryReportCollector {
    fn render(&self, report: &RunReport) -> anyhow::Result<()> {
        println!("\nSummary of requests");
        let rows = report
            .operations
            .iter()
            .map(OperationRow::from)
            .collect::<Vec<_>>();
        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("{table}");

        if !report.checks.is_empty() {
            println!("\nChecks");
            let rows = report.checks.iter().map(CheckRow::from).collect::<Vec<_>>();
            let mut table = Table::new(rows);
            table.with(Style::modern());
            println!("{table}");
        }

        if report.dropped_iterations > 0 {
            println!("\nDropped iterations: {}", report.dropped_iterations);
        }

        for outcome in &report.thresholds {
            println!(
                "Threshold {} {}: observed {:.2}ms [{}]",
                outcome.operation_id,
                outcome.expression,
                outcome.observed_ms,
                if outcome.passed { "PASS" } else { "FAIL" },
            );
        }

        Ok(())
    }
}

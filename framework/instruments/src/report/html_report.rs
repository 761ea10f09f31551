use crate::report::{ReportCollector, RunReport};
use anyhow::Context;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Writes the run report as a single self-contained HTML file.
///
/// The file has inline CSS and no external assets, so it can be archived or attached to CI
/// output as-is. This is the only artifact a run persists.
pub struct HtmlReportCollector {
    path: PathBuf,
}

impl HtmlReportCollector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReportCollector for HtmlReportCollector {
    fn render(&self, report: &RunReport) -> anyhow::Result<()> {
        std::fs::write(&self.path, render_html(report))
            .with_context(|| format!("Failed to write HTML report to {}", self.path.display()))?;
        log::info!("Wrote HTML report to {}", self.path.display());
        Ok(())
    }
}

fn render_html(report: &RunReport) -> String {
    let started_at = chrono::DateTime::from_timestamp(report.started_at, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| report.started_at.to_string());

    let mut operation_rows = String::new();
    for op in &report.operations {
        let s = &op.stats;
        write!(
            operation_rows,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>",
            escape(&op.operation_id),
            s.avg_ms,
            s.min_ms,
            s.max_ms,
            s.p70_ms,
            s.p90_ms,
            s.p95_ms,
            s.count,
            op.error_count,
        )
        .expect("Writing to a String cannot fail");
    }

    let mut check_rows = String::new();
    for check in &report.checks {
        write!(
            check_rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            escape(&check.name),
            check.passes,
            check.fails,
            check.pass_rate() * 100.0,
        )
        .expect("Writing to a String cannot fail");
    }

    let mut threshold_rows = String::new();
    for outcome in &report.thresholds {
        write!(
            threshold_rows,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td class=\"{}\">{}</td></tr>",
            escape(&outcome.operation_id),
            escape(&outcome.expression),
            outcome.observed_ms,
            if outcome.passed { "pass" } else { "fail" },
            if outcome.passed { "PASS" } else { "FAIL" },
        )
        .expect("Writing to a String cannot fail");
    }

    let duration = report
        .run_duration
        .map(|d| format!("{d}s"))
        .unwrap_or_else(|| "unbounded".to_string());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Load test summary: {scenario}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; color: #222; }}
h1 {{ font-size: 1.4em; }}
h2 {{ font-size: 1.1em; margin-top: 1.5em; }}
table {{ border-collapse: collapse; margin-top: 0.5em; }}
th, td {{ border: 1px solid #bbb; padding: 0.3em 0.8em; text-align: right; }}
th {{ background: #eee; }}
td:first-child, th:first-child {{ text-align: left; }}
.pass {{ color: #1a7f37; font-weight: bold; }}
.fail {{ color: #b42318; font-weight: bold; }}
.meta {{ color: #555; }}
</style>
</head>
<body>
<h1>Load test summary: {scenario}</h1>
<p class="meta">Run {run_id} started at {started_at}, configured duration {duration},
dropped iterations: {dropped}</p>
<h2>Request duration (ms)</h2>
<table>
<tr><th>operation</th><th>avg</th><th>min</th><th>max</th><th>p70</th><th>p90</th><th>p95</th><th>count</th><th>errors</th></tr>
{operation_rows}
</table>
<h2>Checks</h2>
<table>
<tr><th>check</th><th>passes</th><th>fails</th><th>pass rate</th></tr>
{check_rows}
</table>
<h2>Thresholds</h2>
<table>
<tr><th>operation</th><th>threshold</th><th>observed (ms)</th><th>result</th></tr>
{threshold_rows}
</table>
</body>
</html>
"#,
        scenario = escape(&report.scenario_name),
        run_id = escape(&report.run_id),
        started_at = escape(&started_at),
        duration = duration,
        dropped = report.dropped_iterations,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportConfig;
    use crate::{OperationRecord, Threshold};
    use std::time::Duration;

    fn sample_report() -> RunReport {
        let reporter = ReportConfig::default().init("chat_completions", "run-42");
        for elapsed_ms in [40, 50, 60] {
            let mut record = OperationRecord::new("http_req");
            record.elapsed = Some(Duration::from_millis(elapsed_ms));
            reporter.add_operation(record);
        }
        reporter.add_check("is status 200", true);
        reporter.add_check("is status 200", false);
        reporter.finalize(Some(120), &[Threshold::p_below("http_req", 90.0, 1500.0)])
    }

    #[test]
    fn report_contains_trend_statistics() {
        let html = render_html(&sample_report());

        assert!(html.contains("chat_completions"));
        assert!(html.contains("run-42"));
        assert!(html.contains("<td>50.00</td>")); // avg
        assert!(html.contains("<td>40.00</td>")); // min
        assert!(html.contains("<td>3</td>")); // count
        assert!(html.contains("p(90)&lt;1500"));
        assert!(html.contains("PASS"));
    }

    #[test]
    fn dynamic_content_is_escaped() {
        assert_eq!(escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn collector_writes_exactly_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load-test-summary.html");

        let collector = HtmlReportCollector::new(path.clone());
        collector.render(&sample_report()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

use crate::report::OperationSummary;
use tabled::Tabled;

#[derive(Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    #[tabled(display = "float2")]
    pub avg_ms: f64,
    #[tabled(display = "float2")]
    pub min_ms: f64,
    #[tabled(display = "float2")]
    pub max_ms: f64,
    #[tabled(display = "float2")]
    pub p70_ms: f64,
    #[tabled(display = "float2")]
    pub p90_ms: f64,
    #[tabled(display = "float2")]
    pub p95_ms: f64,
    pub count: usize,
    pub errors: usize,
}

impl From<&OperationSummary> for OperationRow {
    fn from(summary: &OperationSummary) -> Self {
        Self {
            operation_id: summary.operation_id.clone(),
            avg_ms: summary.stats.avg_ms,
            min_ms: summary.stats.min_ms,
            max_ms: summary.stats.max_ms,
            p70_ms: summary.stats.p70_ms,
            p90_ms: summary.stats.p90_ms,
            p95_ms: summary.stats.p95_ms,
            count: summary.stats.count,
            errors: summary.error_count,
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{n:.2}")
}

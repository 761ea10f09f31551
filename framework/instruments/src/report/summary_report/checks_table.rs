use crate::check::CheckSummary;
use tabled::Tabled;

#[derive(Tabled)]
pub struct CheckRow {
    pub name: String,
    pub passes: usize,
    pub fails: usize,
    #[tabled(display = "percent")]
    pub pass_rate: f64,
}

impl From<&CheckSummary> for CheckRow {
    fn from(summary: &CheckSummary) -> Self {
        Self {
            name: summary.name.clone(),
            passes: summary.passes,
            fails: summary.fails,
            pass_rate: summary.pass_rate(),
        }
    }
}

fn percent(rate: &f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

use serde::Serialize;

/// A single named boolean observation made against one response.
///
/// Checks never affect control flow. They are folded into per-name pass/fail counts by the
/// reporter at the end of the run.
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub passed: bool,
}

impl Check {
    pub fn new(name: &str, passed: bool) -> Self {
        Self {
            name: name.to_string(),
            passed,
        }
    }
}

/// Aggregated pass/fail counts for one check name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: usize,
    pub fails: usize,
}

impl CheckSummary {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passes: 0,
            fails: 0,
        }
    }

    pub fn observe(&mut self, passed: bool) {
        if passed {
            self.passes += 1;
        } else {
            self.fails += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.passes + self.fails
    }

    /// Pass rate in the range 0..=1. A check that was never observed reports 0.
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total() as f64
    }
}

/// Fold individual observations into summaries, preserving first-seen order of the names.
pub(crate) fn summarise_checks(checks: &[Check]) -> Vec<CheckSummary> {
    let mut summaries: Vec<CheckSummary> = Vec::new();
    for check in checks {
        match summaries.iter_mut().find(|s| s.name == check.name) {
            Some(summary) => summary.observe(check.passed),
            None => {
                let mut summary = CheckSummary::new(&check.name);
                summary.observe(check.passed);
                summaries.push(summary);
            }
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn observations_fold_into_counts() {
        let checks = vec![
            Check::new("is status 200", true),
            Check::new("is status 200", true),
            Check::new("is status 200", false),
            Check::new("is fast", true),
        ];

        let summaries = summarise_checks(&checks);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "is status 200");
        assert_eq!(summaries[0].passes, 2);
        assert_eq!(summaries[0].fails, 1);
        assert_eq!(summaries[1].name, "is fast");
        assert_eq!(summaries[1].passes, 1);
    }

    #[test]
    fn pass_rate_over_observations() {
        let mut summary = CheckSummary::new("is status 200");
        assert_eq!(summary.pass_rate(), 0.0);

        summary.observe(true);
        summary.observe(true);
        summary.observe(false);
        summary.observe(false);
        assert_eq!(summary.pass_rate(), 0.5);
    }
}

use serde::Serialize;
use std::time::Duration;

/// Aggregated duration statistics for one operation across a whole run.
///
/// All values are in milliseconds. Percentiles use the nearest-rank method on the sorted
/// samples, which keeps the numbers exact for the sample counts produced by short runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p70_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub count: usize,
}

impl TrendStats {
    pub fn from_durations(durations: &[Duration]) -> Self {
        let mut samples: Vec<f64> = durations
            .iter()
            .map(|d| d.as_micros() as f64 / 1000.0)
            .collect();
        samples.sort_by(|a, b| a.total_cmp(b));

        Self::from_sorted_ms(&samples)
    }

    pub(crate) fn from_sorted_ms(sorted_ms: &[f64]) -> Self {
        if sorted_ms.is_empty() {
            return Self::empty();
        }

        let count = sorted_ms.len();
        let sum: f64 = sorted_ms.iter().sum();

        Self {
            avg_ms: sum / count as f64,
            min_ms: sorted_ms[0],
            max_ms: sorted_ms[count - 1],
            p70_ms: nearest_rank(sorted_ms, 70.0),
            p90_ms: nearest_rank(sorted_ms, 90.0),
            p95_ms: nearest_rank(sorted_ms, 95.0),
            count,
        }
    }

    pub fn empty() -> Self {
        Self {
            avg_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            p70_ms: 0.0,
            p90_ms: 0.0,
            p95_ms: 0.0,
            count: 0,
        }
    }
}

/// Nearest-rank percentile over an ascending-sorted slice of samples.
///
/// Returns 0 for an empty slice so that an empty run renders as zeroes rather than panicking.
pub fn nearest_rank(sorted_ms: &[f64], percentile: f64) -> f64 {
    if sorted_ms.is_empty() {
        return 0.0;
    }

    let rank = ((percentile / 100.0) * sorted_ms.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted_ms.len()) - 1;
    sorted_ms[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let stats = TrendStats::from_durations(&[]);
        assert_eq!(stats, TrendStats::empty());
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn single_sample_is_every_statistic() {
        let stats = TrendStats::from_durations(&[Duration::from_millis(50)]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.avg_ms, 50.0);
        assert_eq!(stats.min_ms, 50.0);
        assert_eq!(stats.max_ms, 50.0);
        assert_eq!(stats.p90_ms, 50.0);
        assert_eq!(stats.p95_ms, 50.0);
    }

    #[test]
    fn stats_over_ten_samples() {
        let durations: Vec<Duration> = (1..=10).map(Duration::from_millis).collect();
        let stats = TrendStats::from_durations(&durations);

        assert_eq!(stats.count, 10);
        assert_eq!(stats.avg_ms, 5.5);
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 10.0);
        assert_eq!(stats.p70_ms, 7.0);
        assert_eq!(stats.p90_ms, 9.0);
        assert_eq!(stats.p95_ms, 10.0);
    }

    #[test]
    fn nearest_rank_is_order_independent_of_input() {
        let mut durations: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        durations.reverse();
        let stats = TrendStats::from_durations(&durations);
        assert_eq!(stats.p90_ms, 90.0);
        assert_eq!(stats.p95_ms, 95.0);
    }

    #[test]
    fn nearest_rank_clamps_low_percentiles() {
        assert_eq!(nearest_rank(&[3.0, 4.0, 5.0], 0.0), 3.0);
        assert_eq!(nearest_rank(&[3.0, 4.0, 5.0], 100.0), 5.0);
        assert_eq!(nearest_rank(&[], 90.0), 0.0);
    }
}

//! Summary statistics over a series.

use serde::Serialize;

/// Summary of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub count: usize,
}

/// Compute stats; `None` for an empty input.
///
/// Values are sorted ascending and each percentile `p` is read at index
/// `floor(len * p)`, clamped to the last element. The median is read at
/// `floor(len / 2)`.
pub fn calculate_stats(values: &[f64]) -> Option<Stats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();

    Some(Stats {
        min: sorted[0],
        max: sorted[count - 1],
        avg: sum / count as f64,
        median: sorted[count / 2],
        p95: percentile(&sorted, 0.95),
        p99: percentile(&sorted, 0.99),
        count,
    })
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let index = (sorted.len() as f64 * p).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert_eq!(calculate_stats(&[]), None);
    }

    #[test]
    fn test_single_value() {
        let stats = calculate_stats(&[42.5]).unwrap();
        for v in [stats.min, stats.max, stats.avg, stats.median, stats.p95, stats.p99] {
            assert_eq!(v, 42.5);
        }
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_percentile_indexing() {
        // 100 down to 1
        let mut values: Vec<f64> = (1..=100).map(f64::from).collect();
        values.reverse();
        let stats = calculate_stats(&values).unwrap();

        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.avg, 50.5);
        assert_eq!(stats.median, 51.0); // sorted[50]
        assert_eq!(stats.p95, 96.0); // sorted[95]
        assert_eq!(stats.p99, 100.0); // sorted[99]
    }

    #[test]
    fn test_small_series() {
        let stats = calculate_stats(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.p95, 3.0); // floor(2.85) = 2
    }
}

//! Bounded metric series.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metadata::Metadata;

/// Metadata key set on samples produced by a failed measurement.
pub const ERROR_FLAG: &str = "error";

/// One recorded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub metadata: Metadata,
}

impl Sample {
    pub fn new(value: f64, metadata: Metadata) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
            metadata,
        }
    }

    /// True when the sample carries the error flag.
    pub fn is_error(&self) -> bool {
        self.metadata
            .get(ERROR_FLAG)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Fixed-capacity, insertion-ordered series. The oldest sample is evicted
/// once the capacity is exceeded.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl MetricSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Arithmetic mean of the retained values.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.value).sum::<f64>() / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut series = MetricSeries::new(3);
        for v in 0..7 {
            series.push(Sample::new(v as f64, Metadata::new()));
        }
        assert_eq!(series.values(), vec![4.0, 5.0, 6.0]);
        assert_eq!(series.latest().unwrap().value, 6.0);
    }

    #[test]
    fn test_error_flag() {
        let ok = Sample::new(1.0, Metadata::new());
        let failed = Sample::new(1.0, Metadata::new().with(ERROR_FLAG, true));
        assert!(!ok.is_error());
        assert!(failed.is_error());
    }

    #[test]
    fn test_mean() {
        let mut series = MetricSeries::new(10);
        assert_eq!(series.mean(), None);
        series.push(Sample::new(2.0, Metadata::new()));
        series.push(Sample::new(4.0, Metadata::new()));
        assert_eq!(series.mean(), Some(3.0));
    }
}

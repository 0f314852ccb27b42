//! Rolling numeric series
//!
//! Ordered, append-only sequence of `f64` samples. Insertion order is time
//! order. `tail` sums the most recent samples and `index` looks a sample up
//! counting back from the most recent one.
//!
//! Out-of-range lookups return the sentinel `0.0` (use [`RollingSeries::get`]
//! to tell a missing sample from a real zero).

use std::collections::VecDeque;

/// Ordered `f64` series with optional bounded retention
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingSeries {
    values: VecDeque<f64>,
    /// Maximum retained samples, `None` for unbounded
    capacity: Option<usize>,
}

impl RollingSeries {
    /// Create an unbounded series
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a series retaining at most `capacity` samples (minimum 1)
    pub fn with_capacity_limit(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Create an unbounded series seeded with `values` (oldest first)
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            capacity: None,
        }
    }

    /// Append one sample, evicting the oldest past the retention limit
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if let Some(cap) = self.capacity {
            while self.values.len() > cap {
                self.values.pop_front();
            }
        }
    }

    /// Sum of the last `n` samples (all retained samples when `n > len`)
    pub fn tail(&self, n: usize) -> f64 {
        self.values.iter().rev().take(n).sum()
    }

    /// Sample `k` positions back from the most recent, if retained
    pub fn get(&self, k: usize) -> Option<f64> {
        let len = self.values.len();
        if k >= len {
            return None;
        }
        self.values.get(len - 1 - k).copied()
    }

    /// Sample `k` positions back from the most recent, `0.0` when out of range
    pub fn index(&self, k: usize) -> f64 {
        self.get(k).unwrap_or(0.0)
    }

    /// Most recent sample, `0.0` when empty
    pub fn last(&self) -> f64 {
        self.index(0)
    }

    /// Sum of every retained sample
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Retained samples, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> RollingSeries {
        RollingSeries::from_values(values.iter().copied())
    }

    #[test]
    fn test_tail_sums_most_recent() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.tail(0), 0.0);
        assert_eq!(s.tail(1), 4.0);
        assert_eq!(s.tail(2), 7.0);
        assert_eq!(s.tail(100), 10.0);
    }

    #[test]
    fn test_index_from_end() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert_eq!(s.index(0), 3.0);
        assert_eq!(s.index(2), 1.0);
        assert_eq!(s.last(), 3.0);
    }

    #[test]
    fn test_index_out_of_range_returns_sentinel() {
        let s = series(&[5.0]);
        assert_eq!(s.index(1), 0.0);
        assert_eq!(s.get(1), None);

        let empty = RollingSeries::new();
        assert_eq!(empty.index(0), 0.0);
        assert_eq!(empty.last(), 0.0);
        assert_eq!(empty.tail(3), 0.0);
    }

    #[test]
    fn test_sliding_window_difference() {
        let s = series(&[1.0, -2.0, 3.0, 4.0, -5.0, 6.0, 7.0]);
        for window in 0..=4usize {
            for offset in 0..=(s.len() - window) {
                let expected: f64 = (offset..offset + window).map(|k| s.index(k)).sum();
                let diff = s.tail(window + offset) - s.tail(offset);
                assert!(
                    (diff - expected).abs() < 1e-12,
                    "window={} offset={} diff={} expected={}",
                    window,
                    offset,
                    diff,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_bounded_retention_evicts_oldest() {
        let mut s = RollingSeries::with_capacity_limit(3);
        for v in 1..=5 {
            s.update(v as f64);
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.values().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(s.index(2), 3.0);
        assert_eq!(s.index(3), 0.0);
    }
}

//! Simple moving average over a fixed window.
//!
//! Reads 0.0 until `window` samples have been seen.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    window: usize,
    raw: VecDeque<f64>,
    last: Option<f64>,
}

impl SimpleMovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            raw: VecDeque::with_capacity(window),
            last: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn update(&mut self, value: f64) {
        self.raw.push_back(value);
        if self.raw.len() > self.window {
            self.raw.pop_front();
        }
        if self.raw.len() == self.window {
            let sum: f64 = self.raw.iter().sum();
            self.last = Some(sum / self.window as f64);
        }
    }

    pub fn last(&self) -> f64 {
        self.last.unwrap_or(0.0)
    }

    pub fn is_ready(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_warmup_reads_zero() {
        let mut sma = SimpleMovingAverage::new(3);
        sma.update(1.0);
        sma.update(2.0);
        assert!(!sma.is_ready());
        assert_eq!(sma.last(), 0.0);
        sma.update(3.0);
        assert!(sma.is_ready());
        assert_eq!(sma.last(), 2.0);
    }

    #[test]
    fn test_sma_rolls_window() {
        let mut sma = SimpleMovingAverage::new(2);
        for v in [10.0, 20.0, 30.0, 50.0] {
            sma.update(v);
        }
        assert_eq!(sma.last(), 40.0);
    }

    #[test]
    fn test_zero_window_clamped() {
        let mut sma = SimpleMovingAverage::new(0);
        assert_eq!(sma.window(), 1);
        sma.update(7.0);
        assert_eq!(sma.last(), 7.0);
    }
}

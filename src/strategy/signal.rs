//! In-process alpha holder fed by alpha events

use crate::common::errors::{Result, StrategyError};
use crate::common::traits::AlphaSource;
use crate::report::series::RollingSeries;

/// Ranked alpha values published once per bar, newest at index 0
///
/// Retains the ranking window; reads beyond the retained history are
/// `OutOfRange` rather than a silent zero.
#[derive(Debug, Clone)]
pub struct RankedValues {
    values: RollingSeries,
}

impl RankedValues {
    pub fn new(window: usize) -> Self {
        Self {
            values: RollingSeries::with_capacity_limit(window.max(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl AlphaSource for RankedValues {
    fn ranked_value(&self, k: usize) -> Result<f64> {
        self.values.get(k).ok_or(StrategyError::OutOfRange {
            index: k,
            len: self.values.len(),
        })
    }

    fn push(&mut self, value: f64) {
        self.values.update(value);
    }
}

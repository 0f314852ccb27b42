//! Trend strength and volatility factors from recent closes
//!
//! - Trend strength: `0.5 + efficiency ratio`, where the efficiency ratio is
//!   net close-to-close movement over the summed absolute movement of the
//!   window. Range [0.5, 1.5]; choppy markets shrink the target.
//! - Volatility: `target_volatility / realized_volatility` of simple returns,
//!   clamped to [0.25, 2.0]; calm markets grow the target.
//!
//! Both read 1.0 until enough closes have been observed.

use std::collections::VecDeque;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::config::types::RegimeConfig;

const MIN_VOLATILITY_FACTOR: f64 = 0.25;
const MAX_VOLATILITY_FACTOR: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct MarketRegime {
    config: RegimeConfig,
    closes: VecDeque<f64>,
}

impl MarketRegime {
    pub fn new(config: RegimeConfig) -> Self {
        let capacity = config.trend_window.max(config.volatility_window) + 1;
        Self {
            config,
            closes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn update(&mut self, close: Decimal) {
        let Some(close) = close.to_f64() else {
            return;
        };
        self.closes.push_back(close);
        let capacity = self.config.trend_window.max(self.config.volatility_window) + 1;
        while self.closes.len() > capacity {
            self.closes.pop_front();
        }
    }

    /// Most recent `n` closes, oldest first
    fn recent(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.closes.len().saturating_sub(n);
        self.closes.iter().skip(skip).copied()
    }

    pub fn trend_strength(&self) -> Decimal {
        let closes: Vec<f64> = self.recent(self.config.trend_window + 1).collect();
        if closes.len() < 2 {
            return Decimal::ONE;
        }
        let path: f64 = closes.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        if path <= 0.0 {
            return Decimal::ONE;
        }
        let net = (closes[closes.len() - 1] - closes[0]).abs();
        to_factor(0.5 + net / path)
    }

    pub fn volatility_factor(&self) -> Decimal {
        let closes: Vec<f64> = self.recent(self.config.volatility_window + 1).collect();
        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        if returns.len() < 2 || self.config.target_volatility <= 0.0 {
            return Decimal::ONE;
        }
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
        let realized = variance.sqrt();
        if realized < 1e-12 {
            return to_factor(MAX_VOLATILITY_FACTOR);
        }
        to_factor(
            (self.config.target_volatility / realized)
                .clamp(MIN_VOLATILITY_FACTOR, MAX_VOLATILITY_FACTOR),
        )
    }
}

fn to_factor(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(6))
        .unwrap_or(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn regime(window: usize) -> MarketRegime {
        MarketRegime::new(RegimeConfig {
            trend_window: window,
            volatility_window: window,
            target_volatility: 0.01,
        })
    }

    #[test]
    fn test_neutral_without_history() {
        let mut r = regime(5);
        assert_eq!(r.trend_strength(), Decimal::ONE);
        assert_eq!(r.volatility_factor(), Decimal::ONE);
        r.update(dec!(100));
        assert_eq!(r.trend_strength(), Decimal::ONE);
    }

    #[test]
    fn test_straight_trend_is_strongest() {
        let mut r = regime(4);
        for close in [dec!(100), dec!(101), dec!(102), dec!(103), dec!(104)] {
            r.update(close);
        }
        assert_eq!(r.trend_strength(), dec!(1.5));
    }

    #[test]
    fn test_round_trip_is_weakest() {
        let mut r = regime(4);
        for close in [dec!(100), dec!(102), dec!(100), dec!(102), dec!(100)] {
            r.update(close);
        }
        assert_eq!(r.trend_strength(), dec!(0.5));
    }

    #[test]
    fn test_volatility_factor_is_clamped() {
        let mut wild = regime(4);
        for close in [dec!(100), dec!(150), dec!(80), dec!(160), dec!(70)] {
            wild.update(close);
        }
        assert_eq!(wild.volatility_factor(), dec!(0.25));

        let mut flat = regime(4);
        for _ in 0..5 {
            flat.update(dec!(100));
        }
        assert_eq!(flat.volatility_factor(), dec!(2));
    }

    #[test]
    fn test_window_bounds_history() {
        let mut r = regime(2);
        for close in [dec!(50), dec!(100), dec!(101), dec!(102)] {
            r.update(close);
        }
        // only 100 -> 101 -> 102 is in the window
        assert_eq!(r.trend_strength(), dec!(1.5));
    }
}

//! Stop-loss/take-profit checks and the risk gate
//!
//! Stops are checked against the average cost of the position, or against the
//! latest tracked fill price when the trailing variant is enabled. The risk
//! gate denies risk-increasing orders once the drawdown or the daily loss
//! exceeds its limit; reductions stay allowed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::types::{RiskLimits, StrategyConfig};
use crate::strategy::types::{Position, PriceTrackingState};

/// Why a stop fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::StopLoss => write!(f, "stop-loss"),
            StopReason::TakeProfit => write!(f, "take-profit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopAction {
    None,
    CloseAll(StopReason),
}

/// Stop check against the position's average cost
///
/// Long: stop-loss at `cost * (1 - stop_loss)`, take-profit at
/// `cost * (1 + take_profit)`. Short mirrors both. Zero fractions disable the
/// corresponding leg.
pub fn check_stop(
    position: &Position,
    current_price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
) -> StopAction {
    evaluate(
        position,
        position.average_cost,
        position.average_cost,
        current_price,
        stop_loss,
        take_profit,
    )
}

/// Stop check anchored on the tracked fill price
///
/// The stop-loss leg is anchored on `tracking.highest_price` of a long
/// (`lowest_price` of a short); take-profit stays on average cost. Those are
/// the prices of the latest fill, not running market extremes: the anchor only
/// moves when we trade, and a partial exit at a lower price lowers it. Without
/// a tracked price this is the plain [`check_stop`].
pub fn check_trailing_stop(
    position: &Position,
    tracking: &PriceTrackingState,
    current_price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
) -> StopAction {
    let anchor = if position.is_long() && tracking.highest_price > Decimal::ZERO {
        tracking.highest_price
    } else if position.is_short() && tracking.lowest_price > Decimal::ZERO {
        tracking.lowest_price
    } else {
        position.average_cost
    };
    evaluate(
        position,
        anchor,
        position.average_cost,
        current_price,
        stop_loss,
        take_profit,
    )
}

fn evaluate(
    position: &Position,
    stop_anchor: Decimal,
    profit_anchor: Decimal,
    price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
) -> StopAction {
    if position.is_closed() || stop_anchor <= Decimal::ZERO || profit_anchor <= Decimal::ZERO {
        return StopAction::None;
    }

    let (stop_hit, profit_hit) = if position.is_long() {
        (
            price <= stop_anchor * (Decimal::ONE - stop_loss),
            price >= profit_anchor * (Decimal::ONE + take_profit),
        )
    } else {
        (
            price >= stop_anchor * (Decimal::ONE + stop_loss),
            price <= profit_anchor * (Decimal::ONE - take_profit),
        )
    };

    if stop_loss > Decimal::ZERO && stop_hit {
        StopAction::CloseAll(StopReason::StopLoss)
    } else if take_profit > Decimal::ZERO && profit_hit {
        StopAction::CloseAll(StopReason::TakeProfit)
    } else {
        StopAction::None
    }
}

/// Whether risk-increasing orders are allowed
///
/// Denied when `drawdown > max_drawdown` or `daily_pnl < -daily_loss_limit`.
/// A zero limit disables its check.
pub fn check_limits(drawdown: Decimal, daily_pnl: Decimal, limits: &RiskLimits) -> bool {
    if limits.max_drawdown > Decimal::ZERO && drawdown > limits.max_drawdown {
        return false;
    }
    if limits.daily_loss_limit > Decimal::ZERO && daily_pnl < -limits.daily_loss_limit {
        return false;
    }
    true
}

/// Strongest target reachable from `current` without adding risk
///
/// Keeps the target if it shrinks the position on the same side, flattens when
/// it would flip sides, and holds the position otherwise.
pub fn reduce_only_target(current: Decimal, target: Decimal) -> Decimal {
    if current.is_zero() {
        return Decimal::ZERO;
    }
    if current.is_sign_positive() != target.is_sign_positive() && !target.is_zero() {
        return Decimal::ZERO;
    }
    if target.abs() < current.abs() {
        target
    } else {
        current
    }
}

/// Peak-to-current account value drawdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawdownTracker {
    peak: Decimal,
    current: Decimal,
}

impl DrawdownTracker {
    pub fn new(initial_value: Decimal) -> Self {
        Self {
            peak: initial_value,
            current: initial_value,
        }
    }

    /// Record an account value and return the drawdown as a fraction of peak
    pub fn update(&mut self, value: Decimal) -> Decimal {
        self.current = value;
        if value > self.peak {
            self.peak = value;
        }
        self.drawdown()
    }

    pub fn drawdown(&self) -> Decimal {
        if self.peak <= Decimal::ZERO || self.current >= self.peak {
            return Decimal::ZERO;
        }
        (self.peak - self.current) / self.peak
    }

    pub fn peak(&self) -> Decimal {
        self.peak
    }

    pub fn current(&self) -> Decimal {
        self.current
    }
}

/// Stop and limit parameters fixed at strategy start
#[derive(Debug, Clone)]
pub struct RiskGovernor {
    stop_loss: Decimal,
    take_profit: Decimal,
    trailing: bool,
    limits: RiskLimits,
}

impl RiskGovernor {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            stop_loss: config.stop_loss,
            take_profit: config.take_profit,
            trailing: config.trailing_stop,
            limits: config.risk.clone(),
        }
    }

    pub fn check_stop(
        &self,
        position: &Position,
        tracking: &PriceTrackingState,
        current_price: Decimal,
    ) -> StopAction {
        if self.trailing {
            check_trailing_stop(
                position,
                tracking,
                current_price,
                self.stop_loss,
                self.take_profit,
            )
        } else {
            check_stop(position, current_price, self.stop_loss, self.take_profit)
        }
    }

    pub fn allows_new_risk(&self, drawdown: Decimal, daily_pnl: Decimal) -> bool {
        check_limits(drawdown, daily_pnl, &self.limits)
    }

    /// Clamp the absolute target to the position size limit
    pub fn clamp_target(&self, target: Decimal) -> Decimal {
        let limit = self.limits.position_size_limit;
        if limit <= Decimal::ZERO {
            return target;
        }
        target.max(-limit).min(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(base: Decimal, cost: Decimal) -> Position {
        Position {
            base,
            average_cost: cost,
            ..Position::new("BTCUSDT")
        }
    }

    #[test]
    fn test_long_stop_loss() {
        let pos = position(dec!(1), dec!(100));
        assert_eq!(
            check_stop(&pos, dec!(94), dec!(0.05), dec!(0.1)),
            StopAction::CloseAll(StopReason::StopLoss)
        );
        assert_eq!(check_stop(&pos, dec!(96), dec!(0.05), dec!(0.1)), StopAction::None);
        assert_eq!(
            check_stop(&pos, dec!(110), dec!(0.05), dec!(0.1)),
            StopAction::CloseAll(StopReason::TakeProfit)
        );
    }

    #[test]
    fn test_short_stops_mirror_long() {
        let pos = position(dec!(-1), dec!(100));
        assert_eq!(
            check_stop(&pos, dec!(106), dec!(0.05), dec!(0.1)),
            StopAction::CloseAll(StopReason::StopLoss)
        );
        assert_eq!(
            check_stop(&pos, dec!(89), dec!(0.05), dec!(0.1)),
            StopAction::CloseAll(StopReason::TakeProfit)
        );
        assert_eq!(check_stop(&pos, dec!(97), dec!(0.05), dec!(0.1)), StopAction::None);
    }

    #[test]
    fn test_zero_fractions_disable_stops() {
        let pos = position(dec!(1), dec!(100));
        assert_eq!(check_stop(&pos, dec!(1), Decimal::ZERO, Decimal::ZERO), StopAction::None);
        assert_eq!(
            check_stop(&Position::new("BTCUSDT"), dec!(1), dec!(0.05), dec!(0.1)),
            StopAction::None
        );
    }

    #[test]
    fn test_trailing_stop_follows_highest_price() {
        let pos = position(dec!(1), dec!(100));
        let tracking = PriceTrackingState {
            buy_price: dec!(120),
            highest_price: dec!(120),
            ..Default::default()
        };
        // 120 * 0.95 = 114
        assert_eq!(
            check_trailing_stop(&pos, &tracking, dec!(113), dec!(0.05), Decimal::ZERO),
            StopAction::CloseAll(StopReason::StopLoss)
        );
        assert_eq!(
            check_stop(&pos, dec!(113), dec!(0.05), Decimal::ZERO),
            StopAction::None
        );
    }

    #[test]
    fn test_partial_exit_lowers_stop_anchor() {
        let at_entry = PriceTrackingState {
            buy_price: dec!(120),
            highest_price: dec!(120),
            ..Default::default()
        };
        let after_partial_exit = PriceTrackingState {
            buy_price: dec!(120),
            highest_price: dec!(110),
            ..Default::default()
        };
        let pos = position(dec!(0.5), dec!(100));
        assert_eq!(
            check_trailing_stop(&pos, &at_entry, dec!(110), dec!(0.05), Decimal::ZERO),
            StopAction::CloseAll(StopReason::StopLoss)
        );
        // 110 * 0.95 = 104.5
        assert_eq!(
            check_trailing_stop(&pos, &after_partial_exit, dec!(110), dec!(0.05), Decimal::ZERO),
            StopAction::None
        );
        assert_eq!(
            check_trailing_stop(&pos, &after_partial_exit, dec!(104), dec!(0.05), Decimal::ZERO),
            StopAction::CloseAll(StopReason::StopLoss)
        );
    }

    #[test]
    fn test_check_limits() {
        let limits = RiskLimits {
            max_drawdown: dec!(0.1),
            daily_loss_limit: dec!(100),
            position_size_limit: Decimal::ZERO,
        };
        assert!(!check_limits(dec!(0.2), dec!(-50), &limits));
        assert!(!check_limits(dec!(0.05), dec!(-150), &limits));
        assert!(check_limits(dec!(0.05), dec!(-50), &limits));
        assert!(check_limits(dec!(0.5), dec!(-1000), &RiskLimits::default()));
    }

    #[test]
    fn test_reduce_only_target() {
        assert_eq!(reduce_only_target(dec!(5), dec!(2)), dec!(2));
        assert_eq!(reduce_only_target(dec!(5), dec!(8)), dec!(5));
        assert_eq!(reduce_only_target(dec!(5), dec!(-3)), Decimal::ZERO);
        assert_eq!(reduce_only_target(dec!(-4), dec!(-1)), dec!(-1));
        assert_eq!(reduce_only_target(Decimal::ZERO, dec!(3)), Decimal::ZERO);
    }

    #[test]
    fn test_drawdown_tracker() {
        let mut tracker = DrawdownTracker::new(dec!(1000));
        assert_eq!(tracker.update(dec!(1200)), Decimal::ZERO);
        assert_eq!(tracker.update(dec!(900)), dec!(0.25));
        assert_eq!(tracker.peak(), dec!(1200));
    }

    #[test]
    fn test_clamp_target() {
        let mut cfg = StrategyConfig::for_market(crate::common::types::Market {
            symbol: "BTCUSDT".to_string(),
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            price_precision: 2,
            volume_precision: 4,
            min_quantity: Decimal::ZERO,
            min_notional: Decimal::ZERO,
        });
        cfg.risk.position_size_limit = dec!(3);
        let governor = RiskGovernor::from_config(&cfg);
        assert_eq!(governor.clamp_target(dec!(5)), dec!(3));
        assert_eq!(governor.clamp_target(dec!(-5)), dec!(-3));
        assert_eq!(governor.clamp_target(dec!(2)), dec!(2));
    }
}

//! Position accounting and profit statistics
//!
//! [`Position`] uses average-cost accounting; [`ProfitStats`] and
//! [`TradeStats`] summarize realized results for logs and reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{Fill, Market};

/// Realized result of a fill that reduced the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profit {
    /// Gross realized profit in quote currency
    pub profit: Decimal,
    /// Profit after the fill's fee
    pub net_profit: Decimal,
    pub fee: Decimal,
    /// Base quantity that was closed
    pub quantity: Decimal,
}

/// Current position in the traded market
///
/// Positive base = long, negative = short. Mutated only through [`Position::apply_fill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub base: Decimal,
    /// Average entry price of the open quantity
    pub average_cost: Decimal,
    /// Realized profit accumulated over every closing fill
    pub accumulated_profit: Decimal,
    /// Fees paid over every fill
    pub accumulated_fee: Decimal,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            base: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            accumulated_profit: Decimal::ZERO,
            accumulated_fee: Decimal::ZERO,
        }
    }

    pub fn is_long(&self) -> bool {
        self.base > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.base < Decimal::ZERO
    }

    pub fn is_closed(&self) -> bool {
        self.base.is_zero()
    }

    pub fn is_dust(&self, market: &Market, price: Decimal) -> bool {
        market.is_dust(self.base, price)
    }

    /// Mark-to-market profit of the open quantity
    pub fn unrealized_profit(&self, price: Decimal) -> Decimal {
        (price - self.average_cost) * self.base
    }

    /// Apply an execution with average-cost accounting
    ///
    /// Returns the realized profit when the fill closes (part of) the position.
    /// A fill larger than the open quantity closes it and opens the remainder
    /// on the other side at the fill price.
    pub fn apply_fill(&mut self, fill: &Fill) -> Option<Profit> {
        let signed_qty = fill.side.sign() * fill.quantity;
        self.accumulated_fee += fill.fee;

        let increasing = self.base.is_zero()
            || (self.base > Decimal::ZERO) == (signed_qty > Decimal::ZERO);

        if increasing {
            let old_abs = self.base.abs();
            let new_base = self.base + signed_qty;
            if !new_base.is_zero() {
                self.average_cost =
                    (self.average_cost * old_abs + fill.price * fill.quantity) / new_base.abs();
            }
            self.base = new_base;
            return None;
        }

        let closing = fill.quantity.min(self.base.abs());
        let direction = if self.is_long() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let profit = (fill.price - self.average_cost) * closing * direction;
        let remainder = fill.quantity - closing;

        self.base += signed_qty;
        if self.base.is_zero() {
            self.average_cost = Decimal::ZERO;
        } else if remainder > Decimal::ZERO {
            self.average_cost = fill.price;
        }
        self.accumulated_profit += profit;

        Some(Profit {
            profit,
            net_profit: profit - fill.fee,
            fee: fill.fee,
            quantity: closing,
        })
    }
}

/// Profit and loss summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitStats {
    pub accumulated_pnl: Decimal,
    pub accumulated_net_profit: Decimal,
    pub accumulated_fee: Decimal,
    /// Profit since the last day boundary
    pub today_pnl: Decimal,
    pub today_net_profit: Decimal,
}

impl ProfitStats {
    pub fn add_fee(&mut self, fee: Decimal) {
        self.accumulated_fee += fee;
    }

    pub fn add_profit(&mut self, profit: &Profit) {
        self.accumulated_pnl += profit.profit;
        self.accumulated_net_profit += profit.net_profit;
        self.today_pnl += profit.profit;
        self.today_net_profit += profit.net_profit;
    }

    /// Called on the day boundary
    pub fn reset_today(&mut self) {
        self.today_pnl = Decimal::ZERO;
        self.today_net_profit = Decimal::ZERO;
    }
}

/// Win/loss statistics over realized profits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStats {
    pub symbol: String,
    pub num_of_profit_trades: u64,
    pub num_of_loss_trades: u64,
    pub gross_profit: Decimal,
    /// Sum of losing trades, non-positive
    pub gross_loss: Decimal,
    pub largest_profit: Decimal,
    pub largest_loss: Decimal,
}

impl TradeStats {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Record one realized profit; zero results count as neither win nor loss
    pub fn add_profit(&mut self, profit: Decimal) {
        if profit > Decimal::ZERO {
            self.num_of_profit_trades += 1;
            self.gross_profit += profit;
            self.largest_profit = self.largest_profit.max(profit);
        } else if profit < Decimal::ZERO {
            self.num_of_loss_trades += 1;
            self.gross_loss += profit;
            self.largest_loss = self.largest_loss.min(profit);
        }
    }

    pub fn num_of_trades(&self) -> u64 {
        self.num_of_profit_trades + self.num_of_loss_trades
    }

    /// Winning trades over decided trades, 0 with no trades
    pub fn winning_ratio(&self) -> Decimal {
        let total = self.num_of_trades();
        if total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.num_of_profit_trades) / Decimal::from(total)
    }

    /// Gross profit over absolute gross loss
    ///
    /// With no losing trades the denominator counts as one quote unit, so the
    /// factor equals the gross profit.
    pub fn profit_factor(&self) -> Decimal {
        if self.gross_loss.is_zero() {
            return self.gross_profit;
        }
        self.gross_profit / self.gross_loss.abs()
    }
}

impl std::fmt::Display for TradeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} trades={} wins={} losses={} winRatio={} profitFactor={} grossProfit={} grossLoss={}",
            self.symbol,
            self.num_of_trades(),
            self.num_of_profit_trades,
            self.num_of_loss_trades,
            self.winning_ratio().round_dp(4),
            self.profit_factor().round_dp(4),
            self.gross_profit,
            self.gross_loss
        )
    }
}

/// Reference prices of the latest position-changing fills
///
/// Owned by the decision loop and replaced only on fills; chart and trailing
/// stop consumers receive it explicitly. Market prices between fills never
/// move these values, so `highest_price`/`lowest_price` are the price of the
/// latest fill on an open long/short, not a running extreme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTrackingState {
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub highest_price: Decimal,
    pub lowest_price: Decimal,
}

impl PriceTrackingState {
    /// Tracking state after a fill at `price` left the position as `position`
    pub fn after_fill(position: &Position, market: &Market, price: Decimal) -> Self {
        if position.is_dust(market, price) {
            Self::default()
        } else if position.is_long() {
            Self {
                buy_price: price,
                sell_price: Decimal::ZERO,
                highest_price: price,
                lowest_price: Decimal::ZERO,
            }
        } else {
            Self {
                buy_price: Decimal::ZERO,
                sell_price: price,
                highest_price: Decimal::ZERO,
                lowest_price: price,
            }
        }
    }
}

/// State carried across restarts by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    pub position: Position,
    pub profit_stats: ProfitStats,
    pub trade_stats: TradeStats,
    #[serde(default)]
    pub price_tracking: PriceTrackingState,
}

impl StrategyState {
    pub fn fresh(symbol: &str) -> Self {
        Self {
            position: Position::new(symbol),
            profit_stats: ProfitStats::default(),
            trade_stats: TradeStats::new(symbol),
            price_tracking: PriceTrackingState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn fill(side: Side, price: Decimal, quantity: Decimal, fee: Decimal) -> Fill {
        Fill {
            symbol: "BTCUSDT".to_string(),
            side,
            price,
            quantity,
            fee,
            timestamp: Utc::now(),
        }
    }

    fn market() -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            price_precision: 2,
            volume_precision: 4,
            min_quantity: dec!(0.001),
            min_notional: dec!(5),
        }
    }

    #[test]
    fn test_average_cost_on_increase() {
        let mut pos = Position::new("BTCUSDT");
        assert!(pos.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), dec!(0.1))).is_none());
        assert!(pos.apply_fill(&fill(Side::Buy, dec!(110), dec!(1), dec!(0.1))).is_none());
        assert_eq!(pos.base, dec!(2));
        assert_eq!(pos.average_cost, dec!(105));
        assert_eq!(pos.accumulated_fee, dec!(0.2));
    }

    #[test]
    fn test_partial_close_realizes_profit() {
        let mut pos = Position::new("BTCUSDT");
        pos.apply_fill(&fill(Side::Buy, dec!(100), dec!(2), Decimal::ZERO));
        let profit = pos
            .apply_fill(&fill(Side::Sell, dec!(120), dec!(1), dec!(0.5)))
            .unwrap();
        assert_eq!(profit.profit, dec!(20));
        assert_eq!(profit.net_profit, dec!(19.5));
        assert_eq!(profit.quantity, dec!(1));
        assert_eq!(pos.base, dec!(1));
        assert_eq!(pos.average_cost, dec!(100));
    }

    #[test]
    fn test_short_close_and_reversal() {
        let mut pos = Position::new("BTCUSDT");
        pos.apply_fill(&fill(Side::Sell, dec!(100), dec!(1), Decimal::ZERO));
        assert!(pos.is_short());

        // buy 3 at 90: closes 1 short for +10, opens 2 long at 90
        let profit = pos
            .apply_fill(&fill(Side::Buy, dec!(90), dec!(3), Decimal::ZERO))
            .unwrap();
        assert_eq!(profit.profit, dec!(10));
        assert_eq!(pos.base, dec!(2));
        assert_eq!(pos.average_cost, dec!(90));
        assert_eq!(pos.accumulated_profit, dec!(10));
    }

    #[test]
    fn test_full_close_resets_cost() {
        let mut pos = Position::new("BTCUSDT");
        pos.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), Decimal::ZERO));
        let profit = pos
            .apply_fill(&fill(Side::Sell, dec!(95), dec!(1), Decimal::ZERO))
            .unwrap();
        assert_eq!(profit.profit, dec!(-5));
        assert!(pos.is_closed());
        assert_eq!(pos.average_cost, Decimal::ZERO);
    }

    #[test]
    fn test_trade_stats_ratios() {
        let mut stats = TradeStats::new("BTCUSDT");
        assert_eq!(stats.winning_ratio(), Decimal::ZERO);
        assert_eq!(stats.profit_factor(), Decimal::ZERO);

        stats.add_profit(dec!(30));
        stats.add_profit(dec!(10));
        assert_eq!(stats.profit_factor(), dec!(40));

        stats.add_profit(dec!(-20));
        stats.add_profit(Decimal::ZERO);
        assert_eq!(stats.num_of_trades(), 3);
        assert_eq!(stats.profit_factor(), dec!(2));
        assert_eq!(stats.winning_ratio().round_dp(4), dec!(0.6667));
        assert_eq!(stats.largest_loss, dec!(-20));
    }

    #[test]
    fn test_profit_stats_today_reset() {
        let mut stats = ProfitStats::default();
        stats.add_profit(&Profit {
            profit: dec!(-12),
            net_profit: dec!(-13),
            fee: dec!(1),
            quantity: dec!(1),
        });
        assert_eq!(stats.today_pnl, dec!(-12));
        stats.reset_today();
        assert_eq!(stats.today_pnl, Decimal::ZERO);
        assert_eq!(stats.accumulated_pnl, dec!(-12));
        assert_eq!(stats.accumulated_net_profit, dec!(-13));
    }

    #[test]
    fn test_price_tracking_after_fill() {
        let market = market();
        let mut pos = Position::new("BTCUSDT");
        pos.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), Decimal::ZERO));
        let tracking = PriceTrackingState::after_fill(&pos, &market, dec!(100));
        assert_eq!(tracking.buy_price, dec!(100));
        assert_eq!(tracking.highest_price, dec!(100));

        pos.apply_fill(&fill(Side::Sell, dec!(101), dec!(2), Decimal::ZERO));
        let tracking = PriceTrackingState::after_fill(&pos, &market, dec!(101));
        assert_eq!(tracking.sell_price, dec!(101));
        assert_eq!(tracking.lowest_price, dec!(101));
        assert_eq!(tracking.buy_price, Decimal::ZERO);

        pos.apply_fill(&fill(Side::Buy, dec!(101), dec!(0.9995), Decimal::ZERO));
        let tracking = PriceTrackingState::after_fill(&pos, &market, dec!(101));
        assert_eq!(tracking, PriceTrackingState::default());
    }
}

//! Turns a desired position change into child limit orders
//!
//! The limit price sits `spread` away from the close on the passive side:
//! `close * (1 - bid_spread)` for buys, `close * (1 + ask_spread)` for sells.
//! When a depth calibration floor is configured, thin books widen the spread
//! by `floor / depth`, up to `max_spread_multiplier` times the base spread.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::common::errors::{Result, StrategyError};
use crate::common::types::{Market, OrderBook, OrderInstruction, Side};
use crate::config::types::StrategyConfig;

#[derive(Debug, Clone)]
pub struct OrderPlanner {
    market: Market,
    chunk_count: usize,
    bid_spread: Decimal,
    ask_spread: Decimal,
    depth_floor: Decimal,
    depth_levels: usize,
    max_spread_multiplier: Decimal,
}

impl OrderPlanner {
    /// Planner for a validated strategy configuration
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            market: config.market.clone(),
            chunk_count: config.chunk_count,
            bid_spread: config.bid_spread,
            ask_spread: config.ask_spread,
            depth_floor: config.depth_calibration_floor,
            depth_levels: config.depth_levels,
            max_spread_multiplier: config.max_spread_multiplier,
        }
    }

    /// Spread for `side`, calibrated against the latest book if enabled
    pub fn spread(&self, side: Side, book: Option<&OrderBook>) -> Decimal {
        let base = match side {
            Side::Buy => self.bid_spread,
            Side::Sell => self.ask_spread,
        };
        if self.depth_floor <= Decimal::ZERO {
            return base;
        }
        let max_spread = base * self.max_spread_multiplier;
        let depth = book
            .map(|b| b.depth(self.depth_levels))
            .unwrap_or(Decimal::ZERO);
        if depth <= Decimal::ZERO {
            return max_spread;
        }
        if depth >= self.depth_floor {
            return base;
        }
        (base * self.depth_floor / depth).min(max_spread)
    }

    /// Limit price for `side` at `spread` from `close`, rounded to the
    /// market's tick towards the passive side
    pub fn limit_price(&self, side: Side, close: Decimal, spread: Decimal) -> Decimal {
        match side {
            Side::Buy => (close * (Decimal::ONE - spread))
                .round_dp_with_strategy(self.market.price_precision, RoundingStrategy::ToZero),
            Side::Sell => (close * (Decimal::ONE + spread))
                .round_dp_with_strategy(self.market.price_precision, RoundingStrategy::AwayFromZero),
        }
    }

    /// Plan the child orders moving the position by `delta`
    ///
    /// Returns `InvalidQuantity` for a zero delta or a limit price that would
    /// not be positive; the chunk quantities always sum to `|delta|`.
    pub fn plan(
        &self,
        delta: Decimal,
        close: Decimal,
        book: Option<&OrderBook>,
    ) -> Result<Vec<OrderInstruction>> {
        let side = Side::from_delta(delta)
            .ok_or_else(|| StrategyError::InvalidQuantity("zero position delta".into()))?;
        if close <= Decimal::ZERO {
            return Err(StrategyError::InvalidQuantity(format!(
                "non-positive close price {}",
                close
            )));
        }

        let spread = self.spread(side, book);
        let price = self.limit_price(side, close, spread);
        if price <= Decimal::ZERO {
            return Err(StrategyError::InvalidQuantity(format!(
                "non-positive {} limit price {} at spread {}",
                side, price, spread
            )));
        }
        let chunks = split_chunks(delta.abs(), self.chunk_count, self.market.volume_precision)?;

        debug!(
            side = %side,
            delta = %delta,
            spread = %spread,
            price = %price,
            chunks = chunks.len(),
            "Order plan"
        );

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, quantity)| OrderInstruction {
                symbol: self.market.symbol.clone(),
                side,
                quantity,
                price,
                chunk_index,
            })
            .collect())
    }
}

/// Split `quantity` into `chunk_count` equal chunks, the last one taking the
/// remainder
///
/// Chunks are rounded down to `precision` decimals. A quantity too small to
/// split at that precision is returned as a single chunk.
pub fn split_chunks(quantity: Decimal, chunk_count: usize, precision: u32) -> Result<Vec<Decimal>> {
    if chunk_count == 0 {
        return Err(StrategyError::InvalidQuantity("chunk count must be >= 1".into()));
    }
    if quantity <= Decimal::ZERO {
        return Err(StrategyError::InvalidQuantity(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }

    let chunk = (quantity / Decimal::from(chunk_count))
        .round_dp_with_strategy(precision, RoundingStrategy::ToZero);
    if chunk.is_zero() {
        return Ok(vec![quantity]);
    }

    let mut chunks = vec![chunk; chunk_count - 1];
    chunks.push(quantity - chunk * Decimal::from(chunk_count - 1));
    Ok(chunks)
}

//! Target position sizing
//!
//! The decision loop talks to sizing through [`SizeCalculator`], so the
//! alpha-weighted rule can be swapped without touching the tick path.

use rust_decimal::Decimal;

use crate::config::types::QuantityOrAmount;

/// Inputs of one sizing decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInput {
    /// Base order size in base units
    pub base_order_size: Decimal,
    /// Ranked alpha read for this tick, expected in [-1, 1]
    pub alpha: Decimal,
    /// Trend strength factor, neutral at 1
    pub trend_strength: Decimal,
    /// Volatility factor, neutral at 1
    pub volatility: Decimal,
}

/// SizeCalculator trait
///
/// Maps a sizing input to the signed target position in base units, or
/// `None` when the target is not representable.
/// Called synchronously in the tick path; implementations must not block.
pub trait SizeCalculator: Send + Sync {
    fn target_position(&self, input: &SizingInput) -> Option<Decimal>;

    /// Signed quantity needed to move from `current` to the target
    fn delta(&self, input: &SizingInput, current: Decimal) -> Option<Decimal> {
        self.target_position(input)?.checked_sub(current)
    }
}

/// Alpha-weighted inventory sizing
///
/// `target = base_order_size * alpha * trend_strength * volatility`; a zero in
/// any factor means flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaWeightedSizer;

impl SizeCalculator for AlphaWeightedSizer {
    fn target_position(&self, input: &SizingInput) -> Option<Decimal> {
        target_position(
            input.base_order_size,
            input.alpha,
            input.trend_strength,
            input.volatility,
        )
    }
}

/// `None` when the product overflows the decimal range
pub fn target_position(
    base_order_size: Decimal,
    alpha: Decimal,
    trend_strength: Decimal,
    volatility: Decimal,
) -> Option<Decimal> {
    base_order_size
        .checked_mul(alpha)?
        .checked_mul(trend_strength)?
        .checked_mul(volatility)
}

/// Base order size at `price` from the configured quantity or quote amount
pub fn base_order_size(sizing: &QuantityOrAmount, price: Decimal) -> Decimal {
    sizing.calculate_quantity(price)
}

/// Boxed size calculator for dynamic dispatch
pub type BoxedSizeCalculator = Box<dyn SizeCalculator>;

//! Trait definitions for the collaborators around the decision loop

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::Result;
use super::types::OrderInstruction;

/// Order execution collaborator
///
/// Accepts order instructions and reports fills asynchronously through the
/// strategy event queue. Timeouts and retries are the implementation's concern.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Submit child orders; ownership of the instructions passes to the executor
    async fn submit_orders(&self, orders: &[OrderInstruction]) -> Result<()>;

    /// Cancel every resting order this strategy owns
    async fn cancel_all_own_orders(&self) -> Result<()>;

    /// Close a fraction (0, 1] of the current position at market
    async fn close_position(&self, fraction: Decimal) -> Result<()>;

    /// Latest close seen by the strategy for `symbol`
    ///
    /// Venues that price market closes themselves can ignore it.
    async fn mark_price(&self, _symbol: &str, _price: Decimal) {}
}

/// Account balances in base and quote currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub base: Decimal,
    pub quote: Decimal,
}

impl Balances {
    /// Total account value in quote currency at `price`
    pub fn asset_value(&self, price: Decimal) -> Decimal {
        self.base * price + self.quote
    }
}

/// Position/account state collaborator
#[cfg_attr(test, mockall::automock)]
pub trait AccountState: Send + Sync {
    /// Current total balances for the traded market
    fn balances(&self) -> Result<Balances>;
}

/// Alpha signal collaborator
///
/// Exposes ranked values indexable from the most recent (`k = 0`).
pub trait AlphaSource: Send + Sync {
    /// Ranked value `k` positions back from the most recent
    fn ranked_value(&self, k: usize) -> Result<f64>;

    /// Publish a new value
    fn push(&mut self, value: f64);
}

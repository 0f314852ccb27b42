//! In-process order execution for dry runs and tests
//!
//! [`PaperOrderExecutor`] records every instruction it receives. When built
//! with a fill sender it also fills each instruction in full at its limit
//! price, and each position close at the latest mark price, publishing the
//! [`Fill`] on the strategy event queue and keeping [`PaperAccount`] balances
//! in step. The executor only holds a weak handle on the queue, so it closes
//! once every producer is gone.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::common::errors::{Result, StrategyError};
use crate::common::traits::{AccountState, Balances, OrderExecutor};
use crate::common::types::{Fill, OrderInstruction, Side, StrategyEvent};

/// Balances updated from paper fills
#[derive(Debug, Default)]
pub struct PaperAccount {
    balances: RwLock<Balances>,
}

impl PaperAccount {
    pub fn new(balances: Balances) -> Self {
        Self {
            balances: RwLock::new(balances),
        }
    }

    pub fn apply_fill(&self, fill: &Fill) -> Result<()> {
        let mut balances = self
            .balances
            .write()
            .map_err(|e| StrategyError::Account(e.to_string()))?;
        let notional = fill.price * fill.quantity;
        match fill.side {
            Side::Buy => {
                balances.base += fill.quantity;
                balances.quote -= notional;
            }
            Side::Sell => {
                balances.base -= fill.quantity;
                balances.quote += notional;
            }
        }
        balances.quote -= fill.fee;
        Ok(())
    }
}

impl AccountState for PaperAccount {
    fn balances(&self) -> Result<Balances> {
        self.balances
            .read()
            .map(|b| *b)
            .map_err(|e| StrategyError::Account(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct PaperLedger {
    submitted: Vec<OrderInstruction>,
    cancel_requests: usize,
    close_requests: Vec<Decimal>,
    /// Symbol and price of the latest mark
    mark: Option<(String, Decimal)>,
}

pub struct PaperOrderExecutor {
    ledger: Mutex<PaperLedger>,
    account: Option<Arc<PaperAccount>>,
    fills: Option<mpsc::WeakSender<StrategyEvent>>,
    fee_rate: Decimal,
    reject_submissions: bool,
}

impl PaperOrderExecutor {
    /// Executor that only records instructions
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(PaperLedger::default()),
            account: None,
            fills: None,
            fee_rate: Decimal::ZERO,
            reject_submissions: false,
        }
    }

    /// Executor that fills every instruction immediately
    pub fn with_fills(
        account: Arc<PaperAccount>,
        fills: &mpsc::Sender<StrategyEvent>,
        fee_rate: Decimal,
    ) -> Self {
        Self {
            account: Some(account),
            fills: Some(fills.downgrade()),
            fee_rate,
            ..Self::new()
        }
    }

    /// Fail every submission with `ExternalIo`
    pub fn rejecting() -> Self {
        Self {
            reject_submissions: true,
            ..Self::new()
        }
    }

    pub async fn submitted(&self) -> Vec<OrderInstruction> {
        self.ledger.lock().await.submitted.clone()
    }

    pub async fn cancel_requests(&self) -> usize {
        self.ledger.lock().await.cancel_requests
    }

    pub async fn close_requests(&self) -> Vec<Decimal> {
        self.ledger.lock().await.close_requests.clone()
    }

    /// Market order closing `fraction` of the paper account's base balance
    fn closing_order(
        &self,
        fraction: Decimal,
        mark: Option<&(String, Decimal)>,
    ) -> Result<Option<OrderInstruction>> {
        let Some(account) = &self.account else {
            return Ok(None);
        };
        let base = account.balances()?.base;
        let Some(side) = Side::from_delta(-base) else {
            return Ok(None);
        };
        let Some((symbol, price)) = mark else {
            warn!(base = %base, "No mark price yet, paper close not filled");
            return Ok(None);
        };
        Ok(Some(OrderInstruction {
            symbol: symbol.clone(),
            side,
            quantity: base.abs() * fraction,
            price: *price,
            chunk_index: 0,
        }))
    }

    fn publish_fill(&self, order: &OrderInstruction) -> Result<()> {
        let Some(weak) = &self.fills else {
            return Ok(());
        };
        let sender = weak
            .upgrade()
            .ok_or_else(|| StrategyError::ChannelSend("event queue closed".into()))?;
        let fill = Fill {
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            fee: order.notional() * self.fee_rate,
            timestamp: Utc::now(),
        };
        // never wait on the queue: the consumer may be the caller
        let permit = sender
            .try_reserve()
            .map_err(|e| StrategyError::ChannelSend(e.to_string()))?;
        if let Some(account) = &self.account {
            account.apply_fill(&fill)?;
        }
        permit.send(StrategyEvent::Fill(fill));
        Ok(())
    }
}

impl Default for PaperOrderExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderExecutor for PaperOrderExecutor {
    async fn submit_orders(&self, orders: &[OrderInstruction]) -> Result<()> {
        if self.reject_submissions {
            return Err(StrategyError::ExternalIo("paper executor rejects orders".into()));
        }
        let mut ledger = self.ledger.lock().await;
        for order in orders {
            debug!(
                side = %order.side,
                quantity = %order.quantity,
                price = %order.price,
                chunk = order.chunk_index,
                "Paper order"
            );
            ledger.submitted.push(order.clone());
            if let Err(e) = self.publish_fill(order) {
                warn!(error = %e, "Paper fill dropped");
            }
        }
        Ok(())
    }

    async fn cancel_all_own_orders(&self) -> Result<()> {
        self.ledger.lock().await.cancel_requests += 1;
        Ok(())
    }

    async fn close_position(&self, fraction: Decimal) -> Result<()> {
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(StrategyError::InvalidQuantity(format!(
                "close fraction must be in (0, 1], got {}",
                fraction
            )));
        }
        info!(fraction = %fraction, "Paper close position");
        let mut ledger = self.ledger.lock().await;
        ledger.close_requests.push(fraction);

        if self.fills.is_some() {
            if let Some(order) = self.closing_order(fraction, ledger.mark.as_ref())? {
                self.publish_fill(&order)?;
            }
        }
        Ok(())
    }

    async fn mark_price(&self, symbol: &str, price: Decimal) {
        self.ledger.lock().await.mark = Some((symbol.to_string(), price));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(side: Side, quantity: Decimal, price: Decimal) -> OrderInstruction {
        OrderInstruction {
            symbol: "BTCUSDT".to_string(),
            side,
            quantity,
            price,
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn test_records_instructions() {
        let executor = PaperOrderExecutor::new();
        executor
            .submit_orders(&[order(Side::Buy, dec!(1), dec!(100))])
            .await
            .unwrap();
        executor.cancel_all_own_orders().await.unwrap();
        executor.close_position(Decimal::ONE).await.unwrap();

        assert_eq!(executor.submitted().await.len(), 1);
        assert_eq!(executor.cancel_requests().await, 1);
        assert_eq!(executor.close_requests().await, vec![Decimal::ONE]);
    }

    #[tokio::test]
    async fn test_fills_update_account_and_queue() {
        let account = Arc::new(PaperAccount::new(Balances {
            base: Decimal::ZERO,
            quote: dec!(1000),
        }));
        let (tx, mut rx) = mpsc::channel(8);
        let executor = PaperOrderExecutor::with_fills(account.clone(), &tx, dec!(0.001));

        executor
            .submit_orders(&[order(Side::Buy, dec!(2), dec!(100))])
            .await
            .unwrap();

        let balances = account.balances().unwrap();
        assert_eq!(balances.base, dec!(2));
        assert_eq!(balances.quote, dec!(799.8));

        match rx.recv().await {
            Some(StrategyEvent::Fill(fill)) => {
                assert_eq!(fill.quantity, dec!(2));
                assert_eq!(fill.fee, dec!(0.2));
            }
            other => panic!("expected fill, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_fills_at_mark_price() {
        let account = Arc::new(PaperAccount::new(Balances {
            base: dec!(4),
            quote: dec!(100),
        }));
        let (tx, mut rx) = mpsc::channel(8);
        let executor = PaperOrderExecutor::with_fills(account.clone(), &tx, Decimal::ZERO);

        // nothing to price the close against yet
        executor.close_position(dec!(0.5)).await.unwrap();
        assert!(rx.try_recv().is_err());

        executor.mark_price("BTCUSDT", dec!(90)).await;
        executor.close_position(dec!(0.5)).await.unwrap();
        match rx.try_recv() {
            Ok(StrategyEvent::Fill(fill)) => {
                assert_eq!(fill.side, Side::Sell);
                assert_eq!(fill.quantity, dec!(2));
                assert_eq!(fill.price, dec!(90));
            }
            other => panic!("expected closing fill, got {:?}", other),
        }
        assert_eq!(account.balances().unwrap().base, dec!(2));
        assert_eq!(executor.close_requests().await, vec![dec!(0.5), dec!(0.5)]);
    }

    #[tokio::test]
    async fn test_rejecting_executor() {
        let executor = PaperOrderExecutor::rejecting();
        let err = executor
            .submit_orders(&[order(Side::Sell, dec!(1), dec!(100))])
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::ExternalIo(_)));
        assert!(executor.close_position(dec!(1.5)).await.is_err());
    }
}

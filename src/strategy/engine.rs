//! Decision loop of the alpha-weighted inventory strategy
//!
//! One [`Strategy`] owns all mutable strategy state and is driven by a single
//! consumer of the event queue, so events are processed strictly in order.
//!
//! ```text
//!   Idle ──start──▶ Running ◀──resume── Suspended
//!                     │  └────suspend────▶  │
//!                     └──emergency_stop / stop──▶ Stopped
//! ```
//!
//! On every closed bar of the configured interval:
//! 1. drop bars not newer than the last processed one
//! 2. update the regime estimators and the drawdown tracker
//! 3. check stop-loss/take-profit; a hit closes the position and ends the tick
//! 4. read the ranked alpha, size the target position, clamp it to the limit
//! 5. cancel resting orders, apply the risk gate, plan and submit child orders

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::{Result, StrategyError};
use crate::common::traits::{AccountState, AlphaSource, OrderExecutor};
use crate::common::types::{ControlCommand, Fill, KLine, OrderBook, OrderInstruction, StrategyEvent};
use crate::config::types::StrategyConfig;
use crate::report::{AccumulatedProfitReport, ChartSeries};
use crate::strategy::planner::OrderPlanner;
use crate::strategy::regime::MarketRegime;
use crate::strategy::risk::{reduce_only_target, DrawdownTracker, RiskGovernor, StopAction, StopReason};
use crate::strategy::signal::RankedValues;
use crate::strategy::sizing::{base_order_size, AlphaWeightedSizer, BoxedSizeCalculator, SizingInput};
use crate::strategy::types::{
    PriceTrackingState, Profit, ProfitStats, StrategyState, TradeStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyStatus {
    Idle,
    Running,
    Suspended,
    Stopped,
}

/// Why a bar produced no decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    Suspended,
    OtherMarket,
    /// Bar time not after the last processed bar
    Stale,
    /// Ranked alpha not available yet
    NoAlpha,
    /// Target position outside the representable decimal range
    Overflow,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// Position closed by a stop
    Stopped(StopReason),
    /// Already at target
    Hold,
    /// Risk gate denied the change and nothing could be reduced
    Denied,
    Submitted(Vec<OrderInstruction>),
}

pub struct Strategy {
    config: StrategyConfig,
    status: StrategyStatus,
    executor: Arc<dyn OrderExecutor>,
    account: Arc<dyn AccountState>,
    alpha: Box<dyn AlphaSource>,
    sizer: BoxedSizeCalculator,
    planner: OrderPlanner,
    governor: RiskGovernor,
    regime: MarketRegime,
    drawdown: Option<DrawdownTracker>,
    state: StrategyState,
    report: Option<AccumulatedProfitReport>,
    chart: Option<ChartSeries>,
    book: Option<OrderBook>,
    last_bar_time: Option<DateTime<Utc>>,
    last_day_boundary: Option<DateTime<Utc>>,
    last_price: Option<Decimal>,
    finalized: bool,
}

impl Strategy {
    /// Build an idle strategy; the configuration is validated here
    pub fn new(
        mut config: StrategyConfig,
        executor: Arc<dyn OrderExecutor>,
        account: Arc<dyn AccountState>,
    ) -> Result<Self> {
        config.validate()?;

        let report = if config.is_reporting() {
            config
                .accumulated_profit_report
                .as_ref()
                .map(AccumulatedProfitReport::new)
        } else {
            None
        };

        Ok(Self {
            status: StrategyStatus::Idle,
            executor,
            account,
            alpha: Box::new(RankedValues::new(config.window)),
            sizer: Box::new(AlphaWeightedSizer),
            planner: OrderPlanner::from_config(&config),
            governor: RiskGovernor::from_config(&config),
            regime: MarketRegime::new(config.regime.clone()),
            drawdown: None,
            state: StrategyState::fresh(&config.market.symbol),
            report,
            chart: None,
            book: None,
            last_bar_time: None,
            last_day_boundary: None,
            last_price: None,
            finalized: false,
            config,
        })
    }

    /// Replace the built-in ranked alpha buffer
    pub fn with_alpha_source(mut self, alpha: Box<dyn AlphaSource>) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_size_calculator(mut self, sizer: BoxedSizeCalculator) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.config.market.symbol
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn status(&self) -> StrategyStatus {
        self.status
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn profit_stats(&self) -> &ProfitStats {
        &self.state.profit_stats
    }

    pub fn trade_stats(&self) -> &TradeStats {
        &self.state.trade_stats
    }

    pub fn price_tracking(&self) -> &PriceTrackingState {
        &self.state.price_tracking
    }

    pub fn report(&self) -> Option<&AccumulatedProfitReport> {
        self.report.as_ref()
    }

    pub fn chart(&self) -> Option<&ChartSeries> {
        self.chart.as_ref()
    }

    /// Close of the last processed bar
    pub fn last_price(&self) -> Option<Decimal> {
        self.last_price
    }

    /// Current drawdown as a fraction of peak account value
    pub fn drawdown(&self) -> Decimal {
        self.drawdown
            .map(|d| d.drawdown())
            .unwrap_or(Decimal::ZERO)
    }

    /// Enter `Running`, restoring persisted state when given
    #[instrument(skip(self, persisted), fields(symbol = %self.config.market.symbol))]
    pub fn start(&mut self, persisted: Option<StrategyState>) -> Result<()> {
        if self.status != StrategyStatus::Idle {
            return Err(StrategyError::InvalidState(format!(
                "start requires Idle, strategy is {:?}",
                self.status
            )));
        }
        let balances = self.account.balances().map_err(|e| match e {
            StrategyError::Account(_) => e,
            other => StrategyError::Account(other.to_string()),
        })?;
        if let Some(state) = persisted {
            if state.position.symbol != self.config.market.symbol {
                return Err(StrategyError::Configuration(format!(
                    "persisted position is for {}, strategy trades {}",
                    state.position.symbol, self.config.market.symbol
                )));
            }
            info!(
                base = %state.position.base,
                average_cost = %state.position.average_cost,
                "Restored persisted state"
            );
            self.state = state;
        }
        self.status = StrategyStatus::Running;
        info!(
            base_balance = %balances.base,
            quote_balance = %balances.quote,
            interval = %self.config.interval,
            mode = ?self.config.mode,
            "Strategy started"
        );
        Ok(())
    }

    /// Dispatch one queue event
    pub async fn handle_event(&mut self, event: StrategyEvent) -> Result<()> {
        if let Some(symbol) = event.symbol() {
            if symbol != self.config.market.symbol {
                debug!("Ignoring event for {}", symbol);
                return Ok(());
            }
        }

        match event {
            StrategyEvent::KLineClosed(bar) => {
                if bar.interval.is_daily() && !self.on_day_boundary(bar.end_time) {
                    return Ok(());
                }
                if bar.interval == self.config.interval {
                    self.on_tick(&bar).await?;
                }
                Ok(())
            }
            StrategyEvent::OrderBook(book) => {
                self.on_order_book(book);
                Ok(())
            }
            StrategyEvent::Alpha { value, .. } => {
                self.on_alpha(value);
                Ok(())
            }
            StrategyEvent::Fill(fill) => self.on_fill(&fill).map(|_| ()),
            StrategyEvent::Control(ControlCommand::Suspend) => self.suspend().await,
            StrategyEvent::Control(ControlCommand::Resume) => self.resume(),
            StrategyEvent::Control(ControlCommand::EmergencyStop) => self.emergency_stop().await,
        }
    }

    pub fn on_alpha(&mut self, value: f64) {
        self.alpha.push(value);
    }

    pub fn on_order_book(&mut self, book: OrderBook) {
        if let Some(current) = &self.book {
            if book.timestamp <= current.timestamp {
                warn!(
                    timestamp = %book.timestamp,
                    last = %current.timestamp,
                    "Dropping out-of-order book snapshot"
                );
                return;
            }
        }
        self.book = Some(book);
    }

    /// Day boundary closing at `end_time`: snapshot the report and reset
    /// today's profit
    ///
    /// Returns `false` when the boundary was not applied, either because the
    /// strategy is not started or because a boundary at or after `end_time`
    /// was already recorded.
    pub fn on_day_boundary(&mut self, end_time: DateTime<Utc>) -> bool {
        if !matches!(self.status, StrategyStatus::Running | StrategyStatus::Suspended) {
            return false;
        }
        if let Some(last) = self.last_day_boundary {
            if end_time <= last {
                warn!(end_time = %end_time, last = %last, "Dropping out-of-order day boundary");
                return false;
            }
        }
        self.last_day_boundary = Some(end_time);
        if let Some(report) = self.report.as_mut() {
            report.daily_update(&self.state.trade_stats);
        }
        self.state.profit_stats.reset_today();
        true
    }

    /// Run the decision procedure for one closed bar
    #[instrument(skip(self, bar), fields(symbol = %bar.symbol, close = %bar.close))]
    pub async fn on_tick(&mut self, bar: &KLine) -> Result<TickOutcome> {
        if bar.symbol != self.config.market.symbol {
            return Ok(TickOutcome::Skipped(SkipReason::OtherMarket));
        }
        if !matches!(self.status, StrategyStatus::Running | StrategyStatus::Suspended) {
            return Ok(TickOutcome::Skipped(SkipReason::NotRunning));
        }
        if let Some(last) = self.last_bar_time {
            if bar.end_time <= last {
                warn!(end_time = %bar.end_time, last = %last, "Dropping out-of-order bar");
                return Ok(TickOutcome::Skipped(SkipReason::Stale));
            }
        }
        if bar.close <= Decimal::ZERO {
            return Err(StrategyError::InvalidQuantity(format!(
                "non-positive close {}",
                bar.close
            )));
        }

        let close = bar.close;
        self.last_bar_time = Some(bar.end_time);
        self.last_price = Some(close);
        self.regime.update(close);
        let drawdown = self.observe_account(close);
        self.executor.mark_price(&self.config.market.symbol, close).await;

        if self.status == StrategyStatus::Suspended {
            return Ok(TickOutcome::Skipped(SkipReason::Suspended));
        }

        let position = &self.state.position;
        if !position.is_dust(&self.config.market, close) {
            let action = self
                .governor
                .check_stop(position, &self.state.price_tracking, close);
            if let StopAction::CloseAll(reason) = action {
                info!(
                    reason = %reason,
                    base = %position.base,
                    average_cost = %position.average_cost,
                    "Stop triggered, closing position"
                );
                self.executor.cancel_all_own_orders().await?;
                self.executor.close_position(Decimal::ONE).await?;
                return Ok(TickOutcome::Stopped(reason));
            }
        }

        let alpha = match self.alpha.ranked_value(self.config.alpha_lag) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "No ranked alpha yet");
                return Ok(TickOutcome::Skipped(SkipReason::NoAlpha));
            }
        };
        let Some(alpha) = Decimal::from_f64(alpha) else {
            warn!(alpha, "Non-finite alpha ignored");
            return Ok(TickOutcome::Skipped(SkipReason::NoAlpha));
        };

        let input = SizingInput {
            base_order_size: base_order_size(&self.config.quantity_or_amount, close),
            alpha,
            trend_strength: self.regime.trend_strength(),
            volatility: self.regime.volatility_factor(),
        };
        let current = self.state.position.base;
        let Some(target) = self.sizer.target_position(&input) else {
            warn!(
                alpha = %input.alpha,
                base_order_size = %input.base_order_size,
                "Target position overflows, tick skipped"
            );
            return Ok(TickOutcome::Skipped(SkipReason::Overflow));
        };
        let target = self.governor.clamp_target(target);

        info!(
            alpha = %input.alpha,
            trend = %input.trend_strength,
            volatility = %input.volatility,
            base = %current,
            unrealized = %self.state.position.unrealized_profit(close),
            target = %target,
            "Tick decision"
        );

        // resting orders from the previous tick are stale either way
        self.executor.cancel_all_own_orders().await?;

        let daily_pnl = self.state.profit_stats.today_net_profit;
        let allowed = self.governor.allows_new_risk(drawdown, daily_pnl);
        let target = if allowed {
            target
        } else {
            let reduced = reduce_only_target(current, target);
            warn!(
                drawdown = %drawdown,
                daily_pnl = %daily_pnl,
                target = %reduced,
                "Risk limits exceeded, reduce-only"
            );
            reduced
        };

        let Some(delta) = target.checked_sub(current) else {
            warn!(target = %target, base = %current, "Position delta overflows, tick skipped");
            return Ok(TickOutcome::Skipped(SkipReason::Overflow));
        };
        let delta = delta.round_dp_with_strategy(
            self.config.market.volume_precision,
            RoundingStrategy::ToZero,
        );
        if delta.is_zero() {
            return Ok(if allowed {
                TickOutcome::Hold
            } else {
                TickOutcome::Denied
            });
        }

        let orders = self.planner.plan(delta, close, self.book.as_ref())?;
        self.executor.submit_orders(&orders).await?;
        info!(delta = %delta, orders = orders.len(), "Orders submitted");
        Ok(TickOutcome::Submitted(orders))
    }

    /// Apply one of our executions
    ///
    /// Position, statistics and price tracking are computed first and
    /// committed together.
    #[instrument(skip(self, fill), fields(side = %fill.side, price = %fill.price, quantity = %fill.quantity))]
    pub fn on_fill(&mut self, fill: &Fill) -> Result<Option<Profit>> {
        if self.status == StrategyStatus::Idle {
            return Err(StrategyError::InvalidState("fill received before start".into()));
        }
        if fill.symbol != self.config.market.symbol {
            return Ok(None);
        }

        let mut position = self.state.position.clone();
        let profit = position.apply_fill(fill);

        let mut profit_stats = self.state.profit_stats.clone();
        let mut trade_stats = self.state.trade_stats.clone();
        profit_stats.add_fee(fill.fee);
        if let Some(p) = &profit {
            profit_stats.add_profit(p);
            trade_stats.add_profit(p.profit);
        }

        let previous_tracking = self.state.price_tracking;
        let tracking = PriceTrackingState::after_fill(&position, &self.config.market, fill.price);
        let drawdown = self.observe_account(fill.price);

        self.state = StrategyState {
            position,
            profit_stats,
            trade_stats,
            price_tracking: tracking,
        };

        if let Some(report) = self.report.as_mut() {
            report.record_trade(fill.fee);
            if let Some(p) = &profit {
                report.record_profit(p.profit);
            }
        }
        if let Some(chart) = self.chart.as_mut() {
            let value = self
                .drawdown
                .map(|d| d.current())
                .unwrap_or(Decimal::ZERO);
            chart.record_fill(
                &previous_tracking,
                fill.price,
                value,
                profit.map(|p| p.profit).unwrap_or(Decimal::ZERO),
            );
        }

        if let Some(p) = &profit {
            info!(
                profit = %p.profit,
                net_profit = %p.net_profit,
                base = %self.state.position.base,
                drawdown = %drawdown,
                "Realized profit"
            );
        } else {
            debug!(base = %self.state.position.base, "Position increased");
        }
        Ok(profit)
    }

    /// Stop submitting new orders and cancel resting ones
    #[instrument(skip(self), fields(symbol = %self.config.market.symbol))]
    pub async fn suspend(&mut self) -> Result<()> {
        if self.status != StrategyStatus::Running {
            return Err(StrategyError::InvalidState(format!(
                "suspend requires Running, strategy is {:?}",
                self.status
            )));
        }
        self.status = StrategyStatus::Suspended;
        info!("Strategy suspended");
        self.executor.cancel_all_own_orders().await
    }

    #[instrument(skip(self), fields(symbol = %self.config.market.symbol))]
    pub fn resume(&mut self) -> Result<()> {
        if self.status != StrategyStatus::Suspended {
            return Err(StrategyError::InvalidState(format!(
                "resume requires Suspended, strategy is {:?}",
                self.status
            )));
        }
        self.status = StrategyStatus::Running;
        info!("Strategy resumed");
        Ok(())
    }

    /// Cancel everything and close the whole position; terminal
    #[instrument(skip(self), fields(symbol = %self.config.market.symbol))]
    pub async fn emergency_stop(&mut self) -> Result<()> {
        if matches!(self.status, StrategyStatus::Idle | StrategyStatus::Stopped) {
            return Err(StrategyError::InvalidState(format!(
                "emergency stop requires a started strategy, strategy is {:?}",
                self.status
            )));
        }
        self.status = StrategyStatus::Stopped;
        warn!(base = %self.state.position.base, "Emergency stop");

        let cancelled = self.executor.cancel_all_own_orders().await;
        let closed = self.executor.close_position(Decimal::ONE).await;
        cancelled.and(closed)
    }

    /// Shutdown: cancel resting orders and emit the final reports
    ///
    /// Runs once; later calls are no-ops.
    #[instrument(skip(self), fields(symbol = %self.config.market.symbol))]
    pub async fn stop(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        let was_started = self.status != StrategyStatus::Idle;
        self.status = StrategyStatus::Stopped;
        if !was_started {
            return Ok(());
        }

        let mut first_error = None;
        if let Err(e) = self.executor.cancel_all_own_orders().await {
            error!("Failed to cancel orders on shutdown: {}", e);
            first_error.get_or_insert(e);
        }

        if let Some(report) = &self.report {
            if let Err(e) = report.output(&self.config.market.symbol) {
                error!("Failed to write accumulated profit report: {}", e);
                first_error.get_or_insert(e);
            }
        }

        if self.config.draw_graph {
            if let Some(chart) = &self.chart {
                if let Err(e) =
                    chart.write_tsv(&self.config.graph_pnl_path, &self.config.graph_cum_pnl_path)
                {
                    error!("Failed to write chart series: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!("{}", self.state.trade_stats);
        match serde_json::to_string(&self.state.profit_stats) {
            Ok(json) => info!(profit_stats = %json, "Strategy stopped"),
            Err(e) => warn!("Failed to serialize profit stats: {}", e),
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Refresh the drawdown tracker from the account at `price`
    ///
    /// Seeds the tracker and the chart series on first use. A failed read
    /// keeps the previous drawdown.
    fn observe_account(&mut self, price: Decimal) -> Decimal {
        let value = match self.account.balances() {
            Ok(balances) => balances.asset_value(price),
            Err(e) => {
                warn!(error = %e, "Account balances unavailable");
                return self.drawdown();
            }
        };

        let tracker = self
            .drawdown
            .get_or_insert_with(|| DrawdownTracker::new(value));
        let drawdown = tracker.update(value);

        if self.chart.is_none() && self.config.draw_graph {
            self.chart = Some(ChartSeries::new(value));
        }
        drawdown
    }
}

//! Alpha-weighted inventory strategy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  EVENT QUEUE (single consumer)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  KLineClosed / OrderBook / Alpha / Fill / Control           │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  StrategyRunner ── stop signal checked between events       │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Strategy (decision loop)                                   │
//! │    - RiskGovernor: stops, limits, reduce-only gate          │
//! │    - SizeCalculator: base × alpha × trend × volatility      │
//! │    - OrderPlanner: spread-offset limit orders in chunks     │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  COLLABORATORS (async, external)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  OrderExecutor: submit / cancel / close                     │
//! │  AccountState: balances for drawdown                        │
//! │  AlphaSource: ranked values, newest at index 0              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Strategy`]: lifecycle state machine and per-tick decision procedure
//! - [`StrategyRunner`]: drains the event queue into the strategy
//! - [`SizeCalculator`]: target position from alpha and regime factors
//! - [`OrderPlanner`]: child limit orders for a position delta
//! - [`RiskGovernor`]: stop-loss/take-profit and risk limits
//! - [`MarketRegime`]: trend strength and volatility estimators
//! - [`RankedValues`]: default in-process alpha buffer

mod engine;
mod planner;
mod regime;
mod risk;
mod runner;
mod signal;
mod sizing;
mod types;

pub use engine::{SkipReason, Strategy, StrategyStatus, TickOutcome};
pub use planner::{split_chunks, OrderPlanner};
pub use regime::MarketRegime;
pub use risk::{
    check_limits, check_stop, check_trailing_stop, reduce_only_target, DrawdownTracker,
    RiskGovernor, StopAction, StopReason,
};
pub use runner::StrategyRunner;
pub use signal::RankedValues;
pub use sizing::{
    base_order_size, target_position, AlphaWeightedSizer, BoxedSizeCalculator, SizeCalculator,
    SizingInput,
};
pub use types::{
    Position, PriceTrackingState, Profit, ProfitStats, StrategyState, TradeStats,
};

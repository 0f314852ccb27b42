//! IRR Strategy Library
//!
//! Decision core of an alpha-weighted inventory trading strategy: sizes a
//! target position from a ranked alpha signal, plans spread-offset limit
//! orders towards it, enforces stops and risk limits, and keeps rolling
//! profit statistics for backtest reports.

pub mod common;
pub mod config;
pub mod execution;
pub mod report;
pub mod strategy;

// Re-export commonly used types
pub use common::errors::{Result, StrategyError};
pub use common::traits::{AccountState, AlphaSource, Balances, OrderExecutor};
pub use common::types::{
    ControlCommand, Fill, Interval, KLine, Market, OrderBook, OrderInstruction, PriceLevel, Side,
    StrategyEvent,
};
pub use config::types::{AppConfig, StrategyConfig};
pub use execution::{PaperAccount, PaperOrderExecutor};
pub use report::{AccumulatedProfitReport, ChartSeries, RollingSeries};

// Strategy types
pub use strategy::{
    OrderPlanner, Position, RiskGovernor, Strategy, StrategyRunner, StrategyState,
    StrategyStatus, TickOutcome, TradeStats,
};

//! Rolling performance statistics for monitoring and backtest reporting

pub mod accumulated;
pub mod chart;
pub mod series;
pub mod sma;

pub use accumulated::{AccumulatedProfitReport, ReportRow, TRADE_COUNT_WINDOW};
pub use chart::ChartSeries;
pub use series::RollingSeries;
pub use sma::SimpleMovingAverage;

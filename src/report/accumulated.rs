//! Accumulated profit report
//!
//! Consumes realized profits and trade fees as they happen and snapshots them
//! into rolling per-day series on every day boundary. [`AccumulatedProfitReport::render`]
//! turns the series into one row per reporting interval, most recent first.
//!
//! Interval columns use a sliding-window difference over the daily series:
//! `tail(window + offset) - tail(offset)` is the sum of exactly the `window`
//! samples ending `offset` days back.

use std::fs::OpenOptions;
use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::series::RollingSeries;
use super::sma::SimpleMovingAverage;
use crate::common::errors::Result;
use crate::config::types::AccumulatedProfitReportConfig;
use crate::strategy::TradeStats;

/// Window of the trailing trade-count column, in days
pub const TRADE_COUNT_WINDOW: usize = 60;

/// One rendered report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// 1-based interval index, 1 = most recent
    pub index: usize,
    pub symbol: String,
    pub accumulated_profit: f64,
    pub accumulated_profit_ma: f64,
    pub interval_profit: f64,
    pub accumulated_fee: f64,
    pub win_ratio: f64,
    pub profit_factor: f64,
    pub trades: f64,
}

impl ReportRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.symbol.clone(),
            format!("{:.6}", self.accumulated_profit),
            format!("{:.6}", self.accumulated_profit_ma),
            format!("{:.6}", self.interval_profit),
            format!("{:.6}", self.accumulated_fee),
            format!("{:.6}", self.win_ratio),
            format!("{:.6}", self.profit_factor),
            format!("{:.6}", self.trades),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct AccumulatedProfitReport {
    ma_window: usize,
    interval_window: usize,
    number_of_interval: usize,
    daily_profit_window: usize,
    tsv_report_path: Option<String>,

    accumulated_profit: Decimal,
    previous_accumulated_profit: Decimal,
    accumulated_profit_per_day: RollingSeries,

    accumulated_profit_ma: SimpleMovingAverage,
    accumulated_profit_ma_per_day: RollingSeries,

    daily_profit: RollingSeries,

    accumulated_fee: Decimal,
    accumulated_fee_per_day: RollingSeries,

    win_ratio_per_day: RollingSeries,
    profit_factor_per_day: RollingSeries,

    accumulated_trades: u64,
    previous_accumulated_trades: u64,
    daily_trades: RollingSeries,
}

impl AccumulatedProfitReport {
    /// Build a report; non-positive windows fall back to their defaults
    pub fn new(config: &AccumulatedProfitReportConfig) -> Self {
        let mut config = config.clone();
        config.initialize();

        let ma_window = to_window(config.accumulated_profit_ma_window);
        let interval_window = to_window(config.interval_window);
        let number_of_interval = to_window(config.number_of_interval);
        let daily_profit_window = to_window(config.accumulated_daily_profit_window);

        // the oldest sample any row can reach, plus one
        let furthest_offset = interval_window * (number_of_interval - 1);
        let retention = furthest_offset + daily_profit_window.max(TRADE_COUNT_WINDOW) + 1;
        let series = || RollingSeries::with_capacity_limit(retention);

        Self {
            ma_window,
            interval_window,
            number_of_interval,
            daily_profit_window,
            tsv_report_path: config.tsv_report_path,
            accumulated_profit: Decimal::ZERO,
            previous_accumulated_profit: Decimal::ZERO,
            accumulated_profit_per_day: series(),
            accumulated_profit_ma: SimpleMovingAverage::new(ma_window),
            accumulated_profit_ma_per_day: series(),
            daily_profit: series(),
            accumulated_fee: Decimal::ZERO,
            accumulated_fee_per_day: series(),
            win_ratio_per_day: series(),
            profit_factor_per_day: series(),
            accumulated_trades: 0,
            previous_accumulated_trades: 0,
            daily_trades: series(),
        }
    }

    pub fn record_profit(&mut self, profit: Decimal) {
        self.accumulated_profit += profit;
    }

    pub fn record_trade(&mut self, fee: Decimal) {
        self.accumulated_fee += fee;
        self.accumulated_trades += 1;
    }

    /// Snapshot the running totals at a day boundary
    pub fn daily_update(&mut self, trade_stats: &TradeStats) {
        let daily_profit = self.accumulated_profit - self.previous_accumulated_profit;
        self.daily_profit.update(to_f64(daily_profit));
        self.previous_accumulated_profit = self.accumulated_profit;

        let accumulated = to_f64(self.accumulated_profit);
        self.accumulated_profit_per_day.update(accumulated);

        self.accumulated_profit_ma.update(accumulated);
        self.accumulated_profit_ma_per_day
            .update(self.accumulated_profit_ma.last());

        self.accumulated_fee_per_day
            .update(to_f64(self.accumulated_fee));

        self.win_ratio_per_day
            .update(to_f64(trade_stats.winning_ratio()));
        self.profit_factor_per_day
            .update(to_f64(trade_stats.profit_factor()));

        let trades = self.accumulated_trades - self.previous_accumulated_trades;
        self.daily_trades.update(trades as f64);
        self.previous_accumulated_trades = self.accumulated_trades;

        debug!(
            daily_profit = %daily_profit,
            accumulated_profit = %self.accumulated_profit,
            trades,
            "Accumulated profit daily update"
        );
    }

    pub fn accumulated_profit(&self) -> Decimal {
        self.accumulated_profit
    }

    pub fn accumulated_fee(&self) -> Decimal {
        self.accumulated_fee
    }

    pub fn accumulated_trades(&self) -> u64 {
        self.accumulated_trades
    }

    /// Number of day boundaries recorded and still retained
    pub fn days_recorded(&self) -> usize {
        self.daily_profit.len()
    }

    /// Column headers of the rendered report
    pub fn header(&self) -> Vec<String> {
        vec![
            "#".to_string(),
            "Symbol".to_string(),
            "accumulatedProfit".to_string(),
            "accumulatedProfitMA".to_string(),
            format!("{}d profit", self.daily_profit_window),
            "accumulatedFee".to_string(),
            "winRatio".to_string(),
            "profitFactor".to_string(),
            format!("{}D trades", TRADE_COUNT_WINDOW),
        ]
    }

    /// Render one row per reporting interval; does not mutate state
    pub fn render(&self, symbol: &str) -> Vec<ReportRow> {
        (0..self.number_of_interval)
            .map(|i| {
                let offset = self.interval_window * i;
                let interval_profit = self.daily_profit.tail(self.daily_profit_window + offset)
                    - self.daily_profit.tail(offset);
                let trades = self.daily_trades.tail(TRADE_COUNT_WINDOW + offset)
                    - self.daily_trades.tail(offset);

                ReportRow {
                    index: i + 1,
                    symbol: symbol.to_string(),
                    accumulated_profit: self.accumulated_profit_per_day.index(offset),
                    accumulated_profit_ma: self.accumulated_profit_ma_per_day.index(offset),
                    interval_profit,
                    accumulated_fee: self.accumulated_fee_per_day.index(offset),
                    win_ratio: self.win_ratio_per_day.index(offset),
                    profit_factor: self.profit_factor_per_day.index(offset),
                    trades,
                }
            })
            .collect()
    }

    /// Append the header and rendered rows to a tab-separated file
    pub fn write_tsv(&self, path: impl AsRef<Path>, symbol: &str) -> Result<()> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);

        writer.write_record(self.header())?;
        let rows = self.render(symbol);
        for row in &rows {
            writer.write_record(row.to_record())?;
        }
        writer.flush()?;

        info!(
            path = %path.display(),
            rows = rows.len(),
            "Accumulated profit report written"
        );
        Ok(())
    }

    /// Write to the configured report path, if any
    pub fn output(&self, symbol: &str) -> Result<()> {
        match self.tsv_report_path.as_deref() {
            Some(path) if !path.is_empty() => self.write_tsv(path, symbol),
            _ => Ok(()),
        }
    }

    pub fn ma_window(&self) -> usize {
        self.ma_window
    }
}

fn to_window(value: i64) -> usize {
    usize::try_from(value).unwrap_or(1).max(1)
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::errors::{Result, StrategyError};
use crate::common::types::{Interval, Market};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Strategy parameters
    pub strategy: StrategyConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Validate the strategy section and the runtime settings
    pub fn validate(&mut self) -> Result<()> {
        if self.settings.channel_size == 0 {
            return Err(StrategyError::Configuration(
                "channel_size must be >= 1".into(),
            ));
        }
        self.strategy.validate()
    }
}

/// Whether the strategy trades live or replays history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Live,
    /// Produces the accumulated profit report and chart series
    Backtest,
}

/// Strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Traded market and its trading rules
    pub market: Market,
    /// Bar interval driving the decision loop
    #[serde(default = "default_interval")]
    pub interval: Interval,
    /// Ranking window of the alpha source, in bars
    #[serde(default = "default_window")]
    pub window: usize,
    /// Bars back the ranked alpha is read from; 1 uses the previous bar's rank
    #[serde(default = "default_alpha_lag")]
    pub alpha_lag: usize,
    #[serde(default)]
    pub mode: RunMode,
    /// Base order size
    #[serde(default)]
    pub quantity_or_amount: QuantityOrAmount,
    /// Buy limit price offset below close, as a fraction
    #[serde(default)]
    pub bid_spread: Decimal,
    /// Sell limit price offset above close, as a fraction
    #[serde(default)]
    pub ask_spread: Decimal,
    /// Number of child orders per rebalance
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,
    /// Top-of-book depth (base units, both sides) at which the base spread applies
    #[serde(default)]
    pub depth_calibration_floor: Decimal,
    /// Book levels per side summed for the depth calibration
    #[serde(default = "default_depth_levels")]
    pub depth_levels: usize,
    /// Upper bound of the calibrated spread, as a multiple of the base spread
    #[serde(default = "default_max_spread_multiplier")]
    pub max_spread_multiplier: Decimal,
    /// Stop-loss as a fraction of cost, 0 disables
    #[serde(default)]
    pub stop_loss: Decimal,
    /// Take-profit as a fraction of cost, 0 disables
    #[serde(default)]
    pub take_profit: Decimal,
    /// Anchor the stop on the tracked fill price instead of average cost
    #[serde(default)]
    pub trailing_stop: bool,
    #[serde(default)]
    pub risk: RiskLimits,
    /// Trend/volatility estimation
    #[serde(default)]
    pub regime: RegimeConfig,
    /// Accumulated profit report, used in backtest mode
    #[serde(default)]
    pub accumulated_profit_report: Option<AccumulatedProfitReportConfig>,
    /// Export chart series at shutdown
    #[serde(default)]
    pub draw_graph: bool,
    #[serde(default = "default_graph_pnl_path")]
    pub graph_pnl_path: String,
    #[serde(default = "default_graph_cum_pnl_path")]
    pub graph_cum_pnl_path: String,
}

fn default_interval() -> Interval {
    Interval::OneHour
}

fn default_window() -> usize {
    20
}

fn default_alpha_lag() -> usize {
    1
}

fn default_chunk_count() -> usize {
    3
}

fn default_depth_levels() -> usize {
    5
}

fn default_max_spread_multiplier() -> Decimal {
    dec!(10)
}

fn default_graph_pnl_path() -> String {
    "./pnl.tsv".to_string()
}

fn default_graph_cum_pnl_path() -> String {
    "./cumpnl.tsv".to_string()
}

/// Default bid/ask spread, 1 bp
pub const DEFAULT_SPREAD: Decimal = dec!(0.0001);

impl StrategyConfig {
    /// Minimal configuration for a market with every other option defaulted
    pub fn for_market(market: Market) -> Self {
        Self {
            market,
            interval: default_interval(),
            window: default_window(),
            alpha_lag: default_alpha_lag(),
            mode: RunMode::default(),
            quantity_or_amount: QuantityOrAmount::default(),
            bid_spread: Decimal::ZERO,
            ask_spread: Decimal::ZERO,
            chunk_count: default_chunk_count(),
            depth_calibration_floor: Decimal::ZERO,
            depth_levels: default_depth_levels(),
            max_spread_multiplier: default_max_spread_multiplier(),
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            trailing_stop: false,
            risk: RiskLimits::default(),
            regime: RegimeConfig::default(),
            accumulated_profit_report: None,
            draw_graph: false,
            graph_pnl_path: default_graph_pnl_path(),
            graph_cum_pnl_path: default_graph_cum_pnl_path(),
        }
    }

    /// Apply documented defaults and reject invalid limits
    ///
    /// Idempotent: validating an already validated config changes nothing.
    pub fn validate(&mut self) -> Result<()> {
        if self.market.symbol.is_empty() {
            return Err(StrategyError::Configuration("symbol is required".into()));
        }
        if self.bid_spread.is_zero() {
            self.bid_spread = DEFAULT_SPREAD;
        }
        if self.ask_spread.is_zero() {
            self.ask_spread = DEFAULT_SPREAD;
        }
        for (name, value) in [
            ("bid_spread", self.bid_spread),
            ("ask_spread", self.ask_spread),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("depth_calibration_floor", self.depth_calibration_floor),
        ] {
            if value < Decimal::ZERO {
                return Err(StrategyError::Configuration(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
        }
        if self.bid_spread >= Decimal::ONE || self.stop_loss >= Decimal::ONE {
            return Err(StrategyError::Configuration(
                "bid_spread and stop_loss must be below 1".into(),
            ));
        }
        if self.chunk_count == 0 {
            return Err(StrategyError::Configuration("chunk_count must be >= 1".into()));
        }
        if self.window == 0 || self.alpha_lag >= self.window {
            return Err(StrategyError::Configuration(format!(
                "alpha_lag {} must be inside the ranking window {}",
                self.alpha_lag, self.window
            )));
        }
        if self.max_spread_multiplier < Decimal::ONE {
            return Err(StrategyError::Configuration(
                "max_spread_multiplier must be >= 1".into(),
            ));
        }
        if self.depth_calibration_floor > Decimal::ZERO
            && self.bid_spread * self.max_spread_multiplier >= Decimal::ONE
        {
            return Err(StrategyError::Configuration(format!(
                "widest bid spread {} x {} must stay below 1",
                self.bid_spread, self.max_spread_multiplier
            )));
        }
        self.quantity_or_amount.validate()?;
        self.risk.validate()?;
        if self.mode == RunMode::Backtest {
            self.accumulated_profit_report
                .get_or_insert_with(AccumulatedProfitReportConfig::default)
                .initialize();
        } else if let Some(report) = self.accumulated_profit_report.as_mut() {
            report.initialize();
        }
        Ok(())
    }

    /// Whether the accumulated profit report and chart series are produced
    pub fn is_reporting(&self) -> bool {
        self.mode == RunMode::Backtest
    }
}

/// Base order size: a fixed base quantity or a quote amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantityOrAmount {
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub amount: Decimal,
}

impl QuantityOrAmount {
    pub fn validate(&self) -> Result<()> {
        if self.quantity < Decimal::ZERO || self.amount < Decimal::ZERO {
            return Err(StrategyError::Configuration(
                "quantity and amount must be >= 0".into(),
            ));
        }
        if self.quantity.is_zero() && self.amount.is_zero() {
            return Err(StrategyError::Configuration(
                "either quantity or amount must be set".into(),
            ));
        }
        Ok(())
    }

    /// Base quantity for the given price; quantity takes precedence over amount
    pub fn calculate_quantity(&self, price: Decimal) -> Decimal {
        if self.quantity > Decimal::ZERO {
            return self.quantity;
        }
        if price > Decimal::ZERO && self.amount > Decimal::ZERO {
            return self.amount / price;
        }
        Decimal::ZERO
    }
}

/// Risk limits fixed at strategy start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum drawdown as a fraction of peak account value, 0 disables
    #[serde(default)]
    pub max_drawdown: Decimal,
    /// Maximum loss since the last day boundary, in quote currency, 0 disables
    #[serde(default)]
    pub daily_loss_limit: Decimal,
    /// Maximum absolute target position in base units, 0 disables
    #[serde(default)]
    pub position_size_limit: Decimal,
}

impl RiskLimits {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_drawdown", self.max_drawdown),
            ("daily_loss_limit", self.daily_loss_limit),
            ("position_size_limit", self.position_size_limit),
        ] {
            if value < Decimal::ZERO {
                return Err(StrategyError::Configuration(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Trend strength and volatility estimation windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Closes used for the efficiency-ratio trend strength
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Returns used for realized volatility
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,
    /// Per-bar return volatility that maps to a factor of 1
    #[serde(default = "default_target_volatility")]
    pub target_volatility: f64,
}

fn default_trend_window() -> usize {
    20
}

fn default_volatility_window() -> usize {
    20
}

fn default_target_volatility() -> f64 {
    0.01
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            trend_window: default_trend_window(),
            volatility_window: default_volatility_window(),
            target_volatility: default_target_volatility(),
        }
    }
}

/// Accumulated profit report parameters
///
/// Windows are signed so that non-positive values from configuration can be
/// detected and defaulted by [`AccumulatedProfitReportConfig::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedProfitReportConfig {
    /// SMA window of the accumulated profit, in day boundaries
    #[serde(default)]
    pub accumulated_profit_ma_window: i64,
    /// Distance between report rows, in days
    #[serde(default)]
    pub interval_window: i64,
    /// Number of report rows
    #[serde(default)]
    pub number_of_interval: i64,
    /// Window summed for the interval profit column, in days
    #[serde(default)]
    pub accumulated_daily_profit_window: i64,
    /// TSV file the report is appended to
    #[serde(default)]
    pub tsv_report_path: Option<String>,
}

impl AccumulatedProfitReportConfig {
    pub const DEFAULT_MA_WINDOW: i64 = 60;
    pub const DEFAULT_INTERVAL_WINDOW: i64 = 7;
    pub const DEFAULT_NUMBER_OF_INTERVAL: i64 = 1;
    pub const DEFAULT_DAILY_PROFIT_WINDOW: i64 = 7;

    /// Replace non-positive windows with their defaults; idempotent
    pub fn initialize(&mut self) {
        if self.accumulated_profit_ma_window <= 0 {
            self.accumulated_profit_ma_window = Self::DEFAULT_MA_WINDOW;
        }
        if self.interval_window <= 0 {
            self.interval_window = Self::DEFAULT_INTERVAL_WINDOW;
        }
        if self.accumulated_daily_profit_window <= 0 {
            self.accumulated_daily_profit_window = Self::DEFAULT_DAILY_PROFIT_WINDOW;
        }
        if self.number_of_interval <= 0 {
            self.number_of_interval = Self::DEFAULT_NUMBER_OF_INTERVAL;
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Event queue buffer size
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            channel_size: default_channel_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_size() -> usize {
    crate::common::channels::DEFAULT_CHANNEL_SIZE
}

//! Domain value types shared by the strategy core and its collaborators

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side that moves inventory in the direction of a signed delta
    pub fn from_delta(delta: Decimal) -> Option<Self> {
        if delta > Decimal::ZERO {
            Some(Side::Buy)
        } else if delta < Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    /// Whether bars of this interval mark a day boundary
    pub fn is_daily(&self) -> bool {
        matches!(self, Interval::OneDay)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        };
        write!(f, "{}", s)
    }
}

/// A closed candlestick bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KLine {
    pub symbol: String,
    pub interval: Interval,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    /// Close time of the bar
    pub end_time: DateTime<Utc>,
}

/// A single price level in an order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Total size at this price level, in base units
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Order book snapshot for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    /// Bids sorted by price descending
    pub bids: Vec<PriceLevel>,
    /// Asks sorted by price ascending
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// Resting base quantity on both sides within the top `levels` levels
    pub fn depth(&self, levels: usize) -> Decimal {
        let bids: Decimal = self.bids.iter().take(levels).map(|l| l.size).sum();
        let asks: Decimal = self.asks.iter().take(levels).map(|l| l.size).sum();
        bids + asks
    }
}

/// An execution reported back by the order-execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Fee charged, in quote currency
    #[serde(default)]
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A child limit order handed to the order-execution collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Position of this chunk within its plan, starting at 0
    pub chunk_index: usize,
}

impl OrderInstruction {
    /// Quote value of this order
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// Trading rules of a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Decimal places for limit prices
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    /// Decimal places for order quantities
    #[serde(default = "default_volume_precision")]
    pub volume_precision: u32,
    #[serde(default)]
    pub min_quantity: Decimal,
    #[serde(default)]
    pub min_notional: Decimal,
}

fn default_price_precision() -> u32 {
    2
}

fn default_volume_precision() -> u32 {
    8
}

impl Market {
    /// Whether a base quantity is economically zero at the given price
    pub fn is_dust(&self, base: Decimal, price: Decimal) -> bool {
        let qty = base.abs();
        qty.is_zero() || qty < self.min_quantity || qty * price < self.min_notional
    }
}

/// Lifecycle commands delivered through the event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    Suspend,
    Resume,
    EmergencyStop,
}

/// Unified event consumed by the decision loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StrategyEvent {
    /// A bar closed
    KLineClosed(KLine),
    /// Fresh order book snapshot
    OrderBook(OrderBook),
    /// New ranked value published by the alpha source
    Alpha { symbol: String, value: f64 },
    /// One of our orders executed
    Fill(Fill),
    /// Lifecycle command
    Control(ControlCommand),
}

impl StrategyEvent {
    /// Symbol the event belongs to, if any
    pub fn symbol(&self) -> Option<&str> {
        match self {
            StrategyEvent::KLineClosed(k) => Some(&k.symbol),
            StrategyEvent::OrderBook(b) => Some(&b.symbol),
            StrategyEvent::Alpha { symbol, .. } => Some(symbol),
            StrategyEvent::Fill(f) => Some(&f.symbol),
            StrategyEvent::Control(_) => None,
        }
    }
}

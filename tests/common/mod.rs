//! Common test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use irr_strategy::common::types::{Fill, Interval, KLine, Market, OrderBook, PriceLevel, Side};
use irr_strategy::config::types::StrategyConfig;
use irr_strategy::{Balances, PaperAccount, StrategyEvent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const SYMBOL: &str = "BTCUSDT";

/// Market with 2 price decimals and 4 quantity decimals
pub fn sample_market() -> Market {
    Market {
        symbol: SYMBOL.to_string(),
        base_currency: "BTC".to_string(),
        quote_currency: "USDT".to_string(),
        price_precision: 2,
        volume_precision: 4,
        min_quantity: dec!(0.0001),
        min_notional: dec!(1),
    }
}

/// Hourly strategy sized at 10 base units with 10 bp spreads
pub fn strategy_config() -> StrategyConfig {
    let mut cfg = StrategyConfig::for_market(sample_market());
    cfg.quantity_or_amount.quantity = dec!(10);
    cfg.bid_spread = dec!(0.001);
    cfg.ask_spread = dec!(0.001);
    cfg.window = 5;
    cfg
}

pub fn paper_account(quote: Decimal) -> Arc<PaperAccount> {
    Arc::new(PaperAccount::new(Balances {
        base: Decimal::ZERO,
        quote,
    }))
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Flat hourly bar closing `n` hours after the epoch
pub fn hourly_bar(n: i64, close: Decimal) -> KLine {
    KLine {
        symbol: SYMBOL.to_string(),
        interval: Interval::OneHour,
        open: close,
        high: close,
        low: close,
        close,
        volume: dec!(1),
        end_time: epoch() + Duration::hours(n),
    }
}

/// Daily bar closing `n` days after the epoch
pub fn daily_bar(n: i64, close: Decimal) -> KLine {
    KLine {
        interval: Interval::OneDay,
        end_time: epoch() + Duration::days(n),
        ..hourly_bar(0, close)
    }
}

pub fn fill(side: Side, price: Decimal, quantity: Decimal) -> Fill {
    Fill {
        symbol: SYMBOL.to_string(),
        side,
        price,
        quantity,
        fee: Decimal::ZERO,
        timestamp: Utc::now(),
    }
}

pub fn alpha(value: f64) -> StrategyEvent {
    StrategyEvent::Alpha {
        symbol: SYMBOL.to_string(),
        value,
    }
}

/// Order book with `size` resting at each of three levels per side
pub fn sample_order_book(size: Decimal, minutes: i64) -> OrderBook {
    OrderBook {
        symbol: SYMBOL.to_string(),
        bids: vec![
            PriceLevel::new(dec!(99.9), size),
            PriceLevel::new(dec!(99.8), size),
            PriceLevel::new(dec!(99.7), size),
        ],
        asks: vec![
            PriceLevel::new(dec!(100.1), size),
            PriceLevel::new(dec!(100.2), size),
            PriceLevel::new(dec!(100.3), size),
        ],
        timestamp: epoch() + Duration::minutes(minutes),
    }
}

/// Sample strategy configuration in TOML
pub const SAMPLE_CONFIG: &str = r#"
    [strategy]
    interval = "1h"
    window = 10
    mode = "backtest"
    chunk_count = 2
    stop_loss = "0.05"
    take_profit = "0.2"

    [strategy.market]
    symbol = "BTCUSDT"
    base_currency = "BTC"
    quote_currency = "USDT"
    volume_precision = 4
    min_notional = "1"

    [strategy.quantity_or_amount]
    quantity = "2"

    [strategy.risk]
    max_drawdown = "0.3"
    daily_loss_limit = "1000"
    position_size_limit = "1.5"

    [settings]
    channel_size = 64
"#;

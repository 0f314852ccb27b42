//! IRR Strategy - Main Entry Point
//!
//! Runs the alpha-weighted inventory strategy against the paper executor.
//! Events are replayed from a JSON-lines file (one `StrategyEvent` per line)
//! or, without one, the strategy waits for Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use irr_strategy::common::channels::{create_event_channel_with_size, create_stop_signal};
use irr_strategy::config::load_config;
use irr_strategy::{
    Balances, PaperAccount, PaperOrderExecutor, Strategy, StrategyEvent, StrategyRunner,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the traded market symbol from the configuration
    #[arg(long)]
    symbol: Option<String>,

    /// JSON-lines file of strategy events to replay
    #[arg(long)]
    events: Option<String>,

    /// Initial paper quote balance
    #[arg(long, default_value = "10000")]
    quote_balance: Decimal,

    /// Paper fee rate charged on fill notional
    #[arg(long, default_value = "0.001")]
    fee_rate: Decimal,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting IRR strategy");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut app = load_config(Some(&args.config)).context("loading configuration")?;
    if let Some(symbol) = args.symbol.clone() {
        info!("Trading {} instead of {}", symbol, app.strategy.market.symbol);
        app.strategy.market.symbol = symbol;
    }

    let (event_tx, event_rx) = create_event_channel_with_size(app.settings.channel_size);
    let (stop_tx, stop_rx) = create_stop_signal();
    let (drain_tx, drain_rx) = create_stop_signal();

    let account = Arc::new(PaperAccount::new(Balances {
        base: Decimal::ZERO,
        quote: args.quote_balance,
    }));
    let executor = Arc::new(PaperOrderExecutor::with_fills(
        account.clone(),
        &event_tx,
        args.fee_rate,
    ));

    // one event yields at most a fill per chunk; replay leaves that much room
    let fill_headroom = app
        .strategy
        .chunk_count
        .min(app.settings.channel_size.saturating_sub(1));
    let mut strategy = Strategy::new(app.strategy, executor, account)?;
    strategy.start(None)?;
    let runner = StrategyRunner::new(strategy, event_rx, stop_rx)
        .with_drain_signal(drain_rx)
        .spawn();

    info!("Application initialized successfully");

    match args.events {
        Some(path) => {
            tokio::select! {
                replayed = replay(&path, &event_tx, fill_headroom) => {
                    let count = replayed?;
                    info!("Replayed {} events from {}, draining queue", count, path);
                    drain_tx.send(true).ok();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, cleaning up...");
                    stop_tx.send(true).ok();
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Received shutdown signal, cleaning up...");
            stop_tx.send(true).ok();
        }
    }

    // the queue stays open until the runner is done, so paper fills always land
    let strategy = runner.await??;
    drop(event_tx);
    info!(
        "Final position {} {}",
        strategy.state().position.base,
        strategy.symbol()
    );
    info!(
        "Trade stats: {}",
        serde_json::to_string_pretty(strategy.trade_stats())?
    );

    Ok(())
}

/// Feed events from a JSON-lines file
///
/// Each event is queued only while `headroom` further slots stay free for the
/// paper fills it may produce.
async fn replay(
    path: &str,
    sender: &mpsc::Sender<StrategyEvent>,
    headroom: usize,
) -> Result<usize> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening event file {}", path))?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: StrategyEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed event: {} - {}", e, line);
                continue;
            }
        };
        let Ok(mut permits) = sender.reserve_many(headroom + 1).await else {
            warn!("Strategy runner stopped before replay finished");
            break;
        };
        if let Some(permit) = permits.next() {
            permit.send(event);
            count += 1;
        }
    }

    Ok(count)
}

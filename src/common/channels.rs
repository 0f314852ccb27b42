//! Channel type definitions for feeding the decision loop

use tokio::sync::{mpsc, watch};

use super::types::StrategyEvent;

/// Default channel buffer size, used when the configuration leaves it unset
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new strategy event channel with a custom buffer size
pub fn create_event_channel_with_size(
    size: usize,
) -> (mpsc::Sender<StrategyEvent>, mpsc::Receiver<StrategyEvent>) {
    mpsc::channel(size)
}

/// Create the stop signal observed by the runner between events
pub fn create_stop_signal() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

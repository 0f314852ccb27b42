//! Serialized event loop around a [`Strategy`]

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::common::errors::Result;
use crate::common::types::StrategyEvent;
use crate::strategy::engine::Strategy;

/// Single consumer of the strategy event queue
///
/// Events are handled one at a time in arrival order. The stop signal is
/// checked between events, so an in-flight tick always completes before
/// shutdown; the final reports are emitted on the way out.
///
/// An optional drain signal ends the run once the queue is empty instead:
/// events already queued are handled first, including fills published while
/// handling them.
pub struct StrategyRunner {
    strategy: Strategy,
    events: mpsc::Receiver<StrategyEvent>,
    stop: watch::Receiver<bool>,
    drain: Option<watch::Receiver<bool>>,
}

impl StrategyRunner {
    pub fn new(
        strategy: Strategy,
        events: mpsc::Receiver<StrategyEvent>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            strategy,
            events,
            stop,
            drain: None,
        }
    }

    /// Finish once `drain` is set and every queued event has been handled
    pub fn with_drain_signal(mut self, drain: watch::Receiver<bool>) -> Self {
        self.drain = Some(drain);
        self
    }

    /// Run on a dedicated task
    pub fn spawn(self) -> JoinHandle<Result<Strategy>> {
        tokio::spawn(self.run())
    }

    /// Process events until the stop signal fires, the queue closes or a
    /// requested drain completes
    ///
    /// Non-fatal handler errors are logged and the loop continues. Returns
    /// the stopped strategy for inspection.
    #[instrument(skip(self), fields(symbol = %self.strategy.symbol()))]
    pub async fn run(mut self) -> Result<Strategy> {
        let mut stop_open = true;
        let mut drain_open = self.drain.is_some();
        let mut processed: u64 = 0;

        loop {
            if *self.stop.borrow() {
                break;
            }
            if self.drain.as_ref().is_some_and(|d| *d.borrow()) {
                processed += self.drain_queued().await?;
                break;
            }

            tokio::select! {
                biased;

                changed = self.stop.changed(), if stop_open => {
                    if changed.is_err() {
                        // sender dropped without signalling; run until the queue closes
                        stop_open = false;
                    }
                }

                changed = drain_changed(&mut self.drain), if drain_open => {
                    if changed.is_err() {
                        drain_open = false;
                    }
                }

                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("Event queue closed");
                        break;
                    };
                    processed += 1;
                    dispatch(&mut self.strategy, event).await?;
                }
            }
        }

        info!(processed, "Strategy runner stopping");
        if let Err(e) = self.strategy.stop().await {
            error!("Shutdown incomplete: {}", e);
        }
        Ok(self.strategy)
    }

    /// Handle events until the queue is empty or the stop signal fires
    async fn drain_queued(&mut self) -> Result<u64> {
        let mut handled = 0;
        while !*self.stop.borrow() {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            handled += 1;
            dispatch(&mut self.strategy, event).await?;
        }
        info!(handled, "Event queue drained");
        Ok(handled)
    }
}

/// Handle one event; only fatal errors are returned, after a final stop
async fn dispatch(strategy: &mut Strategy, event: StrategyEvent) -> Result<()> {
    if let Err(e) = strategy.handle_event(event).await {
        if e.is_fatal() {
            error!("Fatal strategy error: {}", e);
            strategy.stop().await.ok();
            return Err(e);
        }
        error!("Event handling failed: {}", e);
    }
    Ok(())
}

async fn drain_changed(
    drain: &mut Option<watch::Receiver<bool>>,
) -> std::result::Result<(), watch::error::RecvError> {
    match drain {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}

//! Flush scheduler for the bulk indexer pipeline.
//!
//! Periodically swaps out the open batch so that no operation waits longer
//! than the flush interval for a size threshold that may never be reached.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::accumulator::Accumulator;
use crate::batch::FlushTrigger;
use crate::dispatcher::Dispatcher;

/// Background timer flushing the open batch every interval.
///
/// The timer races the size triggers: whichever swaps the batch first wins,
/// and the other finds it empty.
pub struct FlushScheduler {
    handle: JoinHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
}

impl FlushScheduler {
    /// Start the timer task. Must be called from within a Tokio runtime.
    pub fn spawn(
        interval: Duration,
        accumulator: Arc<Accumulator>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(batch) = accumulator.take(FlushTrigger::Interval).await {
                            debug!(batch_id = batch.id(), operations = batch.len(), "Flush interval elapsed");
                            dispatcher.dispatch(batch).await;
                        }
                    }
                    // Also fires when the sender is dropped.
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            handle,
            shutdown_tx,
        }
    }

    /// Stop the timer and wait for a tick in progress to finish its handoff.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Flush scheduler task ended abnormally");
        }
    }
}

//! Polling loop - fixed idle interval between cycles
//!
//! The [`Poller`] owns the long-lived scheduling loop: run a cycle, idle
//! for the configured interval, repeat. The interval is measured from the
//! end of one cycle to the start of the next, so a slow cycle can never
//! overlap the following one.
//!
//! Shutdown is cooperative: on cancellation the in-flight cycle finishes
//! its currently-executing items (the engine stops starting new ones) and
//! the next cycle does not begin.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::SyncEngine;

/// Long-lived cycle scheduler
pub struct Poller {
    engine: Arc<SyncEngine>,
    idle_interval: Duration,
    shutdown: CancellationToken,
}

impl Poller {
    /// Creates a poller running `engine` every `idle_interval`
    pub fn new(engine: Arc<SyncEngine>, idle_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            idle_interval,
            shutdown,
        }
    }

    /// Runs cycles until the shutdown token is cancelled.
    ///
    /// A failed cycle (snapshot unreachable, store unavailable) is logged
    /// and retried at the next interval; it never tears the loop down.
    pub async fn run(&self) {
        info!(
            idle_interval_secs = self.idle_interval.as_secs(),
            "Polling loop started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.engine.run_cycle().await {
                Ok(outcome) => {
                    info!(cycle_id = %outcome.cycle_id, %outcome, "Polling cycle finished");
                }
                Err(err) => {
                    warn!(error = %err, "Cycle aborted, retrying at next interval");
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.idle_interval) => {}
            }
        }

        info!("Polling loop stopped");
    }
}

//! Run command - continuous polling loop
//!
//! Starts the poller and keeps cycling until SIGINT or SIGTERM. Shutdown
//! is cooperative: the in-flight cycle finishes its current items, no new
//! items start, and the next cycle never begins.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use drivesink_core::config::Config;
use drivesink_sync::Poller;

#[derive(Debug, Args)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let shutdown = CancellationToken::new();

        {
            let token = shutdown.clone();
            tokio::spawn(async move {
                wait_for_signal().await;
                info!("Shutdown signal received, finishing in-flight items");
                token.cancel();
            });
        }

        let engine = super::build_engine(config, shutdown.clone()).await?;
        let poller = Poller::new(
            engine,
            Duration::from_secs(config.sync.poll_interval),
            shutdown,
        );

        poller.run().await;
        info!("drivesink stopped");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "Failed to install SIGTERM handler, listening for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

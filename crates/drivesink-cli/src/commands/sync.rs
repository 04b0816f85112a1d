//! Sync command - one cycle, on demand
//!
//! Runs exactly one snapshot → diff → pipeline → commit pass and prints
//! the outcome counts, then exits. A cycle-level failure (snapshot
//! unreachable, store unavailable) exits non-zero.

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use drivesink_core::config::Config;

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let engine = super::build_engine(config, CancellationToken::new()).await?;

        let outcome = engine.run_cycle().await.context("Sync cycle failed")?;

        println!("Cycle {}", outcome.cycle_id);
        println!("  added:    {}", outcome.added);
        println!("  modified: {}", outcome.modified);
        println!("  removed:  {}", outcome.removed);
        println!("  failed:   {}", outcome.failed);
        println!("  duration: {} ms", outcome.duration_ms);

        Ok(())
    }
}

//! Status command - inspect stored state
//!
//! Reads only the metadata store (no provider or sink credentials
//! needed): per-status file counts plus the most recent sync-history
//! entries.

use anyhow::Result;
use clap::Args;

use drivesink_core::config::Config;
use drivesink_core::ports::IMetadataStore;

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Number of history entries to show
    #[arg(long, default_value_t = 10)]
    pub history: u32,
}

impl StatusCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let store = super::open_store(config).await?;

        let counts = store.count_by_status().await?;
        println!("Files by status:");
        if counts.is_empty() {
            println!("  (no files tracked yet)");
        }
        let mut sorted: Vec<_> = counts.into_iter().collect();
        sorted.sort();
        for (status, count) in sorted {
            println!("  {status:<8} {count}");
        }

        let history = store.recent_history(self.history).await?;
        if !history.is_empty() {
            println!();
            println!("Recent activity:");
            for entry in history {
                let details = entry.details.as_deref().unwrap_or("");
                println!(
                    "  {} {:<8} {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.remote_id,
                    details
                );
            }
        }

        Ok(())
    }
}

//! drivesink CLI - watch a remote drive folder, ingest changes downstream
//!
//! Provides commands for:
//! - Running the continuous polling loop (`run`)
//! - Executing exactly one sync cycle (`sync`)
//! - Inspecting stored state and recent history (`status`)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{run::RunCommand, status::StatusCommand, sync::SyncCommand};
use drivesink_core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "drivesink", version, about = "Remote drive to ingestion-API sync")]
pub struct Cli {
    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the continuous polling loop until interrupted
    Run(RunCommand),
    /// Run exactly one sync cycle and report its outcome
    Sync(SyncCommand),
    /// Show stored file counts per status and recent sync history
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // CLI verbosity overrides the configured level; RUST_LOG overrides both.
    let level = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(config_path = %config_path.display(), "Loaded configuration");

    match cli.command {
        Commands::Run(cmd) => cmd.execute(&config).await,
        Commands::Sync(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    }
}

//! CLI command implementations

pub mod run;
pub mod status;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use drivesink_core::config::Config;
use drivesink_drive::{DriveClient, DriveTreeProvider};
use drivesink_ingest::IngestClient;
use drivesink_store::{DatabasePool, SqliteMetadataStore};
use drivesink_sync::engine::SyncEngine;

/// Opens the metadata store at the configured path
pub(crate) async fn open_store(config: &Config) -> Result<Arc<SqliteMetadataStore>> {
    let pool = DatabasePool::new(&config.database.path)
        .await
        .context("Failed to open metadata store")?;
    Ok(Arc::new(SqliteMetadataStore::new(pool.pool().clone())))
}

/// Wires the adapters and builds the sync engine
pub(crate) async fn build_engine(
    config: &Config,
    shutdown: CancellationToken,
) -> Result<Arc<SyncEngine>> {
    config.validate()?;

    let store = open_store(config).await?;
    let provider = Arc::new(DriveTreeProvider::new(
        DriveClient::new(&config.drive),
        config.drive.root_folder_id.clone(),
    ));
    let sink = Arc::new(IngestClient::new(&config.ingest));

    Ok(Arc::new(SyncEngine::new(
        provider, sink, store, config, shutdown,
    )))
}

//! Ports (driven/secondary interfaces)
//!
//! The sync engine depends only on these traits; the concrete adapters
//! live in `drivesink-store`, `drivesink-drive`, and `drivesink-ingest`.

pub mod ingestion_sink;
pub mod metadata_store;
pub mod remote_tree;

pub use ingestion_sink::{IIngestionSink, SinkError, SubmitReceipt, SubmitRequest};
pub use metadata_store::{HistoryAction, HistoryEntry, IMetadataStore, StoreError};
pub use remote_tree::{IRemoteTreeProvider, ProviderError};

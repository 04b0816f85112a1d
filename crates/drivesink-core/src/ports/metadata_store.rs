//! Metadata store port (driven/secondary port)
//!
//! Durable, concurrency-safe CRUD over [`FileRecord`], keyed by
//! [`RemoteId`]. The store is both the diff baseline and the durability
//! ledger: every mutation must be durable before the call returns, so a
//! crash after `mark_synced` never re-uploads and a crash before it
//! always does (at-least-once delivery from the store's perspective).
//!
//! ## Design Notes
//!
//! - Errors are the typed [`StoreError`]; an unavailable store is fatal
//!   for the current cycle (the orchestrator aborts rather than making
//!   partial progress against an unreliable ledger).
//! - `list_all` must be snapshot-consistent: a point-in-time view where
//!   no record is read twice or skipped because of concurrent writes.
//! - Multiple readers may run concurrently with a writer; writers to
//!   different records never block each other; writers to the same
//!   record serialize.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::newtypes::{Fingerprint, RemoteId};
use crate::domain::record::FileRecord;

// ============================================================================
// StoreError
// ============================================================================

/// Errors surfaced by metadata store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage layer itself failed (I/O, connection, lock timeout).
    /// Aborts the current cycle; the next scheduled cycle retries.
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to a domain record
    #[error("Corrupt metadata row: {0}")]
    Corrupt(String),
}

// ============================================================================
// Sync history
// ============================================================================

/// Action recorded in the sync-history ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    /// File first observed remotely
    New,
    /// Remote change detected
    Modified,
    /// Remote deletion processed
    Deleted,
    /// Ingestion committed
    Synced,
    /// Retries exhausted
    Failed,
}

impl HistoryAction {
    /// Stable string form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::New => "new",
            HistoryAction::Modified => "modified",
            HistoryAction::Deleted => "deleted",
            HistoryAction::Synced => "synced",
            HistoryAction::Failed => "failed",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the sync-history ledger
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Auto-increment row id
    pub id: i64,
    /// Remote file the action applied to
    pub remote_id: RemoteId,
    /// Action string (see [`HistoryAction`])
    pub action: String,
    /// When the action was recorded
    pub timestamp: DateTime<Utc>,
    /// Optional free-form details (error text, fingerprints)
    pub details: Option<String>,
}

// ============================================================================
// IMetadataStore trait
// ============================================================================

/// Port trait for durable file-state persistence
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Retrieves a record by its remote id
    async fn get(&self, remote_id: &RemoteId) -> Result<Option<FileRecord>, StoreError>;

    /// Returns a point-in-time listing of all records (including
    /// tombstones), used by the change detector as the diff baseline
    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// Inserts or fully replaces a record (idempotent, last-writer-wins
    /// on `updated_at`)
    async fn upsert(&self, record: &FileRecord) -> Result<(), StoreError>;

    /// Atomically transitions a record to `synced`, setting the sync
    /// baseline to `fingerprint` and updating the downstream document
    /// handle when one was returned
    async fn mark_synced(
        &self,
        remote_id: &RemoteId,
        fingerprint: &Fingerprint,
        document_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Atomically transitions a record to `failed`, recording the error
    /// and preserving `last_synced_fingerprint`
    async fn mark_failed(&self, remote_id: &RemoteId, error: &str) -> Result<(), StoreError>;

    /// Atomically tombstones a record (status `deleted`)
    async fn mark_deleted(&self, remote_id: &RemoteId) -> Result<(), StoreError>;

    /// Hard-deletes a record; only called after the downstream deletion
    /// was acknowledged
    async fn delete(&self, remote_id: &RemoteId) -> Result<(), StoreError>;

    /// Counts records grouped by status string
    async fn count_by_status(&self) -> Result<HashMap<String, u64>, StoreError>;

    /// Appends a row to the sync-history ledger
    async fn append_history(
        &self,
        remote_id: &RemoteId,
        action: HistoryAction,
        details: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Returns the most recent history rows, newest first
    async fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError>;
}

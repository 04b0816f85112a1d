//! Sync orchestrator - drives one full cycle
//!
//! [`SyncEngine::run_cycle`] performs snapshot → diff → per-item pipeline
//! → commit. Per item the pipeline is:
//!
//! ```text
//! Detected ──► Downloading ──► Uploading ──► Committed
//!     │             │              │
//!     └─────────────┴──────────────┴──► Failed (retries exhausted)
//! ```
//!
//! Item failures are contained: a failed item is recorded (`failed` +
//! `last_error`) and the cycle moves on. Only two things abort a cycle -
//! an unobtainable snapshot (an incomplete listing must never be diffed)
//! and an unavailable metadata store (no partial progress against an
//! unreliable ledger). Both leave the store untouched beyond what already
//! committed and are retried at the next scheduled interval.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use drivesink_core::config::{Config, RemovalPolicy};
use drivesink_core::domain::{FileRecord, RemoteId, Snapshot, SnapshotEntry};
use drivesink_core::ports::{
    HistoryAction, IIngestionSink, IMetadataStore, IRemoteTreeProvider, ProviderError, SinkError,
    StoreError, SubmitRequest,
};

use crate::detector;
use crate::retry::{with_retry, RetryPolicy};

// ============================================================================
// CycleOutcome / CycleError
// ============================================================================

/// Summary of one completed cycle
///
/// `added`/`modified`/`removed` count items that committed; `failed`
/// counts items that exhausted their retries (in either direction).
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Identifier for correlating this cycle's log lines
    pub cycle_id: Uuid,
    /// New files committed downstream
    pub added: u32,
    /// Changed files re-committed downstream
    pub modified: u32,
    /// Remote deletions finalized (tombstoned or purged)
    pub removed: u32,
    /// Items left in `failed` state this cycle
    pub failed: u32,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl CycleOutcome {
    fn new(cycle_id: Uuid) -> Self {
        Self {
            cycle_id,
            added: 0,
            modified: 0,
            removed: 0,
            failed: 0,
            duration_ms: 0,
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} modified={} removed={} failed={} ({}ms)",
            self.added, self.modified, self.removed, self.failed, self.duration_ms
        )
    }
}

/// Cycle-level failures. Item-level failures never surface here.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The remote listing could not be obtained; the cycle was aborted
    /// with no store mutation (deletion is never inferred from an
    /// incomplete listing).
    #[error("Snapshot listing failed: {0}")]
    Snapshot(#[source] ProviderError),

    /// The metadata store failed; the cycle was aborted rather than
    /// making partial progress against an unreliable ledger.
    #[error("Metadata store failed: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// SyncEngine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Added,
    Modified,
}

enum ItemOutcome {
    Committed,
    Failed,
}

/// Differential-sync orchestrator
///
/// Cheap to clone: adapters are shared behind `Arc`, configuration is
/// plain data. One clone is moved into each spawned item task.
#[derive(Clone)]
pub struct SyncEngine {
    /// Remote folder tree (listing + download)
    provider: Arc<dyn IRemoteTreeProvider>,
    /// Downstream document API
    sink: Arc<dyn IIngestionSink>,
    /// Durable per-file ledger; the engine is its sole writer
    store: Arc<dyn IMetadataStore>,
    /// Retry limits applied uniformly to downloads and submissions
    retry: RetryPolicy,
    /// Concurrent item pipelines per cycle
    parallelism: usize,
    /// Downstream handling of remote deletions
    removal_policy: RemovalPolicy,
    /// Cooperative shutdown: in-flight items finish, no new items start
    shutdown: CancellationToken,
}

impl SyncEngine {
    /// Creates a new engine with the given adapters and configuration
    pub fn new(
        provider: Arc<dyn IRemoteTreeProvider>,
        sink: Arc<dyn IIngestionSink>,
        store: Arc<dyn IMetadataStore>,
        config: &Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            provider,
            sink,
            store,
            retry: RetryPolicy::from_config(&config.retry),
            parallelism: config.sync.parallelism.max(1),
            removal_policy: config.sync.removal_policy,
            shutdown,
        }
    }

    /// Runs one full cycle: snapshot → diff → pipeline → commit.
    ///
    /// Running a cycle twice against an unchanged remote produces an
    /// empty change set and no store mutation the second time.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let started = Instant::now();
        let cycle_id = Uuid::new_v4();
        let mut outcome = CycleOutcome::new(cycle_id);

        // Step 1: snapshot. Failure aborts the cycle before any mutation.
        let entries = with_retry(&self.retry, "list_recursive", |_| {
            self.provider.list_recursive()
        })
        .await
        .map_err(CycleError::Snapshot)?;
        let snapshot = Snapshot::from_entries(entries);

        // Step 2: baseline listing.
        let records = self.store.list_all().await?;

        // Step 3: diff.
        let changes = detector::diff(&snapshot, &records);
        info!(
            %cycle_id,
            snapshot = snapshot.len(),
            added = changes.added.len(),
            modified = changes.modified.len(),
            removed = changes.removed.len(),
            "Change detection complete"
        );

        if changes.is_empty() {
            outcome.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(outcome);
        }

        // Step 4: per-item pipeline, parallelism-bounded, in detector order.
        let work: Vec<(SnapshotEntry, ItemKind)> = changes
            .added
            .into_iter()
            .map(|e| (e, ItemKind::Added))
            .chain(changes.modified.into_iter().map(|e| (e, ItemKind::Modified)))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut join_set: JoinSet<(ItemKind, Result<ItemOutcome, StoreError>)> = JoinSet::new();
        let mut store_failure: Option<StoreError> = None;

        for (entry, kind) in work {
            if self.shutdown.is_cancelled() {
                info!(%cycle_id, "Shutdown requested, not starting further items");
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let engine = self.clone();
            join_set.spawn(async move {
                let result = engine.process_item(&entry, kind).await;
                drop(permit);
                (kind, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((kind, Ok(ItemOutcome::Committed))) => match kind {
                    ItemKind::Added => outcome.added += 1,
                    ItemKind::Modified => outcome.modified += 1,
                },
                Ok((_, Ok(ItemOutcome::Failed))) => outcome.failed += 1,
                Ok((_, Err(store_err))) => {
                    error!(%cycle_id, error = %store_err, "Store failed mid-pipeline");
                    store_failure.get_or_insert(store_err);
                }
                Err(join_err) => {
                    error!(%cycle_id, error = %join_err, "Item task panicked");
                    outcome.failed += 1;
                }
            }
        }

        if let Some(err) = store_failure {
            return Err(err.into());
        }

        // Step 5: removals, per the configured policy.
        for record in &changes.removed {
            if self.shutdown.is_cancelled() {
                info!(%cycle_id, "Shutdown requested, deferring remaining removals");
                break;
            }
            if self.process_removed(record).await? {
                outcome.removed += 1;
            } else {
                outcome.failed += 1;
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            %cycle_id,
            added = outcome.added,
            modified = outcome.modified,
            removed = outcome.removed,
            failed = outcome.failed,
            duration_ms = outcome.duration_ms,
            "Cycle completed"
        );

        Ok(outcome)
    }

    // ========================================================================
    // Per-item pipeline
    // ========================================================================

    /// Drives one added/modified item through download → submit → commit.
    ///
    /// Returns `Err` only for store failures (cycle-fatal); provider and
    /// sink failures are absorbed into the item's `failed` state.
    async fn process_item(
        &self,
        entry: &SnapshotEntry,
        kind: ItemKind,
    ) -> Result<ItemOutcome, StoreError> {
        let id = &entry.remote_id;

        // Persist the pending observation first so a crash anywhere in
        // this pipeline is recoverable: the next cycle re-detects the item.
        let record = match self.store.get(id).await? {
            Some(mut existing) => {
                existing.rearm(entry.path.clone(), entry.fingerprint.clone(), entry.size_bytes);
                existing
            }
            None => FileRecord::observed(
                id.clone(),
                entry.path.clone(),
                entry.fingerprint.clone(),
                entry.size_bytes,
            ),
        };
        self.store.upsert(&record).await?;

        let action = match kind {
            ItemKind::Added => HistoryAction::New,
            ItemKind::Modified => HistoryAction::Modified,
        };
        self.store
            .append_history(id, action, Some(entry.fingerprint.as_str()))
            .await?;

        // Download.
        let bytes = match with_retry(&self.retry, "fetch_content", |_| {
            self.provider.fetch_content(id)
        })
        .await
        {
            Ok(bytes) => bytes,
            Err(err) => {
                return self.fail_item(id, &format!("download failed: {err}")).await;
            }
        };

        // The sink has no in-place replace; drop the stale document before
        // re-submitting a modified file. Losing this race is non-fatal.
        if kind == ItemKind::Modified {
            if let Some(doc_id) = record.sink_document_id.as_deref() {
                match with_retry(&self.retry, "remove_stale_document", |_| {
                    self.sink.remove(doc_id)
                })
                .await
                {
                    Ok(()) | Err(SinkError::NotFound) => {}
                    Err(err) => {
                        warn!(
                            remote_id = %id,
                            document_id = doc_id,
                            error = %err,
                            "Failed to remove stale document, re-submitting anyway"
                        );
                    }
                }
            }
        }

        // Submit.
        let receipt = match with_retry(&self.retry, "submit", |_| {
            self.sink.submit(SubmitRequest {
                remote_id: id,
                path: &entry.path,
                fingerprint: &entry.fingerprint,
                size_bytes: entry.size_bytes,
                bytes: &bytes,
            })
        })
        .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                return self.fail_item(id, &format!("submit failed: {err}")).await;
            }
        };

        // Commit. After this returns, a crash can no longer re-upload.
        self.store
            .mark_synced(id, &entry.fingerprint, receipt.document_id.as_deref())
            .await?;
        self.store
            .append_history(id, HistoryAction::Synced, Some(entry.fingerprint.as_str()))
            .await?;

        debug!(remote_id = %id, path = %entry.path, "Item committed");
        Ok(ItemOutcome::Committed)
    }

    async fn fail_item(&self, id: &RemoteId, error: &str) -> Result<ItemOutcome, StoreError> {
        self.store.mark_failed(id, error).await?;
        self.store
            .append_history(id, HistoryAction::Failed, Some(error))
            .await?;
        Ok(ItemOutcome::Failed)
    }

    // ========================================================================
    // Removal handling
    // ========================================================================

    /// Finalizes one remote deletion per the configured policy.
    ///
    /// Returns `Ok(true)` when finalized, `Ok(false)` when the downstream
    /// deletion could not be completed (the record stays live and the next
    /// cycle re-detects the removal).
    async fn process_removed(&self, record: &FileRecord) -> Result<bool, StoreError> {
        let id = &record.remote_id;

        match self.removal_policy {
            RemovalPolicy::Unlink => {
                self.store.mark_deleted(id).await?;
                self.store
                    .append_history(id, HistoryAction::Deleted, None)
                    .await?;
                debug!(remote_id = %id, path = %record.path, "Record tombstoned");
                Ok(true)
            }
            RemovalPolicy::Purge => {
                if let Some(doc_id) = record.sink_document_id.as_deref() {
                    match with_retry(&self.retry, "remove_document", |_| self.sink.remove(doc_id))
                        .await
                    {
                        Ok(()) => {}
                        Err(SinkError::NotFound) => {
                            debug!(remote_id = %id, document_id = doc_id, "Document already gone downstream");
                        }
                        Err(err) => {
                            warn!(
                                remote_id = %id,
                                document_id = doc_id,
                                error = %err,
                                "Downstream deletion failed, record kept for next cycle"
                            );
                            return Ok(false);
                        }
                    }
                }
                self.store.delete(id).await?;
                self.store
                    .append_history(id, HistoryAction::Deleted, record.sink_document_id.as_deref())
                    .await?;
                debug!(remote_id = %id, path = %record.path, "Record purged");
                Ok(true)
            }
        }
    }
}

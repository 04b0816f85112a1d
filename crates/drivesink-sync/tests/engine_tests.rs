//! Integration tests for the sync engine
//!
//! Drives SyncEngine cycles against controllable in-process fakes for the
//! remote tree provider and the ingestion sink, with the real SQLite
//! metadata store (in-memory) underneath, so commit/durability behavior
//! is exercised end to end.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use drivesink_core::config::{Config, RemovalPolicy};
use drivesink_core::domain::{Fingerprint, FileRecord, RemoteId, RemotePath, SnapshotEntry, SyncStatus};
use drivesink_core::ports::{
    IIngestionSink, IMetadataStore, IRemoteTreeProvider, ProviderError, SinkError, SubmitReceipt,
    SubmitRequest,
};
use drivesink_store::{DatabasePool, SqliteMetadataStore};
use drivesink_sync::engine::SyncEngine;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeProvider {
    entries: Mutex<Vec<SnapshotEntry>>,
    content: Mutex<HashMap<String, Vec<u8>>>,
    fail_listing: AtomicBool,
    /// Remote ids whose downloads always fail transiently
    fetch_fail_transient: Mutex<HashSet<String>>,
    fetch_calls: Mutex<HashMap<String, u32>>,
}

impl FakeProvider {
    fn set_file(&self, id: &str, path: &str, fingerprint: &str, bytes: &[u8]) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.remote_id.as_str() != id);
        entries.push(SnapshotEntry {
            remote_id: RemoteId::new(id).unwrap(),
            path: RemotePath::new(path).unwrap(),
            fingerprint: Fingerprint::new(fingerprint).unwrap(),
            size_bytes: bytes.len() as u64,
        });
        self.content
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes.to_vec());
    }

    fn remove_file(&self, id: &str) {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.remote_id.as_str() != id);
    }

    fn fetch_attempts(&self, id: &str) -> u32 {
        *self.fetch_calls.lock().unwrap().get(id).unwrap_or(&0)
    }
}

#[async_trait::async_trait]
impl IRemoteTreeProvider for FakeProvider {
    async fn list_recursive(&self) -> Result<Vec<SnapshotEntry>, ProviderError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("listing offline".into()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn fetch_content(&self, remote_id: &RemoteId) -> Result<Vec<u8>, ProviderError> {
        *self
            .fetch_calls
            .lock()
            .unwrap()
            .entry(remote_id.as_str().to_string())
            .or_insert(0) += 1;

        if self
            .fetch_fail_transient
            .lock()
            .unwrap()
            .contains(remote_id.as_str())
        {
            return Err(ProviderError::Unavailable("download timeout".into()));
        }

        self.content
            .lock()
            .unwrap()
            .get(remote_id.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(remote_id.as_str().to_string()))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SubmitMode {
    Ok,
    AlwaysTransient,
    AlwaysRejected,
}

#[derive(Clone, Copy, PartialEq)]
enum RemoveMode {
    Ok,
    NotFound,
    AlwaysTransient,
}

struct FakeSink {
    submit_mode: Mutex<SubmitMode>,
    remove_mode: Mutex<RemoveMode>,
    submitted: Mutex<Vec<String>>,
    submit_attempts: Mutex<HashMap<String, u32>>,
    removed: Mutex<Vec<String>>,
    next_doc: AtomicU32,
}

impl FakeSink {
    fn new() -> Self {
        Self {
            submit_mode: Mutex::new(SubmitMode::Ok),
            remove_mode: Mutex::new(RemoveMode::Ok),
            submitted: Mutex::new(Vec::new()),
            submit_attempts: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            next_doc: AtomicU32::new(1),
        }
    }

    fn set_submit_mode(&self, mode: SubmitMode) {
        *self.submit_mode.lock().unwrap() = mode;
    }

    fn set_remove_mode(&self, mode: RemoveMode) {
        *self.remove_mode.lock().unwrap() = mode;
    }

    fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    fn submit_attempts(&self, id: &str) -> u32 {
        *self.submit_attempts.lock().unwrap().get(id).unwrap_or(&0)
    }

    fn removed_documents(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IIngestionSink for FakeSink {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitReceipt, SinkError> {
        *self
            .submit_attempts
            .lock()
            .unwrap()
            .entry(request.remote_id.as_str().to_string())
            .or_insert(0) += 1;

        match *self.submit_mode.lock().unwrap() {
            SubmitMode::AlwaysTransient => Err(SinkError::Unavailable("503".into())),
            SubmitMode::AlwaysRejected => Err(SinkError::Rejected("unsupported type".into())),
            SubmitMode::Ok => {
                self.submitted
                    .lock()
                    .unwrap()
                    .push(request.remote_id.as_str().to_string());
                let doc = self.next_doc.fetch_add(1, Ordering::SeqCst);
                Ok(SubmitReceipt {
                    document_id: Some(format!("doc-{doc}")),
                })
            }
        }
    }

    async fn remove(&self, document_id: &str) -> Result<(), SinkError> {
        match *self.remove_mode.lock().unwrap() {
            RemoveMode::AlwaysTransient => Err(SinkError::Unavailable("503".into())),
            RemoveMode::NotFound => Err(SinkError::NotFound),
            RemoveMode::Ok => {
                self.removed.lock().unwrap().push(document_id.to_string());
                Ok(())
            }
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    provider: Arc<FakeProvider>,
    sink: Arc<FakeSink>,
    store: Arc<SqliteMetadataStore>,
    engine: SyncEngine,
    shutdown: CancellationToken,
}

async fn harness(removal_policy: RemovalPolicy) -> Harness {
    let pool = DatabasePool::in_memory().await.unwrap();
    let store = Arc::new(SqliteMetadataStore::new(pool.pool().clone()));
    let provider = Arc::new(FakeProvider::default());
    let sink = Arc::new(FakeSink::new());

    let mut config = Config::default();
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 0;
    config.retry.max_delay_ms = 0;
    config.sync.parallelism = 4;
    config.sync.removal_policy = removal_policy;

    let shutdown = CancellationToken::new();
    let engine = SyncEngine::new(
        provider.clone(),
        sink.clone(),
        store.clone(),
        &config,
        shutdown.clone(),
    );

    Harness {
        provider,
        sink,
        store,
        engine,
        shutdown,
    }
}

fn id(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

async fn get_record(store: &SqliteMetadataStore, remote_id: &str) -> FileRecord {
    store.get(&id(remote_id)).await.unwrap().unwrap()
}

// ============================================================================
// Happy path and idempotence
// ============================================================================

#[tokio::test]
async fn test_first_cycle_commits_new_file() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "docs/a.txt", "fp1", b"hello");

    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(h.sink.submit_count(), 1);

    let rec = get_record(&h.store, "A").await;
    assert_eq!(rec.status, SyncStatus::Synced);
    assert_eq!(
        rec.last_synced_fingerprint,
        Some(Fingerprint::new("fp1").unwrap())
    );
    assert_eq!(rec.sink_document_id.as_deref(), Some("doc-1"));
}

#[tokio::test]
async fn test_second_cycle_is_idempotent() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"hello");

    h.engine.run_cycle().await.unwrap();
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.modified, 0);
    assert_eq!(outcome.removed, 0);
    assert_eq!(outcome.failed, 0);
    // No duplicate delivery
    assert_eq!(h.sink.submit_count(), 1);
}

#[tokio::test]
async fn test_modified_file_is_recommitted_and_stale_document_replaced() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    h.provider.set_file("A", "a.txt", "fp2", b"v2");
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.modified, 1);
    assert_eq!(h.sink.submit_count(), 2);
    // The first upload's document was removed before re-submitting
    assert_eq!(h.sink.removed_documents(), vec!["doc-1".to_string()]);

    let rec = get_record(&h.store, "A").await;
    assert_eq!(rec.status, SyncStatus::Synced);
    assert_eq!(
        rec.last_synced_fingerprint,
        Some(Fingerprint::new("fp2").unwrap())
    );
    assert_eq!(rec.sink_document_id.as_deref(), Some("doc-2"));
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    // Store empty, snapshot {A: fp1} -> added, committed synced(fp1).
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    let c1 = h.engine.run_cycle().await.unwrap();
    assert_eq!((c1.added, c1.modified, c1.removed), (1, 0, 0));

    // Snapshot unchanged -> empty change set.
    let c2 = h.engine.run_cycle().await.unwrap();
    assert_eq!((c2.added, c2.modified, c2.removed, c2.failed), (0, 0, 0, 0));

    // Snapshot {A: fp2} -> modified, committed synced(fp2).
    h.provider.set_file("A", "a.txt", "fp2", b"v2");
    let c3 = h.engine.run_cycle().await.unwrap();
    assert_eq!((c3.added, c3.modified, c3.removed), (0, 1, 0));

    // Snapshot {} -> removed.
    h.provider.remove_file("A");
    let c4 = h.engine.run_cycle().await.unwrap();
    assert_eq!((c4.added, c4.modified, c4.removed), (0, 0, 1));
    assert!(get_record(&h.store, "A").await.is_tombstone());

    // Tombstone stays quiet afterwards.
    let c5 = h.engine.run_cycle().await.unwrap();
    assert_eq!((c5.added, c5.modified, c5.removed, c5.failed), (0, 0, 0, 0));
}

// ============================================================================
// Retry behavior
// ============================================================================

#[tokio::test]
async fn test_transient_sink_failure_uses_exact_retry_budget() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.sink.set_submit_mode(SubmitMode::AlwaysTransient);

    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.failed, 1);
    // Exactly max_attempts, never fewer, never more
    assert_eq!(h.sink.submit_attempts("A"), 3);

    let rec = get_record(&h.store, "A").await;
    assert_eq!(rec.status, SyncStatus::Failed);
    assert!(rec.last_error.as_deref().unwrap().contains("submit failed"));
}

#[tokio::test]
async fn test_permanent_rejection_fails_without_retry() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.sink.set_submit_mode(SubmitMode::AlwaysRejected);

    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(h.sink.submit_attempts("A"), 1);
}

#[tokio::test]
async fn test_failed_item_is_retried_next_cycle_and_recovers() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.sink.set_submit_mode(SubmitMode::AlwaysTransient);
    h.engine.run_cycle().await.unwrap();
    assert_eq!(get_record(&h.store, "A").await.status, SyncStatus::Failed);

    // Same fingerprint, but failed items are always reclassified
    h.sink.set_submit_mode(SubmitMode::Ok);
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.modified, 1);
    assert_eq!(get_record(&h.store, "A").await.status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_one_failing_item_never_blocks_the_rest() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.provider.set_file("B", "b.txt", "fp1", b"v1");
    h.provider
        .fetch_fail_transient
        .lock()
        .unwrap()
        .insert("A".to_string());

    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(h.provider.fetch_attempts("A"), 3);
    assert_eq!(get_record(&h.store, "A").await.status, SyncStatus::Failed);
    assert_eq!(get_record(&h.store, "B").await.status, SyncStatus::Synced);
}

// ============================================================================
// Cycle-level failure semantics
// ============================================================================

#[tokio::test]
async fn test_listing_failure_aborts_cycle_without_store_mutation() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    // Provider goes dark: the cycle aborts and nothing is inferred
    h.provider.fail_listing.store(true, Ordering::SeqCst);
    let result = h.engine.run_cycle().await;

    assert!(result.is_err());
    let rec = get_record(&h.store, "A").await;
    // Not tombstoned, not failed - exactly as the last good cycle left it
    assert_eq!(rec.status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_crash_between_observation_and_commit_is_recovered() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");

    // Simulate a crash after the pending observation was persisted but
    // before any commit: the record exists with no sync baseline.
    let crashed = FileRecord::observed(
        id("A"),
        RemotePath::new("a.txt").unwrap(),
        Fingerprint::new("fp1").unwrap(),
        2,
    );
    h.store.upsert(&crashed).await.unwrap();

    let outcome = h.engine.run_cycle().await.unwrap();

    // Re-detected as added and driven through the pipeline again
    assert_eq!(outcome.added, 1);
    assert_eq!(h.sink.submit_count(), 1);
    assert_eq!(get_record(&h.store, "A").await.status, SyncStatus::Synced);
}

// ============================================================================
// Removal policies
// ============================================================================

#[tokio::test]
async fn test_purge_policy_deletes_downstream_then_row() {
    let h = harness(RemovalPolicy::Purge).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    h.provider.remove_file("A");
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.removed, 1);
    assert_eq!(h.sink.removed_documents(), vec!["doc-1".to_string()]);
    assert!(h.store.get(&id("A")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_purge_treats_not_found_as_acknowledged() {
    let h = harness(RemovalPolicy::Purge).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    h.provider.remove_file("A");
    h.sink.set_remove_mode(RemoveMode::NotFound);
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.removed, 1);
    assert!(h.store.get(&id("A")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_purge_failure_keeps_record_for_next_cycle() {
    let h = harness(RemovalPolicy::Purge).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    h.provider.remove_file("A");
    h.sink.set_remove_mode(RemoveMode::AlwaysTransient);
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.removed, 0);
    assert_eq!(outcome.failed, 1);
    // The record is never silently dropped before the downstream ack
    assert!(h.store.get(&id("A")).await.unwrap().is_some());

    // Once the sink recovers, the removal is re-detected and finalized
    h.sink.set_remove_mode(RemoveMode::Ok);
    let outcome = h.engine.run_cycle().await.unwrap();
    assert_eq!(outcome.removed, 1);
    assert!(h.store.get(&id("A")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_recreated_file_after_unlink_tombstone_is_added_again() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.engine.run_cycle().await.unwrap();

    h.provider.remove_file("A");
    h.engine.run_cycle().await.unwrap();
    assert!(get_record(&h.store, "A").await.is_tombstone());

    h.provider.set_file("A", "a.txt", "fp9", b"v9");
    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 1);
    let rec = get_record(&h.store, "A").await;
    assert_eq!(rec.status, SyncStatus::Synced);
    assert_eq!(
        rec.last_synced_fingerprint,
        Some(Fingerprint::new("fp9").unwrap())
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_pipelines_commit_independently() {
    let h = harness(RemovalPolicy::Unlink).await;
    for i in 0..10 {
        let id = format!("file-{i}");
        let path = format!("batch/file-{i}.txt");
        h.provider.set_file(&id, &path, "fp1", b"payload");
    }

    let outcome = h.engine.run_cycle().await.unwrap();

    assert_eq!(outcome.added, 10);
    assert_eq!(outcome.failed, 0);
    assert_eq!(h.sink.submit_count(), 10);

    let counts = h.store.count_by_status().await.unwrap();
    assert_eq!(counts.get("synced"), Some(&10));
}

#[tokio::test]
async fn test_shutdown_before_cycle_processes_no_items() {
    let h = harness(RemovalPolicy::Unlink).await;
    h.provider.set_file("A", "a.txt", "fp1", b"v1");
    h.shutdown.cancel();

    let outcome = h.engine.run_cycle().await.unwrap();

    // The diff still ran, but no item pipeline started
    assert_eq!(outcome.added, 0);
    assert_eq!(h.sink.submit_count(), 0);
    assert!(h.store.get(&id("A")).await.unwrap().is_none());
}

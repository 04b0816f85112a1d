//! FileRecord domain entity
//!
//! One row per remote file ever observed, keyed by [`RemoteId`]. The
//! record doubles as the diff baseline (what did we last see?) and the
//! durability ledger (what has actually been delivered downstream?).
//!
//! ## Status machine
//!
//! ```text
//!              observe                commit
//!   (absent) ──────────► pending ──────────► synced
//!                           │  ▲               │
//!          retries exhausted│  │ re-detected   │ remote change
//!                           ▼  │               ▼
//!                         failed ◄────────── pending
//!
//!   any non-deleted state ──(absent from snapshot, unlink policy)──► deleted
//! ```
//!
//! `deleted` is a tombstone: it records that a remote deletion was
//! processed, so the file is never re-detected as new unless it actually
//! reappears remotely. Under the purge policy the row is removed outright
//! once the downstream acknowledged, and no tombstone is kept.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{Fingerprint, RemoteId, RemotePath};

// ============================================================================
// SyncStatus
// ============================================================================

/// Persisted synchronization status of a file record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Observed but not (or not yet successfully) delivered downstream
    #[default]
    Pending,
    /// Delivered; `last_synced_fingerprint` matches the delivered content
    Synced,
    /// Retries exhausted during the last cycle; retried every cycle
    Failed,
    /// Tombstone - the remote deletion was processed
    Deleted,
}

impl SyncStatus {
    /// Stable string form used in the database and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Deleted => "deleted",
        }
    }

    /// Returns true for states that count as "live" for removal
    /// detection. Tombstones are not live: their absence from a snapshot
    /// carries no information.
    pub fn is_live(&self) -> bool {
        !matches!(self, SyncStatus::Deleted)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            "deleted" => Ok(SyncStatus::Deleted),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// FileRecord
// ============================================================================

/// Last-known state of one remote file
///
/// Invariants maintained by the transition methods:
/// - `status == Synced` implies `last_synced_fingerprint == Some(fingerprint)`
///   as of the commit.
/// - `mark_failed` preserves `last_synced_fingerprint`, so a failed file
///   still diffs as modified (and is retried) on every later cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable remote identifier (primary key)
    pub remote_id: RemoteId,
    /// Path inside the watched folder, for logging and ordering
    pub path: RemotePath,
    /// Fingerprint observed in the most recent snapshot
    pub fingerprint: Fingerprint,
    /// File size in bytes as reported by the remote
    pub size_bytes: u64,
    /// Fingerprint as of the last successful ingestion (None before the
    /// first success)
    pub last_synced_fingerprint: Option<Fingerprint>,
    /// Current status
    pub status: SyncStatus,
    /// Error text from the last failed attempt (status == Failed)
    pub last_error: Option<String>,
    /// Downstream document handle returned by the sink, used for purge
    /// and for replacing stale documents on re-upload
    pub sink_document_id: Option<String>,
    /// Timestamp of the last local write to this row
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a fresh pending record for a newly observed file
    pub fn observed(
        remote_id: RemoteId,
        path: RemotePath,
        fingerprint: Fingerprint,
        size_bytes: u64,
    ) -> Self {
        Self {
            remote_id,
            path,
            fingerprint,
            size_bytes,
            last_synced_fingerprint: None,
            status: SyncStatus::Pending,
            last_error: None,
            sink_document_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Re-arms an existing record for a new pipeline pass: refreshes the
    /// observed fingerprint/path/size and moves back to pending while
    /// keeping the sync baseline and document handle intact.
    pub fn rearm(&mut self, path: RemotePath, fingerprint: Fingerprint, size_bytes: u64) {
        self.path = path;
        self.fingerprint = fingerprint;
        self.size_bytes = size_bytes;
        self.status = SyncStatus::Pending;
        self.last_error = None;
        self.touch();
    }

    /// Commits a successful ingestion: status becomes `Synced` and the
    /// delivered fingerprint becomes the new baseline.
    pub fn commit_synced(&mut self, document_id: Option<String>) {
        self.last_synced_fingerprint = Some(self.fingerprint.clone());
        if document_id.is_some() {
            self.sink_document_id = document_id;
        }
        self.status = SyncStatus::Synced;
        self.last_error = None;
        self.touch();
    }

    /// Records retry exhaustion. The sync baseline is preserved so the
    /// next cycle re-detects the file as modified.
    pub fn commit_failed(&mut self, error: impl Into<String>) {
        self.status = SyncStatus::Failed;
        self.last_error = Some(error.into());
        self.touch();
    }

    /// Tombstones the record after a processed remote deletion
    pub fn commit_deleted(&mut self) {
        self.status = SyncStatus::Deleted;
        self.last_error = None;
        self.touch();
    }

    /// Returns true if this record is a tombstone
    pub fn is_tombstone(&self) -> bool {
        self.status == SyncStatus::Deleted
    }

    /// Returns true if the record has never been delivered downstream
    pub fn never_synced(&self) -> bool {
        self.last_synced_fingerprint.is_none()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, path: &str, fp: &str) -> FileRecord {
        FileRecord::observed(
            RemoteId::new(id).unwrap(),
            RemotePath::new(path).unwrap(),
            Fingerprint::new(fp).unwrap(),
            42,
        )
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_round_trip_strings() {
            for status in [
                SyncStatus::Pending,
                SyncStatus::Synced,
                SyncStatus::Failed,
                SyncStatus::Deleted,
            ] {
                let parsed: SyncStatus = status.as_str().parse().unwrap();
                assert_eq!(parsed, status);
            }
        }

        #[test]
        fn test_unknown_string_rejected() {
            assert!("uploading".parse::<SyncStatus>().is_err());
        }

        #[test]
        fn test_liveness() {
            assert!(SyncStatus::Pending.is_live());
            assert!(SyncStatus::Synced.is_live());
            assert!(SyncStatus::Failed.is_live());
            assert!(!SyncStatus::Deleted.is_live());
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn test_observed_starts_pending() {
            let rec = record("A", "docs/a.txt", "fp1");
            assert_eq!(rec.status, SyncStatus::Pending);
            assert!(rec.never_synced());
            assert!(rec.last_error.is_none());
            assert!(rec.sink_document_id.is_none());
        }

        #[test]
        fn test_commit_synced_sets_baseline() {
            let mut rec = record("A", "docs/a.txt", "fp1");
            rec.commit_synced(Some("doc-9".to_string()));

            assert_eq!(rec.status, SyncStatus::Synced);
            assert_eq!(rec.last_synced_fingerprint, Some(rec.fingerprint.clone()));
            assert_eq!(rec.sink_document_id.as_deref(), Some("doc-9"));
        }

        #[test]
        fn test_commit_synced_keeps_document_id_when_none_returned() {
            let mut rec = record("A", "a.txt", "fp1");
            rec.commit_synced(Some("doc-9".to_string()));
            rec.rearm(
                RemotePath::new("a.txt").unwrap(),
                Fingerprint::new("fp2").unwrap(),
                43,
            );
            rec.commit_synced(None);
            assert_eq!(rec.sink_document_id.as_deref(), Some("doc-9"));
        }

        #[test]
        fn test_commit_failed_preserves_baseline() {
            let mut rec = record("A", "a.txt", "fp1");
            rec.commit_synced(None);

            rec.rearm(
                RemotePath::new("a.txt").unwrap(),
                Fingerprint::new("fp2").unwrap(),
                50,
            );
            rec.commit_failed("sink rejected: too large");

            assert_eq!(rec.status, SyncStatus::Failed);
            assert_eq!(
                rec.last_synced_fingerprint,
                Some(Fingerprint::new("fp1").unwrap())
            );
            assert_eq!(rec.last_error.as_deref(), Some("sink rejected: too large"));
        }

        #[test]
        fn test_rearm_clears_error_and_refreshes_observation() {
            let mut rec = record("A", "a.txt", "fp1");
            rec.commit_failed("boom");

            rec.rearm(
                RemotePath::new("moved/a.txt").unwrap(),
                Fingerprint::new("fp2").unwrap(),
                99,
            );

            assert_eq!(rec.status, SyncStatus::Pending);
            assert!(rec.last_error.is_none());
            assert_eq!(rec.path.as_str(), "moved/a.txt");
            assert_eq!(rec.fingerprint.as_str(), "fp2");
            assert_eq!(rec.size_bytes, 99);
        }

        #[test]
        fn test_tombstone() {
            let mut rec = record("A", "a.txt", "fp1");
            rec.commit_deleted();
            assert!(rec.is_tombstone());
            assert!(!rec.status.is_live());
        }

        #[test]
        fn test_serde_round_trip() {
            let mut rec = record("A", "docs/a.txt", "fp1");
            rec.commit_synced(Some("doc-1".to_string()));

            let json = serde_json::to_string(&rec).unwrap();
            let back: FileRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(back, rec);
        }
    }
}

//! Snapshot and ChangeSet - the ephemeral per-cycle shapes
//!
//! A [`Snapshot`] is one cycle's point-in-time view of the remote tree,
//! rebuilt from the provider every cycle and never persisted. A
//! [`ChangeSet`] is the diff of a snapshot against the store listing:
//! three disjoint sequences (added / modified / removed) in deterministic
//! order. Both are plain data; the diff itself lives in `drivesink-sync`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::newtypes::{Fingerprint, RemoteId, RemotePath};
use super::record::FileRecord;

// ============================================================================
// Snapshot
// ============================================================================

/// One file as seen in a remote listing, already normalized at the
/// provider boundary so nothing downstream depends on provider-specific
/// representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Stable remote identifier
    pub remote_id: RemoteId,
    /// Path inside the watched folder
    pub path: RemotePath,
    /// Change-detection fingerprint (checksum if available, else the
    /// remote modification timestamp)
    pub fingerprint: Fingerprint,
    /// Size in bytes as reported by the remote
    pub size_bytes: u64,
}

/// Point-in-time mapping of the remote tree, keyed by remote id
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<RemoteId, SnapshotEntry>,
}

impl Snapshot {
    /// Builds a snapshot from listed entries. If the provider reports the
    /// same id twice (it should not), the last entry wins.
    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.remote_id.clone(), e))
            .collect();
        Self { entries }
    }

    /// Looks up an entry by remote id
    pub fn get(&self, id: &RemoteId) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    /// Returns true if the snapshot contains the given id
    pub fn contains(&self, id: &RemoteId) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterates over all entries (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.values()
    }

    /// Number of files in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// Result of diffing one snapshot against the store listing
///
/// The three sequences are disjoint by construction and each is ordered
/// by ascending path depth, then lexicographically by path, so logs and
/// processing order are deterministic and human-traceable.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files present remotely with no live store record
    pub added: Vec<SnapshotEntry>,
    /// Files whose fingerprint moved past the sync baseline, plus
    /// pending/failed leftovers that must be re-driven
    pub modified: Vec<SnapshotEntry>,
    /// Live store records absent from the snapshot
    pub removed: Vec<FileRecord>,
}

impl ChangeSet {
    /// Returns true if the cycle has nothing to do
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Total number of entries across all three sequences
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

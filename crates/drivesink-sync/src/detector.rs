//! Change detector - pure snapshot-vs-store diff
//!
//! [`diff`] computes which files are added, modified, or removed by
//! comparing one cycle's [`Snapshot`] against the metadata store listing.
//! It performs no I/O and never fails: malformed inputs cannot occur past
//! the domain constructors, so every input has a well-defined answer.
//!
//! ## Classification rules
//!
//! For each snapshot entry:
//! - no store record, or a tombstone record → `added` (tombstoned files
//!   that reappear remotely are re-creations)
//! - `pending` record that never synced → `added` again (a crashed cycle
//!   left it behind; the pipeline is idempotent)
//! - `pending` with a sync baseline, or `failed` → `modified` (always
//!   retried until it succeeds or disappears remotely)
//! - `synced` with a fingerprint past the baseline → `modified`
//! - otherwise unchanged, omitted
//!
//! Store records that are live (`pending`/`synced`/`failed`) and absent
//! from the snapshot → `removed`.
//!
//! ## Ordering
//!
//! Each sequence is sorted by ascending path depth, then lexicographically
//! by path, so processing order and logs are deterministic and
//! human-traceable regardless of provider listing order.

use std::collections::HashMap;

use drivesink_core::domain::{ChangeSet, FileRecord, RemoteId, Snapshot, SnapshotEntry, SyncStatus};

/// Computes the change set for one cycle.
///
/// Pure function of its inputs; the caller owns all store mutations.
pub fn diff(snapshot: &Snapshot, records: &[FileRecord]) -> ChangeSet {
    let by_id: HashMap<&RemoteId, &FileRecord> =
        records.iter().map(|r| (&r.remote_id, r)).collect();

    let mut changes = ChangeSet::default();

    for entry in snapshot.iter() {
        match by_id.get(&entry.remote_id) {
            None => changes.added.push(entry.clone()),
            Some(record) => match classify(entry, record) {
                Classification::Added => changes.added.push(entry.clone()),
                Classification::Modified => changes.modified.push(entry.clone()),
                Classification::Unchanged => {}
            },
        }
    }

    for record in records {
        if record.status.is_live() && !snapshot.contains(&record.remote_id) {
            changes.removed.push(record.clone());
        }
    }

    changes
        .added
        .sort_by(|a, b| (a.path.depth(), &a.path).cmp(&(b.path.depth(), &b.path)));
    changes
        .modified
        .sort_by(|a, b| (a.path.depth(), &a.path).cmp(&(b.path.depth(), &b.path)));
    changes
        .removed
        .sort_by(|a, b| (a.path.depth(), &a.path).cmp(&(b.path.depth(), &b.path)));

    changes
}

enum Classification {
    Added,
    Modified,
    Unchanged,
}

fn classify(entry: &SnapshotEntry, record: &FileRecord) -> Classification {
    match record.status {
        // A reappearing tombstone is a re-creation
        SyncStatus::Deleted => Classification::Added,
        // Crashed-cycle leftover with no delivery baseline
        SyncStatus::Pending if record.never_synced() => Classification::Added,
        SyncStatus::Pending | SyncStatus::Failed => Classification::Modified,
        SyncStatus::Synced => {
            if record.last_synced_fingerprint.as_ref() != Some(&entry.fingerprint) {
                Classification::Modified
            } else {
                Classification::Unchanged
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivesink_core::domain::{Fingerprint, RemotePath};

    fn entry(id: &str, path: &str, fp: &str) -> SnapshotEntry {
        SnapshotEntry {
            remote_id: RemoteId::new(id).unwrap(),
            path: RemotePath::new(path).unwrap(),
            fingerprint: Fingerprint::new(fp).unwrap(),
            size_bytes: 1,
        }
    }

    fn record(id: &str, path: &str, fp: &str) -> FileRecord {
        FileRecord::observed(
            RemoteId::new(id).unwrap(),
            RemotePath::new(path).unwrap(),
            Fingerprint::new(fp).unwrap(),
            1,
        )
    }

    fn synced_record(id: &str, path: &str, fp: &str) -> FileRecord {
        let mut rec = record(id, path, fp);
        rec.commit_synced(None);
        rec
    }

    fn snapshot(entries: Vec<SnapshotEntry>) -> Snapshot {
        Snapshot::from_entries(entries)
    }

    #[test]
    fn test_empty_inputs_produce_empty_changeset() {
        let changes = diff(&snapshot(vec![]), &[]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_unknown_file_is_added() {
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp1")]), &[]);
        assert_eq!(changes.added.len(), 1);
        assert!(changes.modified.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn test_synced_unchanged_is_omitted() {
        let records = vec![synced_record("A", "a.txt", "fp1")];
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp1")]), &records);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_synced_with_new_fingerprint_is_modified() {
        let records = vec![synced_record("A", "a.txt", "fp1")];
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp2")]), &records);
        assert_eq!(changes.modified.len(), 1);
        assert!(changes.added.is_empty());
    }

    #[test]
    fn test_pending_without_baseline_is_added_again() {
        // Leftover from a crashed cycle: observed but never delivered
        let records = vec![record("A", "a.txt", "fp1")];
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp1")]), &records);
        assert_eq!(changes.added.len(), 1);
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn test_pending_with_baseline_is_modified() {
        let mut rec = synced_record("A", "a.txt", "fp1");
        rec.rearm(
            RemotePath::new("a.txt").unwrap(),
            Fingerprint::new("fp2").unwrap(),
            1,
        );
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp2")]), &[rec]);
        assert_eq!(changes.modified.len(), 1);
    }

    #[test]
    fn test_failed_is_always_modified_even_when_fingerprint_unchanged() {
        let mut rec = record("A", "a.txt", "fp1");
        rec.commit_failed("sink 503");
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp1")]), &[rec]);
        assert_eq!(changes.modified.len(), 1);
    }

    #[test]
    fn test_missing_live_record_is_removed() {
        let records = vec![
            synced_record("A", "a.txt", "fp1"),
            record("B", "b.txt", "fp1"),
        ];
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp1")]), &records);
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].remote_id.as_str(), "B");
    }

    #[test]
    fn test_tombstone_absent_from_snapshot_is_not_removed() {
        let mut rec = record("A", "a.txt", "fp1");
        rec.commit_deleted();
        let changes = diff(&snapshot(vec![]), &[rec]);
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn test_tombstone_present_in_snapshot_is_added() {
        let mut rec = record("A", "a.txt", "fp1");
        rec.commit_deleted();
        let changes = diff(&snapshot(vec![entry("A", "a.txt", "fp9")]), &[rec]);
        assert_eq!(changes.added.len(), 1);
    }

    #[test]
    fn test_ordering_depth_first_then_lexicographic() {
        let changes = diff(
            &snapshot(vec![
                entry("D", "deep/nested/d.txt", "fp"),
                entry("C", "b/c.txt", "fp"),
                entry("B", "z.txt", "fp"),
                entry("A", "a.txt", "fp"),
            ]),
            &[],
        );

        let order: Vec<&str> = changes.added.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["a.txt", "z.txt", "b/c.txt", "deep/nested/d.txt"]);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        // Snapshot: A (unchanged), B (modified), C (new).
        // Store:    A, B, D (live, removed), E (tombstone, ignored).
        let records = vec![
            synced_record("A", "a.txt", "fp1"),
            synced_record("B", "b.txt", "fp1"),
            synced_record("D", "d.txt", "fp1"),
            {
                let mut e = record("E", "e.txt", "fp1");
                e.commit_deleted();
                e
            },
        ];
        let snap = snapshot(vec![
            entry("A", "a.txt", "fp1"),
            entry("B", "b.txt", "fp2"),
            entry("C", "c.txt", "fp1"),
        ]);

        let changes = diff(&snap, &records);

        let added: Vec<&str> = changes.added.iter().map(|e| e.remote_id.as_str()).collect();
        let modified: Vec<&str> = changes
            .modified
            .iter()
            .map(|e| e.remote_id.as_str())
            .collect();
        let removed: Vec<&str> = changes
            .removed
            .iter()
            .map(|r| r.remote_id.as_str())
            .collect();

        assert_eq!(added, vec!["C"]);
        assert_eq!(modified, vec!["B"]);
        assert_eq!(removed, vec!["D"]);

        // No id appears in more than one sequence
        for id in &added {
            assert!(!modified.contains(id) && !removed.contains(id));
        }
        for id in &modified {
            assert!(!removed.contains(id));
        }
    }
}

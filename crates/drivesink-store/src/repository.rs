//! SQLite implementation of IMetadataStore
//!
//! Handles all SQL construction and the mapping between database rows and
//! domain types.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                |
//! |-------------------|----------|-----------------------------------------|
//! | RemoteId          | TEXT     | `.as_str()` / `RemoteId::new()`         |
//! | RemotePath        | TEXT     | `.as_str()` / `RemotePath::new()`       |
//! | Fingerprint       | TEXT     | `.as_str()` / `Fingerprint::new()`      |
//! | SyncStatus        | TEXT     | `as_str()` / `FromStr`                  |
//! | DateTime<Utc>     | TEXT     | RFC 3339 via `to_rfc3339()` / parse     |
//!
//! Durability: every mutation runs as its own implicit SQLite transaction
//! and has committed by the time the call returns. SQLite's single-writer
//! model serializes writers to the same row; WAL mode keeps readers from
//! blocking behind them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use drivesink_core::domain::{Fingerprint, FileRecord, RemoteId, RemotePath, SyncStatus};
use drivesink_core::ports::{HistoryAction, HistoryEntry, IMetadataStore, StoreError};

/// SQLite-based implementation of the metadata store port
///
/// All operations go through a connection pool; reads and writes are
/// individually atomic and durable on return.
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn query_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// Parse a DateTime<Utc> from its stored RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("Failed to parse datetime '{}': {}", s, e)))
}

/// Reconstruct a FileRecord from a database row
fn record_from_row(row: &SqliteRow) -> Result<FileRecord, StoreError> {
    let remote_id: String = row.get("remote_id");
    let path: String = row.get("path");
    let fingerprint: String = row.get("fingerprint");
    let size_bytes: i64 = row.get("size_bytes");
    let last_synced: Option<String> = row.get("last_synced_fingerprint");
    let status: String = row.get("status");
    let last_error: Option<String> = row.get("last_error");
    let sink_document_id: Option<String> = row.get("sink_document_id");
    let updated_at: String = row.get("updated_at");

    let corrupt = |field: &str, e: String| {
        StoreError::Corrupt(format!("Invalid {} in row '{}': {}", field, remote_id, e))
    };

    Ok(FileRecord {
        remote_id: RemoteId::new(remote_id.clone())
            .map_err(|e| corrupt("remote_id", e.to_string()))?,
        path: RemotePath::new(path).map_err(|e| corrupt("path", e.to_string()))?,
        fingerprint: Fingerprint::new(fingerprint)
            .map_err(|e| corrupt("fingerprint", e.to_string()))?,
        size_bytes: size_bytes.max(0) as u64,
        last_synced_fingerprint: last_synced
            .filter(|s| !s.is_empty())
            .map(Fingerprint::new)
            .transpose()
            .map_err(|e| corrupt("last_synced_fingerprint", e.to_string()))?,
        status: status
            .parse::<SyncStatus>()
            .map_err(|e| corrupt("status", e.to_string()))?,
        last_error,
        sink_document_id,
        updated_at: parse_datetime(&updated_at)?,
    })
}

/// Reconstruct a HistoryEntry from a database row
fn history_from_row(row: &SqliteRow) -> Result<HistoryEntry, StoreError> {
    let id: i64 = row.get("id");
    let remote_id: String = row.get("remote_id");
    let action: String = row.get("action");
    let timestamp: String = row.get("timestamp");
    let details: Option<String> = row.get("details");

    Ok(HistoryEntry {
        id,
        remote_id: RemoteId::new(remote_id)
            .map_err(|e| StoreError::Corrupt(format!("Invalid history remote_id: {}", e)))?,
        action,
        timestamp: parse_datetime(&timestamp)?,
        details,
    })
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn get(&self, remote_id: &RemoteId) -> Result<Option<FileRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM files WHERE remote_id = ?")
            .bind(remote_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;

        match row {
            Some(ref r) => Ok(Some(record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError> {
        // A single SELECT is a point-in-time read under SQLite's snapshot
        // isolation, which gives the detector a consistent baseline.
        let rows = sqlx::query("SELECT * FROM files ORDER BY remote_id")
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }

    async fn upsert(&self, record: &FileRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO files \
             (remote_id, path, fingerprint, size_bytes, last_synced_fingerprint, \
              status, last_error, sink_document_id, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(remote_id) DO UPDATE SET \
               path = excluded.path, \
               fingerprint = excluded.fingerprint, \
               size_bytes = excluded.size_bytes, \
               last_synced_fingerprint = excluded.last_synced_fingerprint, \
               status = excluded.status, \
               last_error = excluded.last_error, \
               sink_document_id = excluded.sink_document_id, \
               updated_at = excluded.updated_at",
        )
        .bind(record.remote_id.as_str())
        .bind(record.path.as_str())
        .bind(record.fingerprint.as_str())
        .bind(record.size_bytes as i64)
        .bind(record.last_synced_fingerprint.as_ref().map(|f| f.as_str()))
        .bind(record.status.as_str())
        .bind(record.last_error.as_deref())
        .bind(record.sink_document_id.as_deref())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(query_err)?;

        tracing::trace!(remote_id = %record.remote_id, status = %record.status, "Upserted file record");
        Ok(())
    }

    async fn mark_synced(
        &self,
        remote_id: &RemoteId,
        fingerprint: &Fingerprint,
        document_id: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE files SET \
               status = 'synced', \
               fingerprint = ?, \
               last_synced_fingerprint = ?, \
               sink_document_id = COALESCE(?, sink_document_id), \
               last_error = NULL, \
               updated_at = ? \
             WHERE remote_id = ?",
        )
        .bind(fingerprint.as_str())
        .bind(fingerprint.as_str())
        .bind(document_id)
        .bind(Utc::now().to_rfc3339())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_err)?;

        tracing::trace!(remote_id = %remote_id, fingerprint = %fingerprint, "Marked synced");
        Ok(())
    }

    async fn mark_failed(&self, remote_id: &RemoteId, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE files SET status = 'failed', last_error = ?, updated_at = ? \
             WHERE remote_id = ?",
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_err)?;

        tracing::trace!(remote_id = %remote_id, error, "Marked failed");
        Ok(())
    }

    async fn mark_deleted(&self, remote_id: &RemoteId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE files SET status = 'deleted', last_error = NULL, updated_at = ? \
             WHERE remote_id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_err)?;

        tracing::trace!(remote_id = %remote_id, "Tombstoned record");
        Ok(())
    }

    async fn delete(&self, remote_id: &RemoteId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM files WHERE remote_id = ?")
            .bind(remote_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(query_err)?;

        tracing::trace!(remote_id = %remote_id, "Deleted record");
        Ok(())
    }

    async fn count_by_status(&self) -> Result<HashMap<String, u64>, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) as count FROM files GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            counts.insert(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn append_history(
        &self,
        remote_id: &RemoteId,
        action: HistoryAction,
        details: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_history (remote_id, action, timestamp, details) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(remote_id.as_str())
        .bind(action.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sync_history ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(history_from_row(row)?);
        }
        Ok(entries)
    }
}

//! Ingestion sink port (driven/secondary port)
//!
//! Interface to the downstream document-ingestion API. The primary
//! implementation targets a Dify-style dataset API (`drivesink-ingest`).
//!
//! ## Design Notes
//!
//! - `submit` returns a [`SubmitReceipt`] carrying the downstream
//!   document handle; the orchestrator persists it on the file record so
//!   deletions and re-uploads can reference the right document later.
//! - As with the provider port, transience is a property of the typed
//!   error, consulted by the retry policy.

use thiserror::Error;

use crate::domain::newtypes::{Fingerprint, RemoteId, RemotePath};

// ============================================================================
// SinkError
// ============================================================================

/// Errors surfaced by ingestion sink implementations
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink throttled the request (transient)
    #[error("Ingestion sink rate limited")]
    RateLimited,

    /// The sink rejected this document (permanent - unsupported type,
    /// payload too large, malformed metadata)
    #[error("Ingestion sink rejected document: {0}")]
    Rejected(String),

    /// Network failure or 5xx-class server error (transient)
    #[error("Ingestion sink unavailable: {0}")]
    Unavailable(String),

    /// Authentication failure (permanent)
    #[error("Ingestion sink auth error: {0}")]
    Auth(String),

    /// The referenced document does not exist downstream. The purge flow
    /// treats this as an acknowledged deletion.
    #[error("Document not found in sink")]
    NotFound,
}

impl SinkError {
    /// Returns true if the error is worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::RateLimited | SinkError::Unavailable(_))
    }
}

// ============================================================================
// Submit request/receipt DTOs
// ============================================================================

/// One document submission: the downloaded bytes plus the source
/// identifiers the sink stores as document metadata.
#[derive(Debug)]
pub struct SubmitRequest<'a> {
    /// Stable id of the source file
    pub remote_id: &'a RemoteId,
    /// Path inside the watched folder (also supplies the document name)
    pub path: &'a RemotePath,
    /// Fingerprint of the submitted content
    pub fingerprint: &'a Fingerprint,
    /// Size in bytes as reported by the remote listing
    pub size_bytes: u64,
    /// The file content
    pub bytes: &'a [u8],
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Downstream document handle, when the sink reports one
    pub document_id: Option<String>,
}

// ============================================================================
// IIngestionSink trait
// ============================================================================

/// Port trait for the downstream ingestion API
#[async_trait::async_trait]
pub trait IIngestionSink: Send + Sync {
    /// Submits a file's bytes and metadata as one document
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitReceipt, SinkError>;

    /// Removes a previously submitted document by its downstream handle
    async fn remove(&self, document_id: &str) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transience_classification() {
        assert!(SinkError::RateLimited.is_transient());
        assert!(SinkError::Unavailable("502".into()).is_transient());
        assert!(!SinkError::Rejected("unsupported type".into()).is_transient());
        assert!(!SinkError::Auth("bad key".into()).is_transient());
        assert!(!SinkError::NotFound.is_transient());
    }
}

//! Remote tree provider port (driven/secondary port)
//!
//! Interface to the watched remote folder tree: recursive listing and
//! content download. The primary implementation targets a Google
//! Drive-style REST API (`drivesink-drive`), but nothing in the core
//! depends on that.
//!
//! ## Design Notes
//!
//! - Implementations normalize their wire format into [`SnapshotEntry`]
//!   at this boundary, so the change detector never sees provider-specific
//!   shapes.
//! - Errors carry their own transience: the retry policy consults
//!   [`ProviderError::is_transient`] instead of sniffing error strings.

use std::time::Duration;

use thiserror::Error;

use crate::domain::newtypes::RemoteId;
use crate::domain::snapshot::SnapshotEntry;

// ============================================================================
// ProviderError
// ============================================================================

/// Errors surfaced by remote tree provider implementations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout, or 5xx-class server error (transient)
    #[error("Remote provider unavailable: {0}")]
    Unavailable(String),

    /// The provider throttled the request (transient). Carries the
    /// server-suggested delay when one was given.
    #[error("Remote provider rate limited")]
    RateLimited {
        /// Parsed `Retry-After` value, if the server sent one
        retry_after: Option<Duration>,
    },

    /// Authentication or permission failure (permanent - retrying with
    /// the same credentials cannot succeed)
    #[error("Remote provider auth error: {0}")]
    Auth(String),

    /// The requested item does not exist remotely (permanent)
    #[error("Remote item not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    /// Returns true if the error is worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_) | ProviderError::RateLimited { .. }
        )
    }
}

// ============================================================================
// IRemoteTreeProvider trait
// ============================================================================

/// Port trait for the watched remote folder tree
///
/// The watched root is part of the adapter's construction; one provider
/// instance watches one tree.
#[async_trait::async_trait]
pub trait IRemoteTreeProvider: Send + Sync {
    /// Lists every file under the watched root, recursively, normalized
    /// into snapshot entries. Folders are traversed but never returned.
    ///
    /// A failure here aborts the whole cycle: an incomplete listing must
    /// never be diffed (it would be indistinguishable from mass deletion).
    async fn list_recursive(&self) -> Result<Vec<SnapshotEntry>, ProviderError>;

    /// Downloads the content of a single file
    async fn fetch_content(&self, remote_id: &RemoteId) -> Result<Vec<u8>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transience_classification() {
        assert!(ProviderError::Unavailable("connect refused".into()).is_transient());
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(!ProviderError::Auth("bad token".into()).is_transient());
        assert!(!ProviderError::NotFound("file-1".into()).is_transient());
    }
}

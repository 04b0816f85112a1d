//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers and values the sync core
//! passes around. Each newtype validates at construction time so the rest
//! of the code never re-checks.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RemoteId
// ============================================================================

/// Stable identifier assigned by the remote tree provider
///
/// This is the primary key of the metadata store: the remote provider
/// guarantees it stays constant across renames and moves, so it is the
/// only safe notion of file identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a RemoteId, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId(id));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RemotePath
// ============================================================================

/// Slash-separated path of a file inside the watched remote folder
///
/// Used for display, logging, and deterministic ordering only - never for
/// identity (that is [`RemoteId`]'s job). The path is stored without a
/// leading slash; the root-level file `report.pdf` has depth 1 and the
/// nested `projects/q3/report.pdf` has depth 3.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemotePath(String);

impl RemotePath {
    /// Creates a RemotePath from a slash-separated string
    ///
    /// Leading/trailing slashes are trimmed. Empty paths and paths with
    /// empty segments (`a//b`) are rejected.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let raw = path.into();
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(DomainError::InvalidRemotePath(raw));
        }
        if trimmed.split('/').any(|seg| seg.is_empty()) {
            return Err(DomainError::InvalidRemotePath(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds a path from folder segments plus a file name
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, DomainError> {
        let joined = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    /// Returns the path as a string slice (no leading slash)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments (a root-level file has depth 1)
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// The final segment (the file name)
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Appends a child segment, for building paths while walking folders
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}/{}", self.0, segment))
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Change-detection value for a remote file
///
/// Either the remote-reported modification timestamp or a content checksum
/// when the provider supplies one. Compared for equality only - the sync
/// core never interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Creates a Fingerprint, rejecting empty values
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidFingerprint(value));
        }
        Ok(Self(value))
    }

    /// Returns the fingerprint as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

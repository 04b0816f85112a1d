//! Domain model for the differential-sync core

pub mod errors;
pub mod newtypes;
pub mod record;
pub mod snapshot;

pub use errors::DomainError;
pub use newtypes::{Fingerprint, RemoteId, RemotePath};
pub use record::{FileRecord, SyncStatus};
pub use snapshot::{ChangeSet, Snapshot, SnapshotEntry};

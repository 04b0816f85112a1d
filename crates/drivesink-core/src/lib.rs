//! drivesink core - domain model and ports
//!
//! This crate holds everything the sync engine reasons about, with no I/O:
//!
//! - The domain model: [`domain::FileRecord`] (the durable per-file ledger
//!   row), [`domain::Snapshot`] (one cycle's view of the remote tree), and
//!   [`domain::ChangeSet`] (the added/modified/removed partition).
//! - The ports: [`ports::IMetadataStore`] (durable state),
//!   [`ports::IRemoteTreeProvider`] (remote listing + download), and
//!   [`ports::IIngestionSink`] (downstream document API).
//! - The typed error taxonomy that decides what is retried and what fails
//!   an item immediately.
//! - Configuration loading ([`config::Config`]).
//!
//! Adapters live in sibling crates (`drivesink-store`, `drivesink-drive`,
//! `drivesink-ingest`); the engine in `drivesink-sync` depends only on the
//! traits defined here.

pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{ChangeSet, FileRecord, Snapshot, SnapshotEntry, SyncStatus};

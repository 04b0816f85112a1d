//! drivesink store - durable metadata persistence
//!
//! SQLite-backed implementation of the `IMetadataStore` port: one row per
//! remote file ever observed, plus the append-only sync-history ledger.
//!
//! ## Architecture
//!
//! This crate is a driven (secondary) adapter. It owns the schema and all
//! SQL; the engine only ever sees domain types through the port trait.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - connection pool with WAL mode and embedded migration
//! - [`SqliteMetadataStore`] - full `IMetadataStore` implementation
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use drivesink_store::{DatabasePool, SqliteMetadataStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/drivesink/state.db")).await?;
//! let store = SqliteMetadataStore::new(pool.pool().clone());
//! // Use store as IMetadataStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteMetadataStore;

//! drivesink sync - the differential-sync engine
//!
//! Three pieces, composed by the binary:
//!
//! - [`detector`]: the pure snapshot-vs-store diff producing a
//!   deterministic [`drivesink_core::ChangeSet`]
//! - [`retry`]: bounded-attempt exponential backoff, driven by the typed
//!   transience of provider/sink errors
//! - [`engine`]: the per-item download → submit → commit pipeline with
//!   bounded concurrency and per-item failure containment
//! - [`poller`]: the fixed idle-interval scheduling loop with cooperative
//!   shutdown
//!
//! ## Cycle Flow
//!
//! ```text
//! Poller ──► SyncEngine::run_cycle
//!               │ list_recursive (abort cycle on failure)
//!               │ store.list_all (abort cycle on failure)
//!               │ detector::diff
//!               ├─► added/modified: pipeline per item, parallelism-bounded
//!               │     upsert pending → fetch → submit → mark_synced
//!               │     (retry/backoff per step; exhaustion → mark_failed)
//!               └─► removed: unlink (tombstone) or purge (sink delete + row delete)
//! ```

pub mod detector;
pub mod engine;
pub mod poller;
pub mod retry;

pub use engine::{CycleError, CycleOutcome, SyncEngine};
pub use poller::Poller;
pub use retry::RetryPolicy;

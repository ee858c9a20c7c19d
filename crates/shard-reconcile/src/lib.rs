//! # shard-reconcile
//!
//! Partition-by-partition consistency verification between a legacy,
//! time-sharded record store and the store it was migrated into.
//!
//! For every month partition the verifier:
//!
//! - **Counts** rows on both sides and stops early when the totals differ
//! - **Pages** through the source in key order with keyset pagination
//! - **Diffs** each page against the target rows in the same key window,
//!   comparing decimals numerically and status exactly
//!
//! Partitions run concurrently on a bounded worker pool and are reported
//! independently: a failing partition never hides the result of another.
//!
//! ## Example
//!
//! ```rust,no_run
//! use shard_reconcile::{Config, Coordinator, VerificationRequest};
//!
//! #[tokio::main]
//! async fn main() -> shard_reconcile::Result<()> {
//!     let config = Config::load("reconcile.yaml")?.with_auto_tuning();
//!     let coordinator = Coordinator::new(config).await?;
//!     let request = VerificationRequest::from_config(coordinator.config())?;
//!     let summary = coordinator.run(&request).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod verify;

// Re-exports for convenient access
pub use crate::core::{
    CompareField, ComparableRecord, KeyOrder, Partition, RecordKey, RecordStore, TableTemplate,
    TimeRange,
};
pub use compare::{BatchDiff, Comparator, DiffKind, DiffSample, FieldDiff};
pub use config::{Config, ReconcileConfig, StoreConfig, StoreType};
pub use drivers::MemoryStore;
pub use error::{ReconcileError, Result};
pub use fetch::{BatchCursor, BatchFetcher};
pub use orchestrator::{
    Coordinator, HealthCheckResult, RunSummary, VerificationHandle, VerificationRequest,
};
pub use verify::{
    OutcomeKind, PartitionReport, PartitionScope, PartitionVerifier, VerificationOutcome,
    VerifierSettings, VerifyPhase, VerifyProgressUpdate,
};

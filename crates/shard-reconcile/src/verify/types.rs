//! Type definitions for partition verification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compare::DiffSample;
use crate::core::Partition;

/// Fully resolved unit of work: one partition and its physical tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionScope {
    pub partition: Partition,
    pub source_table: String,
    pub target_table: String,
}

/// Verifier state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyPhase {
    Init,
    CountCheck,
    ShortCircuit,
    PagedDiff,
    Done,
}

impl fmt::Display for VerifyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyPhase::Init => write!(f, "init"),
            VerifyPhase::CountCheck => write!(f, "count-check"),
            VerifyPhase::ShortCircuit => write!(f, "short-circuit"),
            VerifyPhase::PagedDiff => write!(f, "paged-diff"),
            VerifyPhase::Done => write!(f, "done"),
        }
    }
}

/// Terminal result for one partition. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Totals disagree; row-level diff intentionally skipped.
    CountMismatch { source_count: i64, target_count: i64 },
    /// Counts agree but rows are missing or differ.
    RowDiff {
        missing_count: u64,
        mismatched_count: u64,
        samples: Vec<DiffSample>,
    },
    /// Every source row has an equal target row.
    Clean { total_rows: u64 },
    /// The partition could not be verified.
    Error { message: String },
}

/// Outcome class, used for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Clean,
    CountMismatch,
    RowDiff,
    Error,
}

impl VerificationOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            VerificationOutcome::Clean { .. } => OutcomeKind::Clean,
            VerificationOutcome::CountMismatch { .. } => OutcomeKind::CountMismatch,
            VerificationOutcome::RowDiff { .. } => OutcomeKind::RowDiff,
            VerificationOutcome::Error { .. } => OutcomeKind::Error,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, VerificationOutcome::Clean { .. })
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Clean { total_rows } => write!(f, "CLEAN ({} rows)", total_rows),
            VerificationOutcome::CountMismatch {
                source_count,
                target_count,
            } => write!(
                f,
                "COUNT MISMATCH (source={}, target={})",
                source_count, target_count
            ),
            VerificationOutcome::RowDiff {
                missing_count,
                mismatched_count,
                samples,
            } => write!(
                f,
                "ROW DIFF (missing={}, mismatched={}, samples={})",
                missing_count,
                mismatched_count,
                samples.len()
            ),
            VerificationOutcome::Error { message } => write!(f, "ERROR ({})", message),
        }
    }
}

/// Per-partition report line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Partition natural key (YYYY-MM).
    pub partition: String,
    pub source_table: String,
    pub target_table: String,
    /// Counts, when the count phase completed.
    pub source_count: Option<i64>,
    pub target_count: Option<i64>,
    /// Source rows fed to the comparator.
    pub rows_compared: u64,
    /// Target rows ignored under the keep-first duplicate policy.
    pub duplicate_target_keys: u64,
    pub outcome: VerificationOutcome,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl PartitionReport {
    /// Report for a partition that never produced a result of its own.
    pub fn failed(scope: &PartitionScope, message: impl Into<String>) -> Self {
        Self {
            partition: scope.partition.id.clone(),
            source_table: scope.source_table.clone(),
            target_table: scope.target_table.clone(),
            source_count: None,
            target_count: None,
            rows_compared: 0,
            duplicate_target_keys: 0,
            outcome: VerificationOutcome::Error {
                message: message.into(),
            },
            duration_ms: 0,
        }
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} -> {}]: {} in {:.2}s",
            self.partition,
            self.source_table,
            self.target_table,
            self.outcome,
            self.duration_ms as f64 / 1000.0
        )
    }
}

/// Progress update for a running partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyProgressUpdate {
    pub partition: String,
    pub phase: VerifyPhase,
    pub rows_processed: u64,
    pub missing: u64,
    pub mismatched: u64,
}

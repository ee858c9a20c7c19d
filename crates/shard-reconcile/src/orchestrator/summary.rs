//! Aggregate result of a verification run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::verify::{OutcomeKind, PartitionReport};

/// Result of a verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// SHA-256 of the configuration the run used.
    pub config_hash: String,

    /// When the run was accepted.
    pub started_at: DateTime<Utc>,

    /// When the last partition finished.
    pub completed_at: DateTime<Utc>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    pub partitions_total: usize,
    pub clean: usize,
    pub count_mismatch: usize,
    pub row_diff: usize,
    pub errors: usize,

    /// One report per partition, sorted by partition.
    pub reports: Vec<PartitionReport>,
}

impl RunSummary {
    pub fn from_reports(
        run_id: String,
        config_hash: String,
        started_at: DateTime<Utc>,
        mut reports: Vec<PartitionReport>,
    ) -> Self {
        reports.sort_by(|a, b| {
            a.partition
                .cmp(&b.partition)
                .then_with(|| a.source_table.cmp(&b.source_table))
        });

        let completed_at = Utc::now();
        let mut summary = Self {
            run_id,
            config_hash,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds().max(0) as u64,
            partitions_total: reports.len(),
            clean: 0,
            count_mismatch: 0,
            row_diff: 0,
            errors: 0,
            reports: Vec::new(),
        };
        for report in &reports {
            match report.outcome.kind() {
                OutcomeKind::Clean => summary.clean += 1,
                OutcomeKind::CountMismatch => summary.count_mismatch += 1,
                OutcomeKind::RowDiff => summary.row_diff += 1,
                OutcomeKind::Error => summary.errors += 1,
            }
        }
        summary.reports = reports;
        summary
    }

    /// True when every partition verified clean.
    pub fn all_clean(&self) -> bool {
        self.clean == self.partitions_total
    }

    /// Differences were found (as opposed to partitions that failed to run).
    pub fn has_differences(&self) -> bool {
        self.count_mismatch > 0 || self.row_diff > 0
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} partitions in {:.1}s: {} clean, {} count mismatch, {} row diff, {} error",
            self.partitions_total,
            self.duration_ms as f64 / 1000.0,
            self.clean,
            self.count_mismatch,
            self.row_diff,
            self.errors
        )
    }
}

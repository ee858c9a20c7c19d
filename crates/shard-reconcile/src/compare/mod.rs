//! Batch comparison: set difference plus field-level equality.
//!
//! Pure CPU work with no I/O. The target lookup map is built fresh for every
//! call, so concurrent partitions never share mutable state.

mod equality;

pub use equality::{decimal_eq, status_eq};

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

use crate::core::{CompareField, ComparableRecord, RecordKey};

/// One differing field of a mismatched row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: CompareField,
    pub source: Option<String>,
    pub target: Option<String>,
}

/// Why a source row did not reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffKind {
    /// No target row with the same key.
    Missing,
    /// Target row exists but at least one compared field differs.
    FieldMismatch { fields: Vec<FieldDiff> },
}

/// A sampled difference, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSample {
    pub key: RecordKey,
    #[serde(flatten)]
    pub kind: DiffKind,
}

/// Counters and capped samples for one or more batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDiff {
    pub missing_count: u64,
    pub mismatched_count: u64,
    /// Target rows shadowed by an earlier row with the same key.
    pub duplicate_target_keys: u64,
    pub samples: Vec<DiffSample>,
}

impl BatchDiff {
    pub fn has_differences(&self) -> bool {
        self.missing_count > 0 || self.mismatched_count > 0
    }

    /// Fold another batch's result in, keeping at most `cap` samples.
    pub fn merge(&mut self, other: BatchDiff, cap: usize) {
        self.missing_count += other.missing_count;
        self.mismatched_count += other.mismatched_count;
        self.duplicate_target_keys += other.duplicate_target_keys;
        let room = cap.saturating_sub(self.samples.len());
        self.samples.extend(other.samples.into_iter().take(room));
    }

    fn record(&mut self, sample: DiffSample, cap: usize) {
        match sample.kind {
            DiffKind::Missing => self.missing_count += 1,
            DiffKind::FieldMismatch { .. } => self.mismatched_count += 1,
        }
        if self.samples.len() < cap {
            self.samples.push(sample);
        }
    }
}

/// Compares a source batch against the target rows covering the same key window.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    sample_cap: usize,
}

impl Comparator {
    pub fn new(sample_cap: usize) -> Self {
        Self { sample_cap }
    }

    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    /// Diff one source batch against its target slice.
    ///
    /// Duplicate keys in `target` keep the first occurrence; later duplicates
    /// are counted in `duplicate_target_keys` but never compared.
    pub fn compare_batch(&self, source: &[ComparableRecord], target: &[ComparableRecord]) -> BatchDiff {
        let mut diff = BatchDiff::default();

        let mut by_key: HashMap<&RecordKey, &ComparableRecord> = HashMap::with_capacity(target.len());
        for row in target {
            match by_key.entry(&row.key) {
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
                Entry::Occupied(_) => {
                    debug!("duplicate target key {}, keeping first occurrence", row.key);
                    diff.duplicate_target_keys += 1;
                }
            }
        }

        for row in source {
            let kind = match by_key.get(&row.key) {
                None => DiffKind::Missing,
                Some(target_row) => {
                    let fields = Self::mismatched_fields(row, target_row);
                    if fields.is_empty() {
                        continue;
                    }
                    DiffKind::FieldMismatch { fields }
                }
            };
            diff.record(
                DiffSample {
                    key: row.key.clone(),
                    kind,
                },
                self.sample_cap,
            );
        }

        diff
    }

    /// Fields on which two rows with the same key disagree.
    pub fn mismatched_fields(source: &ComparableRecord, target: &ComparableRecord) -> Vec<FieldDiff> {
        let mut fields = Vec::new();

        for field in CompareField::DECIMALS {
            let (s, t) = (source.decimal(field), target.decimal(field));
            if !decimal_eq(s, t) {
                fields.push(FieldDiff {
                    field,
                    source: s.map(ToString::to_string),
                    target: t.map(ToString::to_string),
                });
            }
        }

        if !status_eq(source.status.as_deref(), target.status.as_deref()) {
            fields.push(FieldDiff {
                field: CompareField::Status,
                source: source.status.clone(),
                target: target.status.clone(),
            });
        }

        fields
    }
}

//! Two-phase verification of a single partition.
//!
//! - **CountCheck**: compare aggregate row counts. A mismatch ends the
//!   partition immediately; a row diff is not actionable until the count gap is
//!   explained.
//! - **PagedDiff**: walk the source in keyset pages, fetch the target rows for
//!   each page's key window, and compare.
//!
//! Every failure inside a partition is converted into an
//! [`VerificationOutcome::Error`] at the verifier boundary, so one bad partition
//! never aborts its siblings.

pub mod types;

pub use types::{
    OutcomeKind, PartitionReport, PartitionScope, VerificationOutcome, VerifyPhase,
    VerifyProgressUpdate,
};

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::compare::{BatchDiff, Comparator};
use crate::core::identifier::validate_identifier;
use crate::error::{ReconcileError, Result};
use crate::fetch::{BatchCursor, BatchFetcher};

/// Tunables for a verifier.
#[derive(Debug, Clone, Copy)]
pub struct VerifierSettings {
    /// Source rows per keyset page.
    pub batch_size: usize,
    /// Maximum samples kept per partition.
    pub sample_cap: usize,
    /// Rows between progress log lines.
    pub progress_interval: u64,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            sample_cap: 100,
            progress_interval: 100_000,
        }
    }
}

/// Mutable state of one verifier invocation. Never leaves the task.
#[derive(Default)]
struct RunState {
    source_count: Option<i64>,
    target_count: Option<i64>,
    rows_compared: u64,
    duplicate_source_keys: u64,
    diff: BatchDiff,
}

/// Verifies one partition at a time. Cheap to clone; holds no per-run state.
#[derive(Clone)]
pub struct PartitionVerifier {
    fetcher: BatchFetcher,
    comparator: Comparator,
    settings: VerifierSettings,
    progress_tx: Option<mpsc::Sender<VerifyProgressUpdate>>,
    cancel: Option<CancellationToken>,
}

impl PartitionVerifier {
    pub fn new(fetcher: BatchFetcher, settings: VerifierSettings) -> Self {
        Self {
            fetcher,
            comparator: Comparator::new(settings.sample_cap),
            settings,
            progress_tx: None,
            cancel: None,
        }
    }

    /// Set progress channel for updates.
    pub fn with_progress(mut self, tx: mpsc::Sender<VerifyProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Stop between pages once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Verify one partition. Never fails: errors become the report's outcome.
    pub async fn verify(&self, scope: &PartitionScope) -> PartitionReport {
        let start = Instant::now();
        let mut state = RunState::default();

        let outcome = match self.run_phases(scope, &mut state).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "{}: verification failed ({} -> {}): {}",
                    scope.partition, scope.source_table, scope.target_table, e
                );
                VerificationOutcome::Error {
                    message: e.to_string(),
                }
            }
        };

        PartitionReport {
            partition: scope.partition.id.clone(),
            source_table: scope.source_table.clone(),
            target_table: scope.target_table.clone(),
            source_count: state.source_count,
            target_count: state.target_count,
            rows_compared: state.rows_compared,
            duplicate_target_keys: state.diff.duplicate_target_keys,
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run_phases(
        &self,
        scope: &PartitionScope,
        state: &mut RunState,
    ) -> Result<VerificationOutcome> {
        let partition = &scope.partition.id;
        let range = &scope.partition.range;

        // Init
        self.enter(scope, VerifyPhase::Init, state).await;
        validate_identifier(&scope.source_table)?;
        validate_identifier(&scope.target_table)?;
        self.check_cancelled()?;

        // CountCheck
        self.enter(scope, VerifyPhase::CountCheck, state).await;
        let (source_count, target_count) = self
            .fetcher
            .counts(&scope.source_table, &scope.target_table, range)
            .await?;
        state.source_count = Some(source_count);
        state.target_count = Some(target_count);

        if source_count != target_count {
            self.enter(scope, VerifyPhase::ShortCircuit, state).await;
            warn!(
                "{}: count mismatch {}={} vs {}={}, skipping row diff",
                partition, scope.source_table, source_count, scope.target_table, target_count
            );
            return Ok(VerificationOutcome::CountMismatch {
                source_count,
                target_count,
            });
        }
        info!(
            "{}: counts match ({} rows), starting paged diff",
            partition, source_count
        );

        // PagedDiff
        self.enter(scope, VerifyPhase::PagedDiff, state).await;
        let mut cursor = BatchCursor::new(self.settings.batch_size);
        let interval = self.settings.progress_interval.max(1);
        let mut next_progress = interval;

        loop {
            self.check_cancelled()?;

            let source_batch = self
                .fetcher
                .fetch_source_batch(&scope.source_table, range, &cursor)
                .await?;
            let (low, high) = match (source_batch.first(), source_batch.last()) {
                (Some(first), Some(last)) => (first.key.clone(), last.key.clone()),
                _ => break,
            };

            let target_batch = self
                .fetcher
                .fetch_target_batch_in_scope(&scope.target_table, range, &low, &high)
                .await?;

            let diff = self.comparator.compare_batch(&source_batch, &target_batch);
            if diff.has_differences() {
                debug!(
                    "{}: batch {}..={} has {} missing, {} mismatched",
                    partition, low, high, diff.missing_count, diff.mismatched_count
                );
            }
            state.diff.merge(diff, self.comparator.sample_cap());
            state.rows_compared += source_batch.len() as u64;
            state.duplicate_source_keys += source_batch
                .windows(2)
                .filter(|pair| pair[0].key == pair[1].key)
                .count() as u64;

            cursor.advance(&scope.source_table, &source_batch)?;

            if state.rows_compared >= next_progress {
                info!(
                    "{}: {}/{} rows compared ({} missing, {} mismatched)",
                    partition,
                    state.rows_compared,
                    source_count,
                    state.diff.missing_count,
                    state.diff.mismatched_count
                );
                self.send_progress(scope, VerifyPhase::PagedDiff, state).await;
                while next_progress <= state.rows_compared {
                    next_progress += interval;
                }
            }
        }

        // Every counted row compared exactly once, each key seen once
        if state.duplicate_source_keys > 0 || state.rows_compared != source_count as u64 {
            return Err(ReconcileError::query(
                &scope.source_table,
                format!(
                    "keyset scan compared {} of {} counted rows ({} duplicate keys within pages); \
                     (entity_code, event_time) must be unique",
                    state.rows_compared, source_count, state.duplicate_source_keys
                ),
            ));
        }

        // Done
        self.enter(scope, VerifyPhase::Done, state).await;
        let diff = &state.diff;
        if diff.has_differences() {
            Ok(VerificationOutcome::RowDiff {
                missing_count: diff.missing_count,
                mismatched_count: diff.mismatched_count,
                samples: diff.samples.clone(),
            })
        } else {
            Ok(VerificationOutcome::Clean {
                total_rows: state.rows_compared,
            })
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ReconcileError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn enter(&self, scope: &PartitionScope, phase: VerifyPhase, state: &RunState) {
        debug!("{}: entering {}", scope.partition, phase);
        self.send_progress(scope, phase, state).await;
    }

    /// Send progress update if channel is configured.
    async fn send_progress(&self, scope: &PartitionScope, phase: VerifyPhase, state: &RunState) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx
                .send(VerifyProgressUpdate {
                    partition: scope.partition.id.clone(),
                    phase,
                    rows_processed: state.rows_compared,
                    missing: state.diff.missing_count,
                    mismatched: state.diff.mismatched_count,
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::DiffKind;
    use crate::core::{CompareField, ComparableRecord, Partition};
    use crate::drivers::memory::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn rec(code: &str, day: u32, close: &str) -> ComparableRecord {
        ComparableRecord::new(
            code,
            NaiveDate::from_ymd_opt(2023, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
        .with_decimal(CompareField::ClosePrice, Decimal::from_str(close).unwrap())
    }

    fn scope() -> PartitionScope {
        PartitionScope {
            partition: Partition::month(2023, 1).unwrap(),
            source_table: "kline_2023".into(),
            target_table: "kline_202301".into(),
        }
    }

    fn verifier(
        source: MemoryStore,
        target: MemoryStore,
        batch_size: usize,
        sample_cap: usize,
    ) -> (PartitionVerifier, Arc<MemoryStore>, Arc<MemoryStore>) {
        let source = Arc::new(source);
        let target = Arc::new(target);
        let fetcher = BatchFetcher::new(source.clone(), target.clone());
        let verifier = PartitionVerifier::new(
            fetcher,
            VerifierSettings {
                batch_size,
                sample_cap,
                progress_interval: 2,
            },
        );
        (verifier, source, target)
    }

    #[tokio::test]
    async fn test_count_mismatch_short_circuits() {
        let source = MemoryStore::new().with_table(
            "kline_2023",
            vec![rec("A", 1, "10.00"), rec("A", 2, "10.00"), rec("B", 1, "10.00")],
        );
        let target = MemoryStore::new()
            .with_table("kline_202301", vec![rec("A", 1, "10.0"), rec("A", 2, "10.0")]);
        let (verifier, source, target) = verifier(source, target, 2, 100);

        let report = verifier.verify(&scope()).await;

        assert_eq!(
            report.outcome,
            VerificationOutcome::CountMismatch {
                source_count: 3,
                target_count: 2
            }
        );
        assert_eq!(source.calls().fetch_ordered_after, 0);
        assert_eq!(source.calls().fetch_in_key_range, 0);
        assert_eq!(target.calls().fetch_ordered_after, 0);
        assert_eq!(target.calls().fetch_in_key_range, 0);
        assert_eq!(report.rows_compared, 0);
    }

    #[tokio::test]
    async fn test_field_mismatch_reported_as_row_diff() {
        let source = MemoryStore::new()
            .with_table("kline_2023", vec![rec("A", 1, "10.00"), rec("A", 2, "10.00")]);
        let target = MemoryStore::new()
            .with_table("kline_202301", vec![rec("A", 1, "10.0"), rec("A", 2, "9.99")]);
        let (verifier, _, _) = verifier(source, target, 10, 100);

        let report = verifier.verify(&scope()).await;

        match &report.outcome {
            VerificationOutcome::RowDiff {
                missing_count,
                mismatched_count,
                samples,
            } => {
                assert_eq!(*missing_count, 0);
                assert_eq!(*mismatched_count, 1);
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].key, rec("A", 2, "0").key);
                assert!(matches!(samples[0].kind, DiffKind::FieldMismatch { .. }));
            }
            other => panic!("expected RowDiff, got {:?}", other),
        }
        assert_eq!(report.source_count, Some(2));
        assert_eq!(report.target_count, Some(2));
    }

    #[tokio::test]
    async fn test_clean_partition_across_pages() {
        let rows: Vec<_> = (1..=7).map(|d| rec("A", d, "1.5")).collect();
        let target_rows: Vec<_> = (1..=7).map(|d| rec("A", d, "1.5000")).collect();
        let source = MemoryStore::new().with_table("kline_2023", rows);
        let target = MemoryStore::new().with_table("kline_202301", target_rows);
        let (verifier, source, target) = verifier(source, target, 3, 100);

        let report = verifier.verify(&scope()).await;

        assert_eq!(report.outcome, VerificationOutcome::Clean { total_rows: 7 });
        // 3 + 3 + 1 rows, then the empty terminating page
        assert_eq!(source.calls().fetch_ordered_after, 4);
        assert_eq!(target.calls().fetch_in_key_range, 3);
    }

    #[tokio::test]
    async fn test_missing_row_with_equal_counts() {
        // Same count, but the target has B where the source has A
        let source = MemoryStore::new()
            .with_table("kline_2023", vec![rec("A", 1, "1"), rec("A", 2, "1")]);
        let target = MemoryStore::new()
            .with_table("kline_202301", vec![rec("A", 1, "1"), rec("B", 2, "1")]);
        let (verifier, _, _) = verifier(source, target, 10, 100);

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::RowDiff {
                missing_count,
                mismatched_count,
                ..
            } => {
                assert_eq!(missing_count, 1);
                assert_eq!(mismatched_count, 0);
            }
            other => panic!("expected RowDiff, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sample_cap_never_exceeded() {
        let rows: Vec<_> = (1..=28).map(|d| rec("A", d, "1")).collect();
        let target_rows: Vec<_> = (1..=28).map(|d| rec("A", d, "2")).collect();
        let source = MemoryStore::new().with_table("kline_2023", rows);
        let target = MemoryStore::new().with_table("kline_202301", target_rows);
        let (verifier, _, _) = verifier(source, target, 4, 5);

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::RowDiff {
                mismatched_count,
                samples,
                ..
            } => {
                assert_eq!(mismatched_count, 28);
                assert_eq!(samples.len(), 5);
            }
            other => panic!("expected RowDiff, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_error_becomes_error_outcome() {
        let source = MemoryStore::new()
            .with_table("kline_2023", vec![rec("A", 1, "1")])
            .with_failure("kline_2023", "connection reset");
        let target = MemoryStore::new().with_table("kline_202301", vec![rec("A", 1, "1")]);
        let (verifier, _, _) = verifier(source, target, 10, 100);

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::Error { message } => {
                assert!(message.contains("kline_2023"));
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rows_outside_partition_window_ignored() {
        let february = ComparableRecord::new(
            "A",
            NaiveDate::from_ymd_opt(2023, 2, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let source = MemoryStore::new()
            .with_table("kline_2023", vec![rec("A", 1, "1"), february]);
        let target = MemoryStore::new().with_table("kline_202301", vec![rec("A", 1, "1")]);
        let (verifier, _, _) = verifier(source, target, 10, 100);

        let report = verifier.verify(&scope()).await;
        assert_eq!(report.outcome, VerificationOutcome::Clean { total_rows: 1 });
    }

    #[tokio::test]
    async fn test_idempotent_outcome() {
        let source = MemoryStore::new().with_table(
            "kline_2023",
            (1..=9).map(|d| rec("A", d, "3")).collect(),
        );
        let target = MemoryStore::new().with_table(
            "kline_202301",
            (1..=9).map(|d| rec("A", d, if d == 4 { "4" } else { "3.0" })).collect(),
        );
        let (verifier, _, _) = verifier(source, target, 2, 100);

        let first = verifier.verify(&scope()).await;
        let second = verifier.verify(&scope()).await;
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.rows_compared, second.rows_compared);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_partition() {
        let source = MemoryStore::new().with_table("kline_2023", vec![rec("A", 1, "1")]);
        let target = MemoryStore::new().with_table("kline_202301", vec![rec("A", 1, "1")]);
        let (verifier, source, _) = verifier(source, target, 10, 100);
        let token = CancellationToken::new();
        token.cancel();

        let report = verifier.with_cancellation(token).verify(&scope()).await;

        assert_eq!(report.outcome.kind(), OutcomeKind::Error);
        assert_eq!(source.calls().count, 0);
    }

    #[tokio::test]
    async fn test_progress_updates_sent() {
        let source = MemoryStore::new()
            .with_table("kline_2023", (1..=4).map(|d| rec("A", d, "1")).collect());
        let target = MemoryStore::new()
            .with_table("kline_202301", (1..=4).map(|d| rec("A", d, "1")).collect());
        let (verifier, _, _) = verifier(source, target, 2, 100);
        let (tx, mut rx) = mpsc::channel(64);

        let report = verifier.with_progress(tx).verify(&scope()).await;
        assert!(report.outcome.is_clean());

        let mut phases = Vec::new();
        while let Ok(update) = rx.try_recv() {
            phases.push(update.phase);
        }
        assert_eq!(phases.first(), Some(&VerifyPhase::Init));
        assert_eq!(phases.last(), Some(&VerifyPhase::Done));
        // Two interval updates during the paged diff, plus the phase entry
        let paged = phases.iter().filter(|p| **p == VerifyPhase::PagedDiff).count();
        assert_eq!(paged, 3);
    }

    /// Store that always serves the first page, whatever the cursor says.
    struct IgnoresCursor(MemoryStore);

    #[async_trait::async_trait]
    impl crate::core::RecordStore for IgnoresCursor {
        async fn count(&self, table: &str, range: &crate::core::TimeRange) -> Result<i64> {
            self.0.count(table, range).await
        }

        async fn fetch_ordered_after(
            &self,
            table: &str,
            range: &crate::core::TimeRange,
            _after: Option<&crate::core::RecordKey>,
            limit: usize,
        ) -> Result<Vec<ComparableRecord>> {
            self.0.fetch_ordered_after(table, range, None, limit).await
        }

        async fn fetch_in_key_range(
            &self,
            table: &str,
            range: &crate::core::TimeRange,
            low: &crate::core::RecordKey,
            high: &crate::core::RecordKey,
        ) -> Result<Vec<ComparableRecord>> {
            self.0.fetch_in_key_range(table, range, low, high).await
        }

        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }

        fn db_type(&self) -> &str {
            "stalled"
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_stalled_scan_becomes_error() {
        let rows: Vec<_> = (1..=4).map(|d| rec("A", d, "1")).collect();
        let source = IgnoresCursor(MemoryStore::new().with_table("kline_2023", rows.clone()));
        let target = MemoryStore::new().with_table("kline_202301", rows);
        let fetcher = BatchFetcher::new(Arc::new(source), Arc::new(target));
        let verifier = PartitionVerifier::new(
            fetcher,
            VerifierSettings {
                batch_size: 2,
                ..Default::default()
            },
        );

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::Error { message } => {
                assert!(message.contains("did not advance"), "{}", message)
            }
            other => panic!("expected Error, got {:?}", other),
        }
        assert_eq!(report.rows_compared, 4);
    }

    #[tokio::test]
    async fn test_duplicate_source_key_across_pages_is_error() {
        // The cursor steps past the second (A, 1), so only 2 of 3 rows are seen
        let source = MemoryStore::new().with_table(
            "kline_2023",
            vec![rec("A", 1, "1"), rec("A", 1, "1"), rec("A", 2, "1")],
        );
        let target = MemoryStore::new().with_table(
            "kline_202301",
            vec![rec("A", 1, "1"), rec("A", 2, "1"), rec("C", 3, "7")],
        );
        let (verifier, _, _) = verifier(source, target, 1, 100);

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::Error { message } => {
                assert!(message.contains("compared 2 of 3"), "{}", message);
                assert!(message.contains("kline_2023"), "{}", message);
            }
            other => panic!("expected Error, got {:?}", other),
        }
        assert_eq!(report.rows_compared, 2);
    }

    #[tokio::test]
    async fn test_duplicate_source_key_within_page_is_error() {
        let source = MemoryStore::new()
            .with_table("kline_2023", vec![rec("A", 1, "1"), rec("A", 1, "1")]);
        let target = MemoryStore::new()
            .with_table("kline_202301", vec![rec("A", 1, "1"), rec("B", 1, "1")]);
        let (verifier, _, _) = verifier(source, target, 10, 100);

        let report = verifier.verify(&scope()).await;

        match report.outcome {
            VerificationOutcome::Error { message } => {
                assert!(message.contains("1 duplicate keys"), "{}", message)
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    mod pagination {
        use super::*;
        use crate::core::{RecordKey, RecordStore, TimeRange};
        use proptest::prelude::*;
        use std::collections::BTreeSet;
        use std::sync::Mutex;

        /// Remembers every source key served by keyset pages, in order.
        struct Recording {
            inner: MemoryStore,
            served: Mutex<Vec<RecordKey>>,
        }

        impl Recording {
            fn new(inner: MemoryStore) -> Self {
                Self {
                    inner,
                    served: Mutex::new(Vec::new()),
                }
            }

            fn served(&self) -> Vec<RecordKey> {
                self.served.lock().unwrap().clone()
            }
        }

        #[async_trait::async_trait]
        impl RecordStore for Recording {
            async fn count(&self, table: &str, range: &TimeRange) -> Result<i64> {
                self.inner.count(table, range).await
            }

            async fn fetch_ordered_after(
                &self,
                table: &str,
                range: &TimeRange,
                after: Option<&RecordKey>,
                limit: usize,
            ) -> Result<Vec<ComparableRecord>> {
                let page = self.inner.fetch_ordered_after(table, range, after, limit).await?;
                self.served
                    .lock()
                    .unwrap()
                    .extend(page.iter().map(|r| r.key.clone()));
                Ok(page)
            }

            async fn fetch_in_key_range(
                &self,
                table: &str,
                range: &TimeRange,
                low: &RecordKey,
                high: &RecordKey,
            ) -> Result<Vec<ComparableRecord>> {
                self.inner.fetch_in_key_range(table, range, low, high).await
            }

            async fn test_connection(&self) -> Result<()> {
                Ok(())
            }

            fn db_type(&self) -> &str {
                "recording"
            }

            async fn close(&self) {}
        }

        fn runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
        }

        proptest! {
            #[test]
            fn every_row_compared_exactly_once(
                keys in proptest::collection::btree_set(("[A-D]{1,2}", 1u32..=28), 0..60),
                batch_size in 1usize..12,
            ) {
                let keys: BTreeSet<(String, u32)> = keys;
                let rows: Vec<_> = keys.iter().map(|(c, d)| rec(c, *d, "1")).collect();
                let expected: Vec<RecordKey> = rows.iter().map(|r| r.key.clone()).collect();
                let source = Arc::new(Recording::new(
                    MemoryStore::new().with_table("kline_2023", rows.clone()),
                ));
                let target = MemoryStore::new().with_table("kline_202301", rows);
                let fetcher = BatchFetcher::new(source.clone(), Arc::new(target));
                let verifier = PartitionVerifier::new(
                    fetcher,
                    VerifierSettings { batch_size, sample_cap: 100, progress_interval: 2 },
                );

                let report = runtime().block_on(verifier.verify(&scope()));

                prop_assert_eq!(
                    report.outcome,
                    VerificationOutcome::Clean { total_rows: keys.len() as u64 }
                );
                prop_assert_eq!(report.rows_compared, keys.len() as u64);
                prop_assert_eq!(source.served(), expected);
            }

            #[test]
            fn mismatch_found_regardless_of_page_size(
                days in proptest::collection::btree_set(1u32..=28, 1..28),
                pick in any::<prop::sample::Index>(),
                batch_size in 1usize..8,
            ) {
                let days: Vec<u32> = days.into_iter().collect();
                let bad = days[pick.index(days.len())];
                let source = MemoryStore::new()
                    .with_table("kline_2023", days.iter().map(|d| rec("A", *d, "1")).collect());
                let target = MemoryStore::new().with_table(
                    "kline_202301",
                    days.iter().map(|d| rec("A", *d, if *d == bad { "2" } else { "1" })).collect(),
                );
                let (verifier, _, _) = verifier(source, target, batch_size, 100);

                let report = runtime().block_on(verifier.verify(&scope()));

                match report.outcome {
                    VerificationOutcome::RowDiff { missing_count, mismatched_count, samples } => {
                        prop_assert_eq!(missing_count, 0);
                        prop_assert_eq!(mismatched_count, 1);
                        prop_assert_eq!(&samples[0].key, &rec("A", bad, "1").key);
                    }
                    other => prop_assert!(false, "expected RowDiff, got {:?}", other),
                }
            }
        }
    }
}

//! In-process record store.
//!
//! Rows are held sorted by key, so the keyset semantics match the SQL drivers.
//! Each call is counted and tables can be made to fail on demand, which is
//! what the engine tests and dry runs rely on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::core::{ComparableRecord, RecordKey, RecordStore, TimeRange};
use crate::error::{ReconcileError, Result};

/// Snapshot of how often each store operation ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub count: u64,
    pub fetch_ordered_after: u64,
    pub fetch_in_key_range: u64,
}

#[derive(Default)]
struct Counters {
    count: AtomicU64,
    fetch_ordered_after: AtomicU64,
    fetch_in_key_range: AtomicU64,
}

/// Store backed by sorted in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<ComparableRecord>>,
    failures: HashMap<String, String>,
    calls: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table. Rows are stably sorted by key, so duplicate keys
    /// keep their insertion order.
    pub fn insert_table(&mut self, table: impl Into<String>, mut rows: Vec<ComparableRecord>) {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        self.tables.insert(table.into(), rows);
    }

    pub fn with_table(mut self, table: impl Into<String>, rows: Vec<ComparableRecord>) -> Self {
        self.insert_table(table, rows);
        self
    }

    /// Make every operation on `table` fail with `message`.
    pub fn with_failure(mut self, table: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(table.into(), message.into());
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            count: self.calls.count.load(Ordering::Relaxed),
            fetch_ordered_after: self.calls.fetch_ordered_after.load(Ordering::Relaxed),
            fetch_in_key_range: self.calls.fetch_in_key_range.load(Ordering::Relaxed),
        }
    }

    fn rows(&self, table: &str) -> Result<&[ComparableRecord]> {
        if let Some(message) = self.failures.get(table) {
            return Err(ReconcileError::query(table, message));
        }
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| ReconcileError::query(table, format!("relation \"{}\" does not exist", table)))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count(&self, table: &str, range: &TimeRange) -> Result<i64> {
        self.calls.count.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows(table)?;
        Ok(rows.iter().filter(|r| range.contains(&r.key.event_time)).count() as i64)
    }

    async fn fetch_ordered_after(
        &self,
        table: &str,
        range: &TimeRange,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ComparableRecord>> {
        self.calls.fetch_ordered_after.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows(table)?;
        let start = match after {
            Some(key) => rows.partition_point(|r| r.key <= *key),
            None => 0,
        };
        Ok(rows[start..]
            .iter()
            .filter(|r| range.contains(&r.key.event_time))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_in_key_range(
        &self,
        table: &str,
        range: &TimeRange,
        low: &RecordKey,
        high: &RecordKey,
    ) -> Result<Vec<ComparableRecord>> {
        self.calls.fetch_in_key_range.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows(table)?;
        let start = rows.partition_point(|r| r.key < *low);
        let end = rows.partition_point(|r| r.key <= *high);
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(rows[start..end]
            .iter()
            .filter(|r| range.contains(&r.key.event_time))
            .cloned()
            .collect())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(code: &str, month: u32, day: u32) -> ComparableRecord {
        ComparableRecord::new(
            code,
            NaiveDate::from_ymd_opt(2023, month, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn january() -> TimeRange {
        TimeRange::new(rec("", 1, 1).key.event_time, rec("", 2, 1).key.event_time)
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_table(
            "t",
            vec![rec("B", 1, 1), rec("A", 1, 2), rec("A", 2, 1), rec("A", 1, 1), rec("C", 1, 5)],
        )
    }

    #[tokio::test]
    async fn test_count_respects_range() {
        assert_eq!(store().count("t", &january()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_keyset_pages_in_key_order() {
        let store = store();
        let first = store.fetch_ordered_after("t", &january(), None, 2).await.unwrap();
        let codes: Vec<_> = first.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(codes, vec!["(A, 2023-01-01 00:00:00)", "(A, 2023-01-02 00:00:00)"]);

        let next = store
            .fetch_ordered_after("t", &january(), Some(&first[1].key), 10)
            .await
            .unwrap();
        let codes: Vec<_> = next.iter().map(|r| r.key.entity_code.as_str()).collect();
        assert_eq!(codes, vec!["B", "C"]);
        assert_eq!(store.calls().fetch_ordered_after, 2);
    }

    #[tokio::test]
    async fn test_key_range_is_inclusive() {
        let store = store();
        let rows = store
            .fetch_in_key_range("t", &january(), &rec("A", 1, 2).key, &rec("B", 1, 1).key)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let inverted = store
            .fetch_in_key_range("t", &january(), &rec("C", 1, 1).key, &rec("A", 1, 1).key)
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }

    #[tokio::test]
    async fn test_failures_and_unknown_tables() {
        let store = store().with_failure("t", "boom");
        let err = store.count("t", &january()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(store.count("missing", &january()).await.is_err());
        assert_eq!(store.calls().count, 2);
    }
}

//! Bounded, ordered batch reads against the source and target stores.
//!
//! The target read for each step is scoped to the key window of the source
//! batch just fetched, so memory on both sides stays O(batch size) no matter
//! how large the partition is.

mod cursor;

pub use cursor::BatchCursor;

use std::sync::Arc;

use tracing::debug;

use crate::core::{ComparableRecord, RecordKey, RecordStore, TimeRange};
use crate::error::Result;

/// Reads counts and keyset pages from a source/target store pair.
#[derive(Clone)]
pub struct BatchFetcher {
    source: Arc<dyn RecordStore>,
    target: Arc<dyn RecordStore>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn RecordStore>, target: Arc<dyn RecordStore>) -> Self {
        Self { source, target }
    }

    /// Row counts for both sides of a partition, queried concurrently.
    pub async fn counts(
        &self,
        source_table: &str,
        target_table: &str,
        range: &TimeRange,
    ) -> Result<(i64, i64)> {
        let (source_count, target_count) = tokio::join!(
            self.source.count(source_table, range),
            self.target.count(target_table, range)
        );
        Ok((source_count?, target_count?))
    }

    /// Next source page after the cursor. Empty means the partition is done.
    pub async fn fetch_source_batch(
        &self,
        table: &str,
        range: &TimeRange,
        cursor: &BatchCursor,
    ) -> Result<Vec<ComparableRecord>> {
        let batch = self
            .source
            .fetch_ordered_after(table, range, cursor.last_key(), cursor.page_size())
            .await?;
        debug!(
            "{}: fetched {} source rows after {}",
            table,
            batch.len(),
            cursor
                .last_key()
                .map(ToString::to_string)
                .unwrap_or_else(|| "start".to_string())
        );
        Ok(batch)
    }

    /// Target rows within `[low, high]` for the current source window.
    pub async fn fetch_target_batch_in_scope(
        &self,
        table: &str,
        range: &TimeRange,
        low: &RecordKey,
        high: &RecordKey,
    ) -> Result<Vec<ComparableRecord>> {
        let batch = self
            .target
            .fetch_in_key_range(table, range, low, high)
            .await?;
        debug!(
            "{}: fetched {} target rows in {}..={}",
            table,
            batch.len(),
            low,
            high
        );
        Ok(batch)
    }
}

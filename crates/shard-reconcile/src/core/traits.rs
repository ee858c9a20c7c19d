//! Store contract consumed by the reconciliation engine.
//!
//! Both sides of a comparison are read through [`RecordStore`]. The engine
//! needs exactly three access patterns from a relational store: a ranged count,
//! an ordered keyset scan, and a scan bounded by a key window. Drivers are thin
//! adapters over a connection pool and must never write.

use async_trait::async_trait;

use crate::error::Result;

use super::key::{RecordKey, TimeRange};
use super::record::ComparableRecord;

/// Read-only access to a partitioned record table.
///
/// Implementations acquire a pooled connection per call and release it before
/// returning, so callers never hold a connection across a whole partition.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Count rows of `table` whose event time falls in `range`.
    async fn count(&self, table: &str, range: &TimeRange) -> Result<i64>;

    /// Up to `limit` rows of `table` inside `range` with key strictly greater
    /// than `after` (from the first key when `after` is `None`), ordered by
    /// `(entity_code, event_time)`.
    ///
    /// An empty result means the range is exhausted.
    async fn fetch_ordered_after(
        &self,
        table: &str,
        range: &TimeRange,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ComparableRecord>>;

    /// All rows of `table` inside `range` whose key lies in `[low, high]`
    /// inclusive.
    async fn fetch_in_key_range(
        &self,
        table: &str,
        range: &TimeRange,
        low: &RecordKey,
        high: &RecordKey,
    ) -> Result<Vec<ComparableRecord>>;

    /// Round-trip a trivial query.
    async fn test_connection(&self) -> Result<()>;

    /// Driver identifier (e.g. "postgres", "mysql", "memory").
    fn db_type(&self) -> &str;

    /// Close the underlying pool.
    async fn close(&self);
}

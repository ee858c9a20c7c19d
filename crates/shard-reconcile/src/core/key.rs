//! Composite record key and partition time window.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one logical row: `(entity_code, event_time)`.
///
/// Ordering is lexicographic on `entity_code`, then `event_time`. Field order
/// matters here, the derived `Ord` is what keyset pagination relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Instrument / entity code.
    pub entity_code: String,
    /// Event timestamp (no timezone, as stored).
    pub event_time: NaiveDateTime,
}

impl RecordKey {
    /// Create a new key.
    pub fn new(entity_code: impl Into<String>, event_time: NaiveDateTime) -> Self {
        Self {
            entity_code: entity_code.into(),
            event_time,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            self.entity_code,
            self.event_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whether `t` falls inside the window.
    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        *t >= self.start && *t < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// How stores order and compare `entity_code` in keyset statements.
///
/// `Native` uses the column's own collation, so a plain index on
/// `(entity_code, event_time)` serves every page. `Bytewise` orders by byte
/// value, matching [`RecordKey`]'s `Ord`, and keeps key windows aligned when
/// source and target collations differ; it needs an expression index such as
/// `(entity_code COLLATE "C", event_time)` on PostgreSQL to stay index-backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    #[default]
    Native,
    Bytewise,
}

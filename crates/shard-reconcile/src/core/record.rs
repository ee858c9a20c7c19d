//! Row projection used for comparison.
//!
//! Only the fields carried here take part in equality. Every other column of the
//! underlying tables is ignored by the engine.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::key::RecordKey;

/// A comparison field of [`ComparableRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareField {
    OpenPrice,
    HighPrice,
    LowPrice,
    ClosePrice,
    Volume,
    Turnover,
    Status,
}

impl CompareField {
    /// Decimal fields in column order.
    pub const DECIMALS: [CompareField; 6] = [
        CompareField::OpenPrice,
        CompareField::HighPrice,
        CompareField::LowPrice,
        CompareField::ClosePrice,
        CompareField::Volume,
        CompareField::Turnover,
    ];

    /// Column name in the store.
    pub fn column(&self) -> &'static str {
        match self {
            CompareField::OpenPrice => "open_price",
            CompareField::HighPrice => "high_price",
            CompareField::LowPrice => "low_price",
            CompareField::ClosePrice => "close_price",
            CompareField::Volume => "volume",
            CompareField::Turnover => "turnover",
            CompareField::Status => "status",
        }
    }
}

impl fmt::Display for CompareField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A record key plus the fixed set of compared fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableRecord {
    pub key: RecordKey,
    pub open_price: Option<Decimal>,
    pub high_price: Option<Decimal>,
    pub low_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub turnover: Option<Decimal>,
    pub status: Option<String>,
}

impl ComparableRecord {
    /// Create a record with all comparison fields null.
    pub fn new(entity_code: impl Into<String>, event_time: NaiveDateTime) -> Self {
        Self {
            key: RecordKey::new(entity_code, event_time),
            open_price: None,
            high_price: None,
            low_price: None,
            close_price: None,
            volume: None,
            turnover: None,
            status: None,
        }
    }

    /// Set one decimal field.
    #[must_use]
    pub fn with_decimal(mut self, field: CompareField, value: Decimal) -> Self {
        if let Some(slot) = self.decimal_slot(field) {
            *slot = Some(value);
        }
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Value of a decimal field. `None` for [`CompareField::Status`].
    pub fn decimal(&self, field: CompareField) -> Option<&Decimal> {
        match field {
            CompareField::OpenPrice => self.open_price.as_ref(),
            CompareField::HighPrice => self.high_price.as_ref(),
            CompareField::LowPrice => self.low_price.as_ref(),
            CompareField::ClosePrice => self.close_price.as_ref(),
            CompareField::Volume => self.volume.as_ref(),
            CompareField::Turnover => self.turnover.as_ref(),
            CompareField::Status => None,
        }
    }

    fn decimal_slot(&mut self, field: CompareField) -> Option<&mut Option<Decimal>> {
        match field {
            CompareField::OpenPrice => Some(&mut self.open_price),
            CompareField::HighPrice => Some(&mut self.high_price),
            CompareField::LowPrice => Some(&mut self.low_price),
            CompareField::ClosePrice => Some(&mut self.close_price),
            CompareField::Volume => Some(&mut self.volume),
            CompareField::Turnover => Some(&mut self.turnover),
            CompareField::Status => None,
        }
    }
}

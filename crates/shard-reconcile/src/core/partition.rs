//! Month partitions and physical table resolution.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::identifier::validate_identifier;
use super::key::TimeRange;
use crate::error::{ReconcileError, Result};

/// One calendar-month slice of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Natural key, `YYYY-MM`.
    pub id: String,
    pub year: i32,
    pub month: u32,
    /// `[first day of month, first day of next month)`.
    pub range: TimeRange,
}

impl Partition {
    /// Build the partition for one month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let id = format!("{:04}-{:02}", year, month);
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| ReconcileError::Partition(id.clone()))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| ReconcileError::Partition(id.clone()))?;

        Ok(Self {
            id,
            year,
            month,
            range: TimeRange::new(midnight(first), midnight(next)),
        })
    }

    /// Parse a single identifier: `YYYY` expands to twelve months, `YYYY-MM`
    /// selects one month.
    pub fn parse(input: &str) -> Result<Vec<Self>> {
        let input = input.trim();
        let invalid = || ReconcileError::Partition(input.to_string());

        match input.split_once('-') {
            None => {
                let year = parse_year(input).ok_or_else(invalid)?;
                (1..=12).map(|m| Self::month(year, m)).collect()
            }
            Some((y, m)) => {
                let year = parse_year(y).ok_or_else(invalid)?;
                if m.len() != 2 || !m.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let month: u32 = m.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(vec![Self::month(year, month)?])
            }
        }
    }

    /// Expand a list of identifiers into a sorted, de-duplicated partition set.
    pub fn expand<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Self>> {
        let mut by_month = BTreeMap::new();
        for input in inputs {
            for partition in Self::parse(input.as_ref())? {
                by_month.insert((partition.year, partition.month), partition);
            }
        }
        Ok(by_month.into_values().collect())
    }

    /// Compact form used in physical table names, `YYYYMM`.
    pub fn suffix_key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s.parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.year())
}

/// Table name template with `{year}`, `{month}` and `{partition}` placeholders.
///
/// `{month}` renders zero-padded (`03`), `{partition}` renders `YYYYMM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableTemplate(String);

impl TableTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render for a partition. Fails on unknown placeholders or an invalid
    /// resulting identifier.
    pub fn render(&self, partition: &Partition) -> Result<String> {
        let rendered = self
            .0
            .replace("{year}", &format!("{:04}", partition.year))
            .replace("{month}", &format!("{:02}", partition.month))
            .replace("{partition}", &partition.suffix_key());

        if rendered.contains('{') || rendered.contains('}') {
            return Err(ReconcileError::Config(format!(
                "table template '{}' has an unknown placeholder (supported: {{year}}, {{month}}, {{partition}})",
                self.0
            )));
        }
        if !rendered.is_empty() {
            validate_identifier(&rendered)?;
        }
        Ok(rendered)
    }
}

impl fmt::Display for TableTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_expands_to_twelve_months() {
        let parts = Partition::parse("2023").unwrap();
        assert_eq!(parts.len(), 12);
        assert_eq!(parts[0].id, "2023-01");
        assert_eq!(parts[11].id, "2023-12");
    }

    #[test]
    fn test_december_ends_at_next_year() {
        let dec = Partition::month(2023, 12).unwrap();
        assert_eq!(
            dec.range.end,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_single_month_spec() {
        let parts = Partition::parse("2024-02").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].suffix_key(), "202402");
        assert_eq!(
            parts[0].range.end,
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_specs_rejected() {
        for input in ["", "23", "2023-13", "2023-00", "2023-1", "abcd", "2023-05-01"] {
            assert!(Partition::parse(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_expand_dedupes_and_sorts() {
        let parts = Partition::expand(&["2023-03", "2022", "2023-03", "2023-01"]).unwrap();
        let ids: Vec<_> = parts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 14);
        assert_eq!(ids[0], "2022-01");
        assert_eq!(&ids[12..], &["2023-01", "2023-03"]);
    }

    #[test]
    fn test_template_render() {
        let p = Partition::month(2023, 4).unwrap();
        assert_eq!(
            TableTemplate::new("kline_{year}").render(&p).unwrap(),
            "kline_2023"
        );
        assert_eq!(
            TableTemplate::new("kline_{year}_{month}").render(&p).unwrap(),
            "kline_2023_04"
        );
        assert_eq!(
            TableTemplate::new("_{partition}").render(&p).unwrap(),
            "_202304"
        );
        assert_eq!(TableTemplate::new("").render(&p).unwrap(), "");
    }

    #[test]
    fn test_template_unknown_placeholder() {
        let p = Partition::month(2023, 4).unwrap();
        assert!(TableTemplate::new("kline_{day}").render(&p).is_err());
    }
}

//! Keyset SQL for the three read patterns of a record table.
//!
//! Statements order and compare `(entity_code, event_time)` as a row value.
//! With [`KeyOrder::Native`] the column collation is used as is; with
//! [`KeyOrder::Bytewise`] `entity_code` is compared by byte value.
//!
//! Column layout of every row query, by position:
//! `entity_code, event_time, open_price, high_price, low_price, close_price,
//! volume, turnover, status`.

use crate::core::identifier::{qualify_mysql, qualify_pg, quote_mysql, quote_pg};
use crate::core::{CompareField, KeyOrder};
use crate::error::Result;

const ENTITY_CODE: &str = "entity_code";
const EVENT_TIME: &str = "event_time";

/// SQL syntax of a supported store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    Mysql,
}

impl SqlDialect {
    fn quote(&self, name: &str) -> Result<String> {
        match self {
            SqlDialect::Postgres => quote_pg(name),
            SqlDialect::Mysql => quote_mysql(name),
        }
    }

    fn qualify(&self, schema: &str, table: &str) -> Result<String> {
        match self {
            SqlDialect::Postgres => qualify_pg(schema, table),
            SqlDialect::Mysql => qualify_mysql(schema, table),
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    fn param(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", index),
            SqlDialect::Mysql => "?".to_string(),
        }
    }

    fn time_param(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}::timestamp", index),
            SqlDialect::Mysql => "?".to_string(),
        }
    }

    fn code_param(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}::text", index),
            SqlDialect::Mysql => "?".to_string(),
        }
    }

    /// `entity_code` expression used for ordering and key comparison.
    fn key_code(&self, quoted: String, order: KeyOrder) -> String {
        match (order, self) {
            (KeyOrder::Native, _) => quoted,
            (KeyOrder::Bytewise, SqlDialect::Postgres) => format!("{} COLLATE \"C\"", quoted),
            (KeyOrder::Bytewise, SqlDialect::Mysql) => format!("CAST({} AS BINARY)", quoted),
        }
    }

    fn select_list(&self) -> Result<String> {
        let mut cols = Vec::with_capacity(2 + CompareField::DECIMALS.len() + 1);
        let code = self.quote(ENTITY_CODE)?;
        let time = self.quote(EVENT_TIME)?;
        let status = self.quote(CompareField::Status.column())?;

        match self {
            SqlDialect::Postgres => {
                cols.push(format!("{}::text", code));
                cols.push(format!("{}::timestamp", time));
                for field in CompareField::DECIMALS {
                    cols.push(format!("{}::numeric", self.quote(field.column())?));
                }
                cols.push(format!("{}::text", status));
            }
            SqlDialect::Mysql => {
                cols.push(format!("CAST({} AS CHAR)", code));
                cols.push(time);
                for field in CompareField::DECIMALS {
                    cols.push(self.quote(field.column())?);
                }
                cols.push(format!("CAST({} AS CHAR)", status));
            }
        }
        Ok(cols.join(", "))
    }
}

/// Prepared statement text for one physical table.
///
/// Parameters, in bind order:
/// - `count`: range start, range end
/// - `first_page`: range start, range end, limit
/// - `next_page`: range start, range end, after code, after time, limit
/// - `key_range`: range start, range end, low code, low time, high code, high time
#[derive(Debug, Clone)]
pub struct KeysetQueries {
    pub count: String,
    pub first_page: String,
    pub next_page: String,
    pub key_range: String,
}

impl KeysetQueries {
    pub fn build(dialect: SqlDialect, order: KeyOrder, schema: &str, table: &str) -> Result<Self> {
        let d = dialect;
        let qualified = d.qualify(schema, table)?;
        let time = d.quote(EVENT_TIME)?;
        let code = d.key_code(d.quote(ENTITY_CODE)?, order);
        let key = format!("({}, {})", code, time);
        let select = format!("SELECT {} FROM {}", d.select_list()?, qualified);
        let window = format!(
            "{} >= {} AND {} < {}",
            time,
            d.time_param(1),
            time,
            d.time_param(2)
        );
        let order = format!("ORDER BY {}, {}", code, time);

        Ok(Self {
            count: format!("SELECT COUNT(*) FROM {} WHERE {}", qualified, window),
            first_page: format!("{} WHERE {} {} LIMIT {}", select, window, order, d.param(3)),
            next_page: format!(
                "{} WHERE {} AND {} > ({}, {}) {} LIMIT {}",
                select,
                window,
                key,
                d.code_param(3),
                d.time_param(4),
                order,
                d.param(5)
            ),
            key_range: format!(
                "{} WHERE {} AND {} >= ({}, {}) AND {} <= ({}, {}) {}",
                select,
                window,
                key,
                d.code_param(3),
                d.time_param(4),
                key,
                d.code_param(5),
                d.time_param(6),
                order
            ),
        })
    }
}

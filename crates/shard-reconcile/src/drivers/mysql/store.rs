//! MySQL/MariaDB record store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Row, ValueRef};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::core::{CompareField, ComparableRecord, KeyOrder, RecordKey, RecordStore, TimeRange};
use crate::drivers::common::keyset::{KeysetQueries, SqlDialect};
use crate::drivers::common::SslMode;
use crate::error::{ReconcileError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only MySQL store.
pub struct MysqlStore {
    pool: MySqlPool,
    schema: String,
    key_order: KeyOrder,
}

impl MysqlStore {
    pub async fn new(config: &StoreConfig, max_conns: usize, key_order: KeyOrder) -> Result<Self> {
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.get_port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode.to_mysql());

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns as u32)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| ReconcileError::pool(e, "creating MySQL pool"))?;

        let store = Self {
            pool,
            schema: config.get_schema().to_string(),
            key_order,
        };
        store.test_connection().await?;

        info!(
            "Connected to MySQL: {}:{}/{} (pool {})",
            config.host,
            config.get_port(),
            config.database,
            max_conns
        );
        Ok(store)
    }

    fn queries(&self, table: &str) -> Result<KeysetQueries> {
        KeysetQueries::build(SqlDialect::Mysql, self.key_order, &self.schema, table)
    }
}

/// Read a numeric column as a decimal whatever its declared type.
fn decimal_at(table: &str, row: &MySqlRow, idx: usize) -> Result<Option<Decimal>> {
    if column_is_null(table, idx, row.try_get_raw(idx).map(|raw| raw.is_null()))? {
        return Ok(None);
    }
    if let Ok(v) = row.try_get::<Decimal, _>(idx) {
        return Ok(Some(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(Some(Decimal::from(v)));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Ok(Some(Decimal::from(v)));
    }
    row.try_get::<f64, _>(idx)
        .ok()
        .and_then(Decimal::from_f64)
        .map(Some)
        .ok_or_else(|| {
            ReconcileError::query(table, format!("column {} is not numeric", idx))
        })
}

/// A column that cannot be read is a query error, never NULL.
fn column_is_null(
    table: &str,
    idx: usize,
    nullness: std::result::Result<bool, sqlx::Error>,
) -> Result<bool> {
    nullness.map_err(|e| ReconcileError::query(table, format!("column {}: {}", idx, e)))
}

fn decode_row(table: &str, row: &MySqlRow) -> Result<ComparableRecord> {
    let entity_code: String = row.try_get(0).map_err(|e| ReconcileError::query(table, e))?;
    let event_time: NaiveDateTime = row.try_get(1).map_err(|e| ReconcileError::query(table, e))?;
    let mut record = ComparableRecord::new(entity_code, event_time);

    for (i, field) in CompareField::DECIMALS.into_iter().enumerate() {
        if let Some(value) = decimal_at(table, row, i + 2)? {
            record = record.with_decimal(field, value);
        }
    }
    record.status = row
        .try_get::<Option<String>, _>(2 + CompareField::DECIMALS.len())
        .map_err(|e| ReconcileError::query(table, e))?;

    Ok(record)
}

#[async_trait]
impl RecordStore for MysqlStore {
    async fn count(&self, table: &str, range: &TimeRange) -> Result<i64> {
        let sql = self.queries(table)?.count;
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        debug!("{}.{}: {} rows in {}", self.schema, table, count, range);
        Ok(count)
    }

    async fn fetch_ordered_after(
        &self,
        table: &str,
        range: &TimeRange,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ComparableRecord>> {
        let queries = self.queries(table)?;
        let limit = limit as u64;
        let query = match after {
            None => sqlx::query(&queries.first_page)
                .bind(range.start)
                .bind(range.end)
                .bind(limit),
            Some(key) => sqlx::query(&queries.next_page)
                .bind(range.start)
                .bind(range.end)
                .bind(key.entity_code.as_str())
                .bind(key.event_time)
                .bind(limit),
        };
        let rows: Vec<MySqlRow> = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        rows.iter().map(|row| decode_row(table, row)).collect()
    }

    async fn fetch_in_key_range(
        &self,
        table: &str,
        range: &TimeRange,
        low: &RecordKey,
        high: &RecordKey,
    ) -> Result<Vec<ComparableRecord>> {
        let queries = self.queries(table)?;
        let rows: Vec<MySqlRow> = sqlx::query(&queries.key_range)
            .bind(range.start)
            .bind(range.end)
            .bind(low.entity_code.as_str())
            .bind(low.event_time)
            .bind(high.entity_code.as_str())
            .bind(high.event_time)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        rows.iter().map(|row| decode_row(table, row)).collect()
    }

    async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ReconcileError::pool(e, "testing MySQL connection"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

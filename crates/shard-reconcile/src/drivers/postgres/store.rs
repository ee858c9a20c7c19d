//! PostgreSQL record store.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rust_decimal::Decimal;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Config as PgConfig, Row};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::core::{CompareField, ComparableRecord, KeyOrder, RecordKey, RecordStore, TimeRange};
use crate::drivers::common::keyset::{KeysetQueries, SqlDialect};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{ReconcileError, Result};

/// Read-only PostgreSQL store.
pub struct PostgresStore {
    pool: Pool,
    schema: String,
    key_order: KeyOrder,
}

impl PostgresStore {
    /// Build the pool and check that a connection can be made.
    pub async fn new(config: &StoreConfig, max_conns: usize, key_order: KeyOrder) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.get_port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name("shard-reconcile");

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let tls = TlsBuilder::new(SslMode::parse(&config.ssl_mode)?);
        let mgr = match tls.build()? {
            Some(connector) => Manager::from_config(pg_config, connector, mgr_config),
            None => {
                warn!(
                    "PostgreSQL TLS is disabled for {}. Credentials will be transmitted in plaintext.",
                    config.host
                );
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
        };
        let pool = Pool::builder(mgr)
            .max_size(max_conns)
            .build()
            .map_err(|e| ReconcileError::pool(e, "creating PostgreSQL pool"))?;

        let store = Self {
            pool,
            schema: config.get_schema().to_string(),
            key_order,
        };
        store.test_connection().await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{} (schema {}, pool {})",
            config.host,
            config.get_port(),
            config.database,
            store.schema,
            max_conns
        );
        Ok(store)
    }

    async fn client(&self, table: &str) -> Result<Object> {
        self.pool.get().await.map_err(|e| {
            ReconcileError::pool(e, format!("acquiring PostgreSQL connection for {}", table))
        })
    }

    fn queries(&self, table: &str) -> Result<KeysetQueries> {
        KeysetQueries::build(SqlDialect::Postgres, self.key_order, &self.schema, table)
    }

    async fn fetch_rows(
        &self,
        table: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<ComparableRecord>> {
        let client = self.client(table).await?;
        let stmt = client
            .prepare_cached(sql)
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        let rows = client
            .query(&stmt, params)
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        rows.iter().map(|row| decode_row(table, row)).collect()
    }
}

fn decode_row(table: &str, row: &Row) -> Result<ComparableRecord> {
    let entity_code: String = row.try_get(0).map_err(|e| ReconcileError::query(table, e))?;
    let event_time: NaiveDateTime = row.try_get(1).map_err(|e| ReconcileError::query(table, e))?;
    let mut record = ComparableRecord::new(entity_code, event_time);

    for (i, field) in CompareField::DECIMALS.into_iter().enumerate() {
        let value: Option<Decimal> = row
            .try_get(i + 2)
            .map_err(|e| ReconcileError::query(table, format!("{}: {}", field, e)))?;
        if let Some(value) = value {
            record = record.with_decimal(field, value);
        }
    }
    record.status = row
        .try_get(2 + CompareField::DECIMALS.len())
        .map_err(|e| ReconcileError::query(table, e))?;

    Ok(record)
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn count(&self, table: &str, range: &TimeRange) -> Result<i64> {
        let sql = self.queries(table)?.count;
        let client = self.client(table).await?;
        let row = client
            .query_one(&sql, &[&range.start, &range.end])
            .await
            .map_err(|e| ReconcileError::query(table, e))?;
        let count: i64 = row.try_get(0).map_err(|e| ReconcileError::query(table, e))?;
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
        let limit = limit as i64;
        match after {
            None => {
                self.fetch_rows(table, &queries.first_page, &[&range.start, &range.end, &limit])
                    .await
            }
            Some(key) => {
                self.fetch_rows(
                    table,
                    &queries.next_page,
                    &[
                        &range.start,
                        &range.end,
                        &key.entity_code,
                        &key.event_time,
                        &limit,
                    ],
                )
                .await
            }
        }
    }

    async fn fetch_in_key_range(
        &self,
        table: &str,
        range: &TimeRange,
        low: &RecordKey,
        high: &RecordKey,
    ) -> Result<Vec<ComparableRecord>> {
        let queries = self.queries(table)?;
        self.fetch_rows(
            table,
            &queries.key_range,
            &[
                &range.start,
                &range.end,
                &low.entity_code,
                &low.event_time,
                &high.entity_code,
                &high.event_time,
            ],
        )
        .await
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ReconcileError::pool(e, "testing PostgreSQL connection"))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| ReconcileError::pool(e, "testing PostgreSQL connection"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

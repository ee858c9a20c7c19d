//! Store driver implementations.
//!
//! Each driver implements [`RecordStore`] for one kind of database:
//!
//! - [`postgres`]: PostgreSQL via deadpool-postgres
//! - [`mysql`]: MySQL/MariaDB via sqlx
//! - [`memory`]: in-process tables for tests and dry runs
//! - [`common`]: TLS settings and keyset SQL shared by the SQL drivers
//!
//! # Adding New Databases
//!
//! 1. Create a module under `drivers/` with a store type implementing
//!    [`RecordStore`]
//! 2. Add a [`SqlDialect`](common::keyset::SqlDialect) variant if the store
//!    speaks SQL
//! 3. Add a [`StoreType`] variant and wire it into [`connect`]

pub mod common;
pub mod memory;
pub mod mysql;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use memory::MemoryStore;
pub use mysql::MysqlStore;
pub use postgres::PostgresStore;

use std::sync::Arc;

use crate::config::{StoreConfig, StoreType};
use crate::core::{KeyOrder, RecordStore};
use crate::error::Result;

/// Open a pooled store for `config`.
pub async fn connect(
    config: &StoreConfig,
    max_conns: usize,
    key_order: KeyOrder,
) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.r#type {
        StoreType::Postgres => Arc::new(PostgresStore::new(config, max_conns, key_order).await?),
        StoreType::Mysql => Arc::new(MysqlStore::new(config, max_conns, key_order).await?),
    };
    Ok(store)
}

//! PostgreSQL driver.
//!
//! - [`PostgresStore`]: [`RecordStore`](crate::core::RecordStore) over a
//!   deadpool-postgres pool

mod store;

pub use store::PostgresStore;

//! MySQL/MariaDB driver.
//!
//! - [`MysqlStore`]: [`RecordStore`](crate::core::RecordStore) over an sqlx
//!   MySQL pool
//!
//! # Supported Versions
//!
//! Row-value comparisons need MySQL 5.7+ or MariaDB 10.2+.

mod store;

pub use store::MysqlStore;

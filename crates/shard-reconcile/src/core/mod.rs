//! Core value types and the store abstraction.
//!
//! - [`key`]: the ordered composite key and the partition time window
//! - [`record`]: the row projection that takes part in comparison
//! - [`partition`]: month partitions and physical table resolution
//! - [`traits`]: the narrow store contract every driver implements
//! - [`identifier`]: identifier validation and quoting for generated SQL

pub mod identifier;
pub mod key;
pub mod partition;
pub mod record;
pub mod traits;

pub use key::{KeyOrder, RecordKey, TimeRange};
pub use partition::{Partition, TableTemplate};
pub use record::{CompareField, ComparableRecord};
pub use traits::RecordStore;

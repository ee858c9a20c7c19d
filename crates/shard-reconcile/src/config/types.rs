//! Configuration type definitions with auto-tuning based on system resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use sysinfo::System;
use tracing::info;

use crate::core::{KeyOrder, TableTemplate};

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in GB.
    pub total_memory_gb: f64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            total_memory_gb: sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
            cpu_cores: sys.cpus().len(),
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!(
            "System resources: {:.1} GB RAM, {} CPU cores",
            self.total_memory_gb, self.cpu_cores
        );
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy, horizontally partitioned store.
    pub source: StoreConfig,

    /// Migrated store being verified.
    pub target: StoreConfig,

    /// Verification behavior.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that weren't explicitly set in the config file.
    pub fn with_auto_tuning(mut self) -> Self {
        let resources = SystemResources::detect();
        resources.log();
        self.reconcile = self.reconcile.with_auto_tuning(&resources);
        self
    }
}

/// Supported store drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Postgres,
    Mysql,
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreType::Postgres => f.write_str("postgres"),
            StoreType::Mysql => f.write_str("mysql"),
        }
    }
}

/// Connection settings for one store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Driver (default: postgres).
    #[serde(default)]
    pub r#type: StoreType,

    /// Database host.
    pub host: String,

    /// Database port (default: 5432 for postgres, 3306 for mysql).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Schema holding the tables (default: "public" for postgres, the
    /// database name for mysql).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// TLS mode: disable, require, verify-ca, verify-full (default: require).
    #[serde(default = "default_require")]
    pub ssl_mode: String,
}

impl StoreConfig {
    pub fn get_port(&self) -> u16 {
        self.port.unwrap_or(match self.r#type {
            StoreType::Postgres => 5432,
            StoreType::Mysql => 3306,
        })
    }

    pub fn get_schema(&self) -> &str {
        match (&self.schema, self.r#type) {
            (Some(schema), _) => schema.as_str(),
            (None, StoreType::Postgres) => "public",
            (None, StoreType::Mysql) => self.database.as_str(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.get_port())
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.get_schema())
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Verification behavior configuration.
/// Performance-related fields use Option<T> to distinguish between
/// "not set" (use auto-tuned default) and "explicitly set".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Partitions verified concurrently. Auto-tuned from CPU cores if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Source rows per keyset page. Auto-tuned from RAM if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Maximum diff samples kept per partition (default: 100).
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,

    /// Log a progress line every N processed rows (default: 100000).
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Source pool size. Auto-tuned from workers if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_source_connections: Option<usize>,

    /// Target pool size. Auto-tuned from workers if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_target_connections: Option<usize>,

    /// Suffix appended to the target table per partition (default: "_{year}{month}").
    /// Empty when the target is a single unpartitioned table.
    #[serde(default = "default_target_suffix")]
    pub target_partition_suffix: TableTemplate,

    /// Key ordering used by keyset statements on both stores (default: native).
    /// `bytewise` needs a matching expression index to avoid per-page sorts.
    #[serde(default)]
    pub key_order: KeyOrder,

    /// Default source table template, e.g. "kline_{year}".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_template: Option<String>,

    /// Default target table reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,

    /// Default partition identifiers (YYYY or YYYY-MM).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            workers: None,
            batch_size: None,
            sample_cap: default_sample_cap(),
            progress_interval: default_progress_interval(),
            max_source_connections: None,
            max_target_connections: None,
            target_partition_suffix: default_target_suffix(),
            key_order: KeyOrder::default(),
            source_template: None,
            target_table: None,
            partitions: Vec::new(),
        }
    }
}

impl ReconcileConfig {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that are None (not explicitly set).
    pub fn with_auto_tuning(mut self, resources: &SystemResources) -> Self {
        let ram_gb = resources.total_memory_gb;
        let cores = resources.cpu_cores;

        // Partition tasks are I/O bound; half the cores, 2..=16
        let workers = *self
            .workers
            .get_or_insert_with(|| (cores / 2).clamp(2, 16));

        // Batch size: 5K rows, +5K per 8GB of RAM, cap at 50K.
        // Both sides of one batch are resident at once.
        if self.batch_size.is_none() {
            let batch = 5_000 + ((ram_gb / 8.0) as usize * 5_000);
            self.batch_size = Some(batch.clamp(5_000, 50_000));
        }

        // A worker holds at most one connection per store at a time
        if self.max_source_connections.is_none() {
            self.max_source_connections = Some((workers + 2).min(64));
        }
        if self.max_target_connections.is_none() {
            self.max_target_connections = Some((workers + 2).min(64));
        }

        info!(
            "Auto-tuned config: workers={}, batch_size={}, source_conns={}, target_conns={}",
            self.get_workers(),
            self.get_batch_size(),
            self.get_max_source_connections(),
            self.get_max_target_connections(),
        );

        self
    }

    pub fn get_workers(&self) -> usize {
        self.workers.unwrap_or(4)
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(10_000)
    }

    pub fn get_max_source_connections(&self) -> usize {
        self.max_source_connections.unwrap_or(8)
    }

    pub fn get_max_target_connections(&self) -> usize {
        self.max_target_connections.unwrap_or(8)
    }
}

// Default value functions for serde
fn default_require() -> String {
    "require".to_string()
}

fn default_sample_cap() -> usize {
    100
}

fn default_progress_interval() -> u64 {
    100_000
}

fn default_target_suffix() -> TableTemplate {
    TableTemplate::new("_{year}{month}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_tuning_respects_explicit_values() {
        let config = ReconcileConfig {
            workers: Some(3),
            batch_size: Some(1_234),
            ..Default::default()
        };
        let tuned = config.with_auto_tuning(&SystemResources {
            total_memory_gb: 64.0,
            cpu_cores: 32,
        });
        assert_eq!(tuned.get_workers(), 3);
        assert_eq!(tuned.get_batch_size(), 1_234);
        assert_eq!(tuned.get_max_source_connections(), 5);
    }

    #[test]
    fn test_auto_tuning_bounds() {
        let small = ReconcileConfig::default().with_auto_tuning(&SystemResources {
            total_memory_gb: 2.0,
            cpu_cores: 1,
        });
        assert_eq!(small.get_workers(), 2);
        assert_eq!(small.get_batch_size(), 5_000);

        let big = ReconcileConfig::default().with_auto_tuning(&SystemResources {
            total_memory_gb: 512.0,
            cpu_cores: 128,
        });
        assert_eq!(big.get_workers(), 16);
        assert_eq!(big.get_batch_size(), 50_000);
        assert_eq!(big.get_max_target_connections(), 18);
    }

    #[test]
    fn test_store_config_debug_redacts_password() {
        let store = StoreConfig {
            r#type: StoreType::Postgres,
            host: "localhost".into(),
            port: None,
            database: "db".into(),
            user: "u".into(),
            password: "super_secret_password_123".into(),
            schema: None,
            ssl_mode: "disable".into(),
        };
        let debug_output = format!("{:?}", store);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}

//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// SHA256 of the serialized configuration (passwords are never serialized).
    ///
    /// Recorded in every run summary so two reports can be tied to the same
    /// settings.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
source:
  type: mysql
  host: legacy-db
  database: market
  user: reader
  password: s3cret
target:
  host: warehouse
  database: market
  user: verifier
  password: s3cret
  ssl_mode: disable
reconcile:
  workers: 6
  batch_size: 20000
  source_template: "kline_{year}"
  target_table: kline
  partitions: ["2023"]
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.source.r#type, StoreType::Mysql);
        assert_eq!(config.source.get_port(), 3306);
        assert_eq!(config.source.get_schema(), "market");
        assert_eq!(config.target.r#type, StoreType::Postgres);
        assert_eq!(config.target.get_port(), 5432);
        assert_eq!(config.target.get_schema(), "public");
        assert_eq!(config.reconcile.get_workers(), 6);
        assert_eq!(config.reconcile.get_batch_size(), 20_000);
        assert_eq!(config.reconcile.sample_cap, 100);
        assert_eq!(config.reconcile.progress_interval, 100_000);
        assert_eq!(config.reconcile.target_partition_suffix.as_str(), "_{year}{month}");
        assert_eq!(config.reconcile.key_order, crate::core::KeyOrder::Native);
    }

    #[test]
    fn test_bytewise_key_order_is_opt_in() {
        let yaml = YAML.replace("  workers: 6\n", "  workers: 6\n  key_order: bytewise\n");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.reconcile.key_order, crate::core::KeyOrder::Bytewise);

        let bad = YAML.replace("  workers: 6\n", "  workers: 6\n  key_order: sideways\n");
        assert!(Config::from_yaml(&bad).is_err());
    }

    #[test]
    fn test_hash_is_stable_and_ignores_password() {
        let a = Config::from_yaml(YAML).unwrap();
        let mut b = a.clone();
        b.source.password = "different".into();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        b.reconcile.workers = Some(7);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_password_not_serialized() {
        let config = Config::from_yaml(YAML).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("s3cret"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/reconcile.yaml").unwrap_err();
        assert!(matches!(err, crate::error::ReconcileError::Io(_)));
    }
}

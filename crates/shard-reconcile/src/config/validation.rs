//! Configuration validation.

use super::{Config, StoreConfig};
use crate::core::identifier::validate_identifier;
use crate::error::{ReconcileError, Result};

/// Upper bound on a keyset page; larger pages defeat the memory bound.
const MAX_BATCH_SIZE: usize = 1_000_000;

const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_store("source", &config.source)?;
    validate_store("target", &config.target)?;

    let reconcile = &config.reconcile;

    // Only check performance values if explicitly set
    if let Some(0) = reconcile.workers {
        return Err(ReconcileError::Config(
            "reconcile.workers must be at least 1".into(),
        ));
    }
    match reconcile.batch_size {
        Some(0) => {
            return Err(ReconcileError::Config(
                "reconcile.batch_size must be at least 1".into(),
            ))
        }
        Some(n) if n > MAX_BATCH_SIZE => {
            return Err(ReconcileError::Config(format!(
                "reconcile.batch_size must be at most {}, got {}",
                MAX_BATCH_SIZE, n
            )))
        }
        _ => {}
    }
    if reconcile.sample_cap == 0 {
        return Err(ReconcileError::Config(
            "reconcile.sample_cap must be at least 1".into(),
        ));
    }
    if reconcile.progress_interval == 0 {
        return Err(ReconcileError::Config(
            "reconcile.progress_interval must be at least 1".into(),
        ));
    }
    if let Some(0) = reconcile.max_source_connections {
        return Err(ReconcileError::Config(
            "reconcile.max_source_connections must be at least 1".into(),
        ));
    }
    if let Some(0) = reconcile.max_target_connections {
        return Err(ReconcileError::Config(
            "reconcile.max_target_connections must be at least 1".into(),
        ));
    }
    if let Some(table) = &reconcile.target_table {
        validate_identifier(table)?;
    }

    Ok(())
}

fn validate_store(side: &str, store: &StoreConfig) -> Result<()> {
    if store.host.is_empty() {
        return Err(ReconcileError::Config(format!("{}.host is required", side)));
    }
    if store.database.is_empty() {
        return Err(ReconcileError::Config(format!(
            "{}.database is required",
            side
        )));
    }
    if store.user.is_empty() {
        return Err(ReconcileError::Config(format!("{}.user is required", side)));
    }
    if !SSL_MODES.contains(&store.ssl_mode.to_lowercase().as_str()) {
        return Err(ReconcileError::Config(format!(
            "{}.ssl_mode must be one of {}, got '{}'",
            side,
            SSL_MODES.join(", "),
            store.ssl_mode
        )));
    }
    validate_identifier(store.get_schema())?;
    Ok(())
}

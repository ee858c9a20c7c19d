//! Error types for the reconciliation library.

use thiserror::Error;

/// Main error type for reconciliation operations.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Configuration error (invalid YAML, missing fields, bad template, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store unreachable or query malformed.
    #[error("Query failed on {table}: {message}")]
    Query { table: String, message: String },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Partition identifier could not be parsed or expanded.
    #[error("Invalid partition '{0}': expected YYYY or YYYY-MM")]
    Partition(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background verification task ended abnormally.
    #[error("Verification task failed: {0}")]
    Task(String),

    /// Verification was cancelled (SIGINT, etc.)
    #[error("Verification cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Create a Query error for a table.
    pub fn query(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ReconcileError::Query {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        ReconcileError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReconcileError::Config(_)
            | ReconcileError::Partition(_)
            | ReconcileError::Yaml(_) => 2,
            ReconcileError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_message_names_table() {
        let err = ReconcileError::query("kline_2023", "connection refused");
        assert_eq!(
            err.to_string(),
            "Query failed on kline_2023: connection refused"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_errors_use_usage_exit_code() {
        assert_eq!(ReconcileError::Config("x".into()).exit_code(), 2);
        assert_eq!(ReconcileError::Partition("20x3".into()).exit_code(), 2);
        assert_eq!(ReconcileError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.yaml");
        let err = ReconcileError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: missing.yaml"));
    }
}

//! Identifier validation and quoting for generated SQL.
//!
//! Table and schema names come from templates and configuration and cannot be
//! bound as statement parameters, so they are validated and quoted here before
//! being spliced into queries. Key and range values are always bound.

use crate::error::{ReconcileError, Result};

/// Conservative identifier limit (PostgreSQL: 63 bytes, MySQL: 64 chars).
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Reject empty identifiers, null bytes and over-long names.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ReconcileError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(ReconcileError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ReconcileError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier, doubling embedded double quotes.
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier, doubling embedded backticks.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// `"schema"."table"` for PostgreSQL.
pub fn qualify_pg(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_pg(schema)?, quote_pg(table)?))
}

/// `` `schema`.`table` `` for MySQL.
pub fn qualify_mysql(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_mysql(schema)?, quote_mysql(table)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("kline_2023").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad\0name").is_err());
        assert!(validate_identifier(&"x".repeat(64)).is_ok());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_quote_pg_escapes_double_quote() {
        assert_eq!(quote_pg("kline").unwrap(), "\"kline\"");
        assert_eq!(quote_pg("a\"b").unwrap(), "\"a\"\"b\"");
    }

    #[test]
    fn test_quote_mysql_injection_stays_inside_quotes() {
        let quoted = quote_mysql("t`; DROP TABLE x; --").unwrap();
        assert_eq!(quoted, "`t``; DROP TABLE x; --`");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(
            qualify_pg("public", "kline_202301").unwrap(),
            "\"public\".\"kline_202301\""
        );
        assert_eq!(
            qualify_mysql("legacy", "kline_2023").unwrap(),
            "`legacy`.`kline_2023`"
        );
        assert!(qualify_pg("", "t").is_err());
    }
}

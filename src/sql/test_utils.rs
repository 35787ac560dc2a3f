//! Test utilities for SQL emission validation.
//!
//! Provides helpers for validating that emitted SQL is syntactically correct
//! using sqlparser-rs for roundtrip validation.

use sqlparser::dialect::{GenericDialect, MsSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::dialect::{DialectConfig, PagingSyntax};

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// The parser dialect is picked from the config's rendering constants: `@`
/// parameters parse as T-SQL, `:` parameters as SQLite.
///
/// # Example
///
/// ```ignore
/// use crate::sql::test_utils::validate_sql;
/// use crate::sql::dialect::Dialect;
///
/// let sql = "SELECT a0.id FROM users a0 WHERE a0.id = :p0";
/// validate_sql(sql, &Dialect::Sqlite.config()).unwrap();
/// ```
pub fn validate_sql(sql: &str, dialect: &DialectConfig) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> =
        match (dialect.parameter_prefix.as_str(), dialect.paging) {
            ("@", PagingSyntax::OffsetFetch) => Box::new(MsSqlDialect {}),
            (":", _) => Box::new(SQLiteDialect {}),
            _ => Box::new(GenericDialect {}),
        };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {}: {}\nSQL: {}", dialect.name, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql(
            "SELECT a0.id FROM users a0 WHERE a0.id = :p0",
            &Dialect::Sqlite.config(),
        )
        .unwrap();
        validate_sql(
            "SELECT CONCAT(a0.name, @p0) FROM users a0",
            &Dialect::SqlServer.config(),
        )
        .unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", &Dialect::Sqlite.config());
        assert!(result.is_err());
    }
}

//! SQL Server (T-SQL) dialect.
//!
//! - `@name` parameters
//! - No boolean literal in predicates, bits are bound as 1/0
//! - `CONCAT(a, b)` (the `+` operator does not coerce NULLs or numbers)
//! - OFFSET FETCH for pagination (requires ORDER BY)

use super::{BoolEncoding, ConcatSyntax, DialectConfig, IdentQuote, PagingSyntax};

/// Rendering constants for SQL Server.
pub(super) fn config() -> DialectConfig {
    DialectConfig {
        name: "sqlserver".into(),
        parameter_prefix: "@".into(),
        bool_encoding: BoolEncoding::Numeric,
        string_concat: ConcatSyntax::Function("CONCAT".into()),
        paging: PagingSyntax::OffsetFetch,
        identifier_quote: IdentQuote::Bare,
        false_predicate: "1 = 0".into(),
    }
}

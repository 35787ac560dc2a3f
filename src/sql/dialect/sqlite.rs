//! SQLite dialect.

use super::{BoolEncoding, ConcatSyntax, DialectConfig, IdentQuote, PagingSyntax};

/// Rendering constants for SQLite.
pub(super) fn config() -> DialectConfig {
    DialectConfig {
        name: "sqlite".into(),
        parameter_prefix: ":".into(),
        // SQLite has no boolean storage class
        bool_encoding: BoolEncoding::Numeric,
        string_concat: ConcatSyntax::Operator("||".into()),
        paging: PagingSyntax::LimitOffset,
        identifier_quote: IdentQuote::Bare,
        false_predicate: "1 = 0".into(),
    }
}

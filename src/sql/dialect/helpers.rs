//! Shared helper functions for dialect rendering.
//!
//! Reusable building blocks for the settings in [`super::DialectConfig`].

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server, Azure Synapse)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// Boolean Encoding
// =============================================================================

/// Encode a boolean as numeric 1/0.
/// Used by: T-SQL, SQLite, MySQL
pub fn bool_as_int(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit `LIMIT <count> OFFSET <offset>`.
///
/// Both operands are already-rendered parameter references.
pub fn emit_limit_offset_standard(count: &str, offset: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit)
        .space()
        .push(Token::Param(count.into()))
        .space()
        .push(Token::Offset)
        .space()
        .push(Token::Param(offset.into()));
    ts
}

/// Emit `OFFSET <offset> ROWS FETCH NEXT <count> ROWS ONLY` (T-SQL style).
///
/// Requires an ORDER BY clause; the compiler guarantees one.
pub fn emit_offset_fetch(count: &str, offset: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Offset)
        .space()
        .push(Token::Param(offset.into()))
        .space()
        .push(Token::Rows)
        .space()
        .push(Token::Fetch)
        .space()
        .push(Token::Next)
        .space()
        .push(Token::Param(count.into()))
        .space()
        .push(Token::Rows)
        .space()
        .push(Token::Only);
    ts
}

//! SQL dialect definitions.
//!
//! A dialect is a plain value: a small table of rendering constants that the
//! compiler reads while emitting SQL. Adding a dialect means constructing a new
//! [`DialectConfig`] (in code or from a TOML file), never touching the compiler.
//!
//! | Setting | SQL Server | SQLite |
//! |---------|-----------|--------|
//! | Parameter prefix | `@` | `:` |
//! | Boolean literal | `1` / `0` | `1` / `0` |
//! | String concat | `CONCAT(a, b)` | `a \|\| b` |
//! | Paging | `OFFSET m ROWS FETCH NEXT n ROWS ONLY` | `LIMIT n OFFSET m` |
//! | Identifiers | bare | bare |
//!
//! # Usage
//!
//! ```ignore
//! use typeql::dialect::Dialect;
//!
//! let config = Dialect::Sqlite.config();
//! assert_eq!(config.parameter_prefix, ":");
//! ```

pub mod helpers;
mod sqlite;
mod sqlserver;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// How boolean literals are encoded when bound as parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolEncoding {
    /// `1` / `0` (SQL Server, SQLite, MySQL)
    Numeric,
    /// `true` / `false` (PostgreSQL, DuckDB)
    Keyword,
}

/// String concatenation syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatSyntax {
    /// Infix operator: `a || b`
    Operator(String),
    /// Function call: `CONCAT(a, b)`
    Function(String),
}

/// Pagination clause syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingSyntax {
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
    /// `LIMIT n OFFSET m`
    LimitOffset,
}

/// Identifier quoting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentQuote {
    /// Identifiers rendered as declared.
    #[default]
    Bare,
    /// `"name"`
    Double,
    /// `[name]`
    Bracket,
    /// `` `name` ``
    Backtick,
}

/// Per-dialect rendering constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectConfig {
    /// Dialect name for display/logging.
    #[serde(default)]
    pub name: String,

    /// Prefix of generated parameter names (`@`, `:`, `$`).
    pub parameter_prefix: String,

    /// Encoding of boolean literals.
    pub bool_encoding: BoolEncoding,

    /// String concatenation syntax.
    pub string_concat: ConcatSyntax,

    /// Pagination syntax.
    pub paging: PagingSyntax,

    /// Identifier quoting.
    #[serde(default)]
    pub identifier_quote: IdentQuote,

    /// Predicate that is never satisfied (empty IN-list).
    #[serde(default = "default_false_predicate")]
    pub false_predicate: String,
}

fn default_false_predicate() -> String {
    "1 = 0".into()
}

impl DialectConfig {
    /// Quote an identifier (table, column, alias).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self.identifier_quote {
            IdentQuote::Bare => ident.to_string(),
            IdentQuote::Double => helpers::quote_double(ident),
            IdentQuote::Bracket => helpers::quote_bracket(ident),
            IdentQuote::Backtick => helpers::quote_backtick(ident),
        }
    }

    /// The bound value of a boolean literal.
    ///
    /// Numeric dialects bind `1`/`0` so the value compares against bit/integer
    /// columns without conversion.
    pub fn encode_bool(&self, b: bool) -> Value {
        match self.bool_encoding {
            BoolEncoding::Numeric => Value::Int(helpers::bool_as_int(b)),
            BoolEncoding::Keyword => Value::Bool(b),
        }
    }
}

/// Built-in dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    SqlServer,
    Sqlite,
}

impl Dialect {
    /// Get the rendering constants for this dialect.
    pub fn config(&self) -> DialectConfig {
        match self {
            Dialect::SqlServer => sqlserver::config(),
            Dialect::Sqlite => sqlite::config(),
        }
    }

    /// Look up a built-in dialect by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Dialect> {
        match name.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" | "tsql" => Some(Dialect::SqlServer),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

impl From<Dialect> for DialectConfig {
    fn from(dialect: Dialect) -> Self {
        dialect.config()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config().name)
    }
}

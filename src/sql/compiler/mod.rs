//! Tree-to-SQL compiler.
//!
//! - [`expr`] - scalar expressions to token streams
//! - [`query`] - relational steps to statements, derived tables and set operations
//!
//! Both halves thread an immutable [`Context`](super::context::Context): every
//! call takes the context by value and returns the next one alongside its
//! output.

pub mod expr;
pub mod query;
mod statement;

pub use expr::compile_expr;
pub use query::compile_query;

/// Errors that can occur while compiling a tree.
///
/// Compilation is all-or-nothing: on error no SQL is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("Set operation arity mismatch: left has {left} columns, right has {right}")]
    ArityMismatch { left: usize, right: usize },

    #[error("Column {table}.{column} is not in scope")]
    UnboundColumn { table: String, column: String },

    #[error("Table {table} declares no column {column}")]
    UnknownColumn { table: String, column: String },

    #[error("Query used as a scalar must expose one column, found {columns}")]
    NotScalar { columns: usize },

    #[error("Duplicate output field: {0}")]
    DuplicateField(String),
}

pub type CompileResult<T> = Result<T, CompileError>;

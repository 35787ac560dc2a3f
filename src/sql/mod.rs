//! SQL generation module.
//!
//! Typed query trees compiled to parameterized, dialect-specific SQL:
//!
//! - [`value`] - scalar kinds and literal host values
//! - [`expr`] - expression AST (shared, identity-bearing nodes)
//! - [`typed`] - kind-checked `Scalar<T>` facade over the AST
//! - [`query`] - relational query tree, table descriptors, fluent `Query`
//! - [`context`] - immutable compilation state and parameter bindings
//! - [`compiler`] - expression and query compilers
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect configurations

pub mod compiler;
pub mod context;
pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;
pub mod typed;
pub mod value;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use compiler::{CompileError, CompileResult};
pub use context::{Bindings, Context};
pub use dialect::{Dialect, DialectConfig};
pub use expr::{AggregateFunc, Expr, ExprId, ExprRef};
pub use query::{
    JoinKind, ProjectionItem, Query, QueryNode, QueryRef, SetOpKind, SortDir, Table, TableId,
};
pub use token::{Layout, Token, TokenStream};
pub use typed::{column, count_star, Scalar, SqlType};
pub use value::{ScalarKind, Value};

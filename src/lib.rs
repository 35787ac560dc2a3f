//! # typeql
//!
//! Compiles strongly-typed, immutable query trees to parameterized,
//! dialect-specific SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Query tree (QueryNode + Scalar<T> exprs)        │
//! │        (built once, shared through Arc, immutable)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler, Context threaded]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     TokenStream                          │
//! │     (statements, derived tables, set operations)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [DialectConfig + Layout]
//! ┌─────────────────────────────────────────────────────────┐
//! │              SQL text + ordered bindings                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Literal values never appear in the SQL text: every one is bound to a
//! generated parameter name. Table aliases (`a0`, `a1`, ...) and parameter
//! names (`@p0`, `:p0`, ...) are allocated deterministically, so compiling the
//! same tree twice yields byte-identical output.

pub mod compile;
pub mod config;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;
pub use sql::typed;
pub use sql::value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{
        compile, compile_predicate, compile_with, CompileError, CompileOptions, CompileResult,
        CompiledQuery,
    };
    pub use crate::dialect::{Dialect, DialectConfig};
    pub use crate::expr::AggregateFunc;
    pub use crate::query::{
        JoinKind, ProjectionItem, Query, QueryNode, SetOpKind, SortDir, Table,
    };
    pub use crate::sql::context::Bindings;
    pub use crate::token::Layout;
    pub use crate::typed::{
        column, count_star, Bool, DateTime, Decimal, Guid, Int, Scalar, SqlType, Str,
    };
    pub use crate::value::{ScalarKind, Value};
}

// Also export at crate root for convenience
pub use compile::{compile, compile_with, CompileError, CompileOptions, CompiledQuery};
pub use dialect::{Dialect, DialectConfig};
pub use query::{Query, Table};

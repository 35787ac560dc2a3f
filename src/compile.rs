//! End-to-end compilation from a query tree to SQL.
//!
//! ```text
//! Query tree → compile_query (Context threaded) → TokenStream → SQL + bindings
//! ```
//!
//! # Example
//!
//! ```ignore
//! use typeql::prelude::*;
//!
//! let customers = Table::new("customers")
//!     .with_column("Id", ScalarKind::Int)
//!     .with_column("Name", ScalarKind::String)
//!     .with_column("Age", ScalarKind::Int)
//!     .into_ref();
//! let age: Scalar<Int> = column(&customers, "Age");
//! let name: Scalar<Str> = column(&customers, "Name");
//!
//! let query = Query::from(&customers)
//!     .filter(&age.gt(&Scalar::lit(18)))
//!     .select([ProjectionItem::of(&name)]);
//!
//! let compiled = compile(&query, &Dialect::Sqlite.config())?;
//! // compiled.sql      == "SELECT a0.Name FROM customers a0 WHERE a0.Age > :p0"
//! // compiled.bindings == {":p0": 18}
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::sql::compiler::{compile_expr, compile_query};
use crate::sql::context::{Bindings, Context};
use crate::sql::dialect::{Dialect, DialectConfig};
use crate::sql::query::{Query, QueryRef, Table, TableId};
use crate::sql::token::Layout;
use crate::sql::typed::{Bool, Scalar};

pub use crate::sql::compiler::{CompileError, CompileResult};

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: DialectConfig,

    /// Output layout.
    pub layout: Layout,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new(Dialect::default().config())
    }
}

impl CompileOptions {
    pub fn new(dialect: DialectConfig) -> Self {
        Self {
            dialect,
            layout: Layout::default(),
        }
    }

    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: impl Into<DialectConfig>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Set the output layout.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Parameterized SQL, ready for a parameterized-query API.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The generated SQL string.
    pub sql: String,

    /// Parameter name to value, in allocation order.
    pub bindings: Bindings,
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile a query tree for a dialect, in compact layout.
pub fn compile(query: impl AsQueryRef, dialect: &DialectConfig) -> CompileResult<CompiledQuery> {
    compile_with(query, &CompileOptions::new(dialect.clone()))
}

/// Compile a query tree with explicit options.
pub fn compile_with(
    query: impl AsQueryRef,
    options: &CompileOptions,
) -> CompileResult<CompiledQuery> {
    let node = query.as_query_ref();
    debug!(
        dialect = %options.dialect.name,
        root = node.name(),
        depth = node.depth(),
        "compiling query"
    );

    let (tokens, ctx) = compile_query(node, Context::new(options.dialect.clone()))?;
    let sql = tokens.serialize(&options.dialect, options.layout);
    let bindings = ctx.into_bindings();

    debug!(sql_len = sql.len(), parameters = bindings.len(), "compiled query");
    Ok(CompiledQuery { sql, bindings })
}

/// Compile a standalone predicate, e.g. the condition of an UPDATE or DELETE
/// built outside this crate.
///
/// `sources` binds each table instance the predicate references to an alias.
pub fn compile_predicate(
    predicate: &Scalar<Bool>,
    dialect: &DialectConfig,
    sources: &[(&Arc<Table>, &str)],
) -> CompileResult<CompiledQuery> {
    let ctx = sources
        .iter()
        .fold(Context::new(dialect.clone()), |ctx, (table, alias)| {
            ctx.bind_source(TableId::of(table), alias)
        });
    let (tokens, ctx) = compile_expr(predicate.node(), ctx)?;
    let sql = tokens.serialize(dialect, Layout::Compact);
    debug!(sql_len = sql.len(), "compiled predicate");
    Ok(CompiledQuery {
        sql,
        bindings: ctx.into_bindings(),
    })
}

/// Anything that names a query tree.
pub trait AsQueryRef {
    fn as_query_ref(&self) -> &QueryRef;
}

impl AsQueryRef for &Query {
    fn as_query_ref(&self) -> &QueryRef {
        self.node()
    }
}

impl AsQueryRef for &QueryRef {
    fn as_query_ref(&self) -> &QueryRef {
        self
    }
}

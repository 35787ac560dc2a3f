//! Query compiler.
//!
//! `compile_query(query, ctx) -> (tokens, ctx')`. The tree is walked deepest
//! source first. Steps are folded into one [`Statement`] while SQL clause order
//! (WHERE, GROUP BY, HAVING, ORDER BY, paging) can express them; a step that
//! must apply to a statement's result turns that statement into a derived table
//! `(...) aN` first:
//!
//! | Step | Derived table when the source has |
//! |------|-----------------------------------|
//! | Where | a projection, DISTINCT or paging |
//! | OrderBy / ThenBy | paging, or DISTINCT and the key is not projected |
//! | Select | a projection, DISTINCT, or paging under an aggregating projection |
//! | GroupBy | a projection, DISTINCT, paging or grouping |
//! | Distinct / Limit | paging |
//! | Join side | anything but a bare table |
//!
//! Wrapping rebinds the tables of an implicit projection to the derived alias
//! and registers every projected node as `alias.field`, so enclosing steps keep
//! resolving references. Ordering of a wrapped statement without paging moves to
//! the enclosing statement; keys over columns the derived table does not expose
//! are dropped. DISTINCT keeps only the order keys it projects.

use std::sync::Arc;

use tracing::trace;

use crate::sql::context::{Context, ProjectedField};
use crate::sql::dialect::DialectConfig;
use crate::sql::expr::{Expr, ExprRef};
use crate::sql::query::{
    JoinKind, ProjectionItem, QueryNode, QueryRef, SetOpKind, SortDir, Table, TableId,
};
use crate::sql::token::{Token, TokenStream};
use crate::sql::value::Value;

use super::expr::{compile_expr, qualified};
use super::statement::{assign_names, OrderKey, Paging, SelectItem, Statement};
use super::{CompileError, CompileResult};

/// Compiled form of a query node.
#[derive(Debug)]
enum Compiled {
    Select(Statement),
    Compound(Compound),
}

/// A set operation; only usable as a whole or as a derived table.
#[derive(Debug)]
struct Compound {
    tokens: TokenStream,
    shape: Vec<SelectItem>,
    exposed: Vec<Arc<Table>>,
    bound: Vec<TableId>,
    aliased: Vec<ExprRef>,
}

impl Compiled {
    fn arity(&self) -> CompileResult<usize> {
        match self {
            Compiled::Select(stmt) => Ok(stmt.output()?.len()),
            Compiled::Compound(c) => Ok(c.shape.len()),
        }
    }

    fn render(&self, dialect: &DialectConfig) -> CompileResult<TokenStream> {
        match self {
            Compiled::Select(stmt) => stmt.render(dialect, false),
            Compiled::Compound(c) => Ok(c.tokens.clone()),
        }
    }
}

/// Compile a complete query.
pub fn compile_query(query: &QueryRef, ctx: Context) -> CompileResult<(TokenStream, Context)> {
    let (compiled, ctx) = build(query, ctx)?;
    let tokens = compiled.render(ctx.dialect())?;
    Ok((tokens, ctx))
}

/// Compile a query nested in an expression.
///
/// The query must expose one column. Its ordering is dropped unless it pages.
/// The enclosing scope is restored afterwards; counter and bindings carry on.
pub(crate) fn compile_subquery(
    query: &QueryRef,
    ctx: Context,
) -> CompileResult<(TokenStream, Context)> {
    let outer = ctx.clone();
    let (compiled, ctx) = build(query, ctx)?;
    let compiled = match compiled {
        Compiled::Select(mut stmt) if stmt.paging.is_none() => {
            stmt.order_by.clear();
            Compiled::Select(stmt)
        }
        other => other,
    };
    let columns = compiled.arity()?;
    if columns != 1 {
        return Err(CompileError::NotScalar { columns });
    }
    let tokens = compiled.render(ctx.dialect())?;
    Ok((tokens, ctx.with_scope_of(&outer)))
}

fn build(node: &QueryRef, ctx: Context) -> CompileResult<(Compiled, Context)> {
    trace!(node = node.name(), "compiling query node");
    match node.as_ref() {
        QueryNode::From(table) => {
            let (alias, ctx) = ctx.with_alias();
            let ctx = ctx.bind_source(TableId::of(table), &alias);
            Ok((Compiled::Select(Statement::from_table(table, &alias)), ctx))
        }

        QueryNode::Where { source, predicate } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = filter(stmt, predicate, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::Having { source, predicate } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = having(stmt, predicate, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::OrderBy { source, key, dir } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = order(stmt, key, *dir, true, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::ThenBy { source, key, dir } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = order(stmt, key, *dir, false, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::Select { source, projection } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = select(stmt, projection, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::GroupBy { source, keys } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = group(stmt, keys, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::Join {
            kind,
            left,
            right,
            left_key,
            right_key,
            projection,
        } => {
            let (stmt, ctx) = join(*kind, left, right, left_key, right_key, projection, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::Distinct { source } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (mut stmt, ctx) = if stmt.paging.is_some() {
                wrap(stmt, true, ctx)?
            } else {
                (stmt, ctx)
            };
            // DISTINCT may only sort by what it selects.
            let keys = std::mem::take(&mut stmt.order_by);
            stmt.order_by = keys.into_iter().filter(|k| stmt.projects(k)).collect();
            stmt.distinct = true;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::Limit {
            source,
            count,
            offset,
        } => {
            let (stmt, ctx) = statement(source, ctx)?;
            let (stmt, ctx) = limit(stmt, *count, *offset, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }

        QueryNode::SetOp { kind, left, right } => {
            let (compound, ctx) = set_op(*kind, left, right, ctx)?;
            Ok((Compiled::Compound(compound), ctx))
        }

        QueryNode::Aggregate {
            func,
            source,
            selector,
        } => {
            // Rewritten as a one-column projection of the aggregate.
            let (stmt, ctx) = statement(source, ctx)?;
            let (mut stmt, ctx) = if stmt.select.is_some()
                || stmt.distinct
                || stmt.paging.is_some()
                || stmt.is_grouped()
            {
                wrap(stmt, false, ctx)?
            } else {
                (stmt, ctx)
            };
            stmt.order_by.clear();
            let projection = [ProjectionItem {
                expr: Arc::new(Expr::Aggregate {
                    func: *func,
                    operand: selector.clone(),
                }),
                alias: None,
            }];
            let (stmt, ctx) = select(stmt, &projection, ctx)?;
            Ok((Compiled::Select(stmt), ctx))
        }
    }
}

/// Build `node` as a statement; a set operation becomes a derived table.
fn statement(node: &QueryRef, ctx: Context) -> CompileResult<(Statement, Context)> {
    let (compiled, ctx) = build(node, ctx)?;
    match compiled {
        Compiled::Select(stmt) => Ok((stmt, ctx)),
        Compiled::Compound(c) => Ok(derive(
            c.tokens, c.shape, c.exposed, c.bound, c.aliased, ctx,
        )),
    }
}

// =============================================================================
// Steps
// =============================================================================

fn filter(
    stmt: Statement,
    predicate: &ExprRef,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    let (mut stmt, ctx) = if stmt.select.is_some() || stmt.distinct || stmt.paging.is_some() {
        wrap(stmt, true, ctx)?
    } else {
        (stmt, ctx)
    };
    let aggregating = !ctx.resolves(predicate)
        && predicate.contains_aggregate_except(&|e| ctx.resolves(e));
    if !stmt.is_grouped() && aggregating {
        return Err(CompileError::UnsupportedConstruct(
            "aggregate in a row filter".into(),
        ));
    }
    let (tokens, ctx) = compile_expr(predicate, ctx)?;
    if stmt.is_grouped() {
        stmt.having.push(tokens);
    } else {
        stmt.filters.push(tokens);
    }
    Ok((stmt, ctx))
}

fn having(
    mut stmt: Statement,
    predicate: &ExprRef,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    if !stmt.is_grouped() {
        return Err(CompileError::UnsupportedConstruct(
            "HAVING without GROUP BY".into(),
        ));
    }
    if stmt.distinct || stmt.paging.is_some() {
        return filter(stmt, predicate, ctx);
    }
    let (tokens, ctx) = compile_expr(predicate, ctx)?;
    stmt.having.push(tokens);
    Ok((stmt, ctx))
}

fn order(
    stmt: Statement,
    key: &ExprRef,
    dir: SortDir,
    primary: bool,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    let (mut stmt, ctx) =
        if stmt.paging.is_some() || (stmt.distinct && stmt.item_for(key).is_none()) {
            wrap(stmt, true, ctx)?
        } else {
            (stmt, ctx)
        };
    let (tokens, ctx) = match stmt.item_for(key) {
        Some(item) => (item.tokens.clone(), ctx),
        None => compile_expr(key, ctx)?,
    };
    let key = OrderKey {
        node: key.clone(),
        dir,
        tokens,
    };
    if primary {
        stmt.order_by.insert(0, key);
    } else {
        stmt.order_by.push(key);
    }
    Ok((stmt, ctx))
}

fn select(
    stmt: Statement,
    projection: &[ProjectionItem],
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    if projection.is_empty() {
        return Err(CompileError::UnsupportedConstruct("empty projection".into()));
    }
    let aggregating = projection.iter().any(|p| p.expr.contains_aggregate());
    let (mut stmt, mut ctx) = if stmt.select.is_some()
        || stmt.distinct
        || (stmt.paging.is_some() && aggregating)
    {
        wrap(stmt, !aggregating, ctx)?
    } else {
        (stmt, ctx)
    };
    if aggregating && !stmt.is_grouped() {
        stmt.order_by.clear();
    }

    let mut items = Vec::with_capacity(projection.len());
    for (i, item) in projection.iter().enumerate() {
        let inferred = inferred_name(&item.expr, i, &ctx);
        let (tokens, next) = compile_expr(&item.expr, ctx)?;
        ctx = next;
        items.push((tokens, item.alias.clone(), inferred, item.expr.clone()));
    }
    stmt.select = Some(assign_names(items)?);
    Ok((stmt, ctx))
}

fn group(
    stmt: Statement,
    keys: &[ExprRef],
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    if keys.is_empty() {
        return Err(CompileError::UnsupportedConstruct(
            "GROUP BY without keys".into(),
        ));
    }
    let (mut stmt, mut ctx) = if stmt.select.is_some()
        || stmt.distinct
        || stmt.paging.is_some()
        || stmt.is_grouped()
    {
        wrap(stmt, false, ctx)?
    } else {
        (stmt, ctx)
    };
    // Row order does not survive grouping.
    stmt.order_by.clear();

    let mut rendered = Vec::with_capacity(keys.len());
    for key in keys {
        let (tokens, next) = compile_expr(key, ctx)?;
        ctx = next.with_key_fragment(key, tokens.clone());
        rendered.push(tokens);
    }
    stmt.group_by = Some(rendered);
    Ok((stmt, ctx))
}

fn limit(
    stmt: Statement,
    count: u64,
    offset: u64,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    let (mut stmt, ctx) = if stmt.paging.is_some() {
        wrap(stmt, true, ctx)?
    } else {
        (stmt, ctx)
    };
    let (count, ctx) = ctx.with_parameter(paging_value(count)?);
    let (offset, ctx) = ctx.with_parameter(paging_value(offset)?);
    stmt.paging = Some(Paging { count, offset });
    Ok((stmt, ctx))
}

fn paging_value(n: u64) -> CompileResult<Value> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| CompileError::UnsupportedConstruct(format!("paging value {} out of range", n)))
}

fn join(
    kind: JoinKind,
    left: &QueryRef,
    right: &QueryRef,
    left_key: &ExprRef,
    right_key: &ExprRef,
    projection: &[ProjectionItem],
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    if projection.is_empty() {
        return Err(CompileError::UnsupportedConstruct(
            "join without a projection".into(),
        ));
    }
    let (left, ctx) = join_side(left, true, ctx)?;
    let (right, ctx) = join_side(right, false, ctx)?;
    let (lk, ctx) = compile_expr(left_key, ctx)?;
    let (rk, ctx) = compile_expr(right_key, ctx)?;

    let mut from = TokenStream::new();
    from.append(&left.from).newline();
    match kind {
        JoinKind::Inner => from.push(Token::Inner),
        JoinKind::Left => from.push(Token::Left),
    };
    from.space()
        .push(Token::Join)
        .space()
        .append(&right.from)
        .space()
        .push(Token::On)
        .space()
        .append(&lk)
        .space()
        .push(Token::Eq)
        .space()
        .append(&rk);

    let stmt = Statement {
        from,
        bound: [left.bound, right.bound].concat(),
        aliased: [left.aliased, right.aliased].concat(),
        order_by: left.order_by,
        ..Default::default()
    };
    select(stmt, projection, ctx)
}

/// A bare table joins directly; anything else joins as a derived table.
fn join_side(
    node: &QueryRef,
    keep_order: bool,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    let (stmt, ctx) = statement(node, ctx)?;
    if stmt.is_bare() {
        Ok((stmt, ctx))
    } else {
        wrap(stmt, keep_order, ctx)
    }
}

fn set_op(
    kind: SetOpKind,
    left: &QueryRef,
    right: &QueryRef,
    ctx: Context,
) -> CompileResult<(Compound, Context)> {
    let (left, ctx) = set_side(left, ctx)?;
    let (right, ctx) = set_side(right, ctx)?;

    let (l, r) = (left.output()?.len(), right.output()?.len());
    if l != r {
        return Err(CompileError::ArityMismatch { left: l, right: r });
    }

    let mut tokens = left.render(ctx.dialect(), false)?;
    tokens.newline();
    match kind {
        SetOpKind::Union => tokens.push(Token::Union),
        SetOpKind::UnionAll => tokens.push(Token::Union).space().push(Token::All),
        SetOpKind::Intersect => tokens.push(Token::Intersect),
        SetOpKind::Except => tokens.push(Token::Except),
    };
    tokens
        .newline()
        .append(&right.render(ctx.dialect(), false)?);

    let shape = left.output()?.to_vec();
    let exposed = if left.select.is_none() {
        left.exposed
    } else {
        vec![]
    };
    Ok((
        Compound {
            tokens,
            shape,
            exposed,
            bound: [left.bound, right.bound].concat(),
            aliased: [left.aliased, right.aliased].concat(),
        },
        ctx,
    ))
}

/// Set-operation operands carry no ORDER BY of their own; a paged operand is
/// wrapped so its ordering stays inside the derived table.
fn set_side(node: &QueryRef, ctx: Context) -> CompileResult<(Statement, Context)> {
    let (mut stmt, ctx) = statement(node, ctx)?;
    if stmt.paging.is_some() {
        return wrap(stmt, false, ctx);
    }
    stmt.order_by.clear();
    Ok((stmt, ctx))
}

// =============================================================================
// Derived tables
// =============================================================================

/// Turn a statement into a derived table of a new statement.
///
/// With `keep_order`, ordering of an unpaged statement is recompiled against
/// the derived table; otherwise it is dropped.
fn wrap(
    mut stmt: Statement,
    keep_order: bool,
    ctx: Context,
) -> CompileResult<(Statement, Context)> {
    let hoisted = if stmt.paging.is_none() {
        std::mem::take(&mut stmt.order_by)
    } else {
        vec![]
    };
    let shape = stmt.output()?.to_vec();
    let inner = stmt.render(ctx.dialect(), true)?;
    let exposed = if stmt.select.is_none() {
        stmt.exposed
    } else {
        vec![]
    };
    let (mut derived, mut ctx) = derive(inner, shape, exposed, stmt.bound, stmt.aliased, ctx);

    if keep_order {
        for key in hoisted {
            // A key over a column the projection left out has nothing to sort.
            match compile_expr(&key.node, ctx.clone()) {
                Ok((tokens, next)) => {
                    ctx = next;
                    derived.order_by.push(OrderKey { tokens, ..key });
                }
                Err(CompileError::UnboundColumn { table, column }) => {
                    trace!(%table, %column, "dropping order key not exposed by derived table");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok((derived, ctx))
}

fn derive(
    inner: TokenStream,
    shape: Vec<SelectItem>,
    exposed: Vec<Arc<Table>>,
    bound: Vec<TableId>,
    aliased: Vec<ExprRef>,
    ctx: Context,
) -> (Statement, Context) {
    let (alias, mut ctx) = ctx.with_alias();
    trace!(alias = %alias, columns = shape.len(), "wrapping as derived table");

    for id in bound {
        ctx = ctx.unbind_source(id);
    }
    for node in &aliased {
        ctx = ctx.without_projection_alias(node);
    }
    ctx = ctx.clear_key_fragments();
    for table in &exposed {
        ctx = ctx.bind_source(TableId::of(table), &alias);
    }

    let implicit: Vec<SelectItem> = shape
        .into_iter()
        .map(|item| SelectItem {
            tokens: qualified(&alias, &item.name),
            name: item.name,
            explicit: false,
            node: item.node,
        })
        .collect();

    let mut registered = vec![];
    for item in &implicit {
        if let Some(node) = &item.node {
            ctx = ctx.with_projection_alias(node, ProjectedField::new(&alias, &item.name));
            registered.push(node.clone());
        }
    }

    let mut from = TokenStream::new();
    from.lparen()
        .append(&inner)
        .rparen()
        .space()
        .push(Token::Ident(alias));

    let stmt = Statement {
        from,
        implicit,
        bound: exposed.iter().map(TableId::of).collect(),
        exposed,
        aliased: registered,
        ..Default::default()
    };
    (stmt, ctx)
}

/// Output name of an unnamed projection item: the column name, the field it
/// already has, or `c<position>`.
fn inferred_name(expr: &ExprRef, position: usize, ctx: &Context) -> String {
    if let Some(field) = ctx.projection_alias_of(expr) {
        return field.field.clone();
    }
    match expr.as_ref() {
        Expr::Column(column) => column.name.clone(),
        _ => format!("c{}", position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use crate::sql::query::Query;
    use crate::sql::token::Layout;
    use crate::sql::typed::{column, Int, Scalar, Str};
    use crate::sql::value::ScalarKind;

    fn customers() -> Arc<Table> {
        Table::new("customers")
            .with_column("Id", ScalarKind::Int)
            .with_column("Name", ScalarKind::String)
            .with_column("Age", ScalarKind::Int)
            .into_ref()
    }

    fn sql(query: &Query, dialect: Dialect) -> CompileResult<(String, Context)> {
        let config = dialect.config();
        let (ts, ctx) = compile_query(query.node(), Context::new(config.clone()))?;
        Ok((ts.serialize(&config, Layout::Compact), ctx))
    }

    #[test]
    fn test_flattened_statement() {
        let t = customers();
        let id: Scalar<Int> = column(&t, "Id");
        let age: Scalar<Int> = column(&t, "Age");
        let name: Scalar<Str> = column(&t, "Name");
        let q = Query::from(&t)
            .filter(&age.gt(&Scalar::lit(18)))
            .order_by(&name)
            .select([
                ProjectionItem::of(&(id + Scalar::lit(1))),
                ProjectionItem::of(&name.concat(&Scalar::lit("!"))),
            ]);
        let (sql, ctx) = sql(&q, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "SELECT (a0.Id + :p1), (a0.Name || :p2) FROM customers a0 WHERE a0.Age > :p0 ORDER BY a0.Name ASC"
        );
        assert_eq!(ctx.bindings().len(), 3);
    }

    #[test]
    fn test_order_by_prepends_then_by_appends() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let name: Scalar<Str> = column(&t, "Name");
        let id: Scalar<Int> = column(&t, "Id");
        let q = Query::from(&t)
            .order_by(&name)
            .then_by_desc(&id)
            .order_by_desc(&age);
        let (sql, _) = sql(&q, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "SELECT a0.Id, a0.Name, a0.Age FROM customers a0 ORDER BY a0.Age DESC, a0.Name ASC, a0.Id DESC"
        );
    }

    #[test]
    fn test_filter_over_projection_uses_derived_table() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let older = age.clone() + Scalar::lit(1);
        let q = Query::from(&t)
            .select([ProjectionItem::named(&older, "Older")])
            .filter(&older.gt(&Scalar::lit(30)));
        let (sql, _) = sql(&q, Dialect::SqlServer).unwrap();
        assert_eq!(
            sql,
            "SELECT a1.Older FROM (SELECT (a0.Age + @p0) AS Older FROM customers a0) a1 WHERE a1.Older > @p1"
        );
    }

    #[test]
    fn test_filter_over_implicit_projection_rebinds_table() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let q = Query::from(&t).distinct().filter(&age.lt(&Scalar::lit(65)));
        let (sql, _) = sql(&q, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "SELECT a1.Id, a1.Name, a1.Age FROM (SELECT DISTINCT a0.Id, a0.Name, a0.Age FROM customers a0) a1 WHERE a1.Age < :p0"
        );
    }

    #[test]
    fn test_where_over_grouping_becomes_having() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let total = crate::sql::typed::count_star();
        let q = Query::from(&t)
            .group_by([age.expr()])
            .filter(&total.gt(&Scalar::lit(1)))
            .select([ProjectionItem::of(&age), ProjectionItem::named(&total, "Total")]);
        let (sql, _) = sql(&q, Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "SELECT a0.Age, COUNT(*) AS Total FROM customers a0 GROUP BY a0.Age HAVING COUNT(*) > :p0"
        );
    }

    #[test]
    fn test_aggregate_in_row_filter_is_rejected() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let q = Query::from(&t).filter(&age.sum().gt(&Scalar::lit(1)));
        assert!(matches!(
            sql(&q, Dialect::Sqlite),
            Err(CompileError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_grouped_query_needs_projection() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let q = Query::from(&t).group_by([age.expr()]);
        assert!(matches!(
            sql(&q, Dialect::Sqlite),
            Err(CompileError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_scalar_subquery_must_have_one_column() {
        let t = customers();
        let inner = Table::new("orders")
            .with_column("Id", ScalarKind::Int)
            .with_column("CustomerId", ScalarKind::Int)
            .into_ref();
        let id: Scalar<Int> = column(&t, "Id");
        let q = Query::from(&t).filter(&id.in_query(&Query::from(&inner)));
        assert_eq!(
            sql(&q, Dialect::Sqlite).unwrap_err(),
            CompileError::NotScalar { columns: 2 }
        );
    }

    #[test]
    fn test_aggregate_terminal() {
        let t = customers();
        let age: Scalar<Int> = column(&t, "Age");
        let q = Query::from(&t)
            .filter(&age.gte(&Scalar::lit(18)))
            .order_by(&age)
            .aggregate(crate::sql::expr::AggregateFunc::Count, None);
        let (sql, _) = sql(&q, Dialect::SqlServer).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM customers a0 WHERE a0.Age >= @p0");
    }

    // ========================================================================
    // Snapshot tests with roundtrip validation
    // ========================================================================

    mod snapshot_tests {
        use super::*;
        use crate::sql::test_utils::validate_sql;
        use insta::assert_snapshot;

        fn orders() -> Arc<Table> {
            Table::new("orders")
                .with_column("Id", ScalarKind::Int)
                .with_column("CustomerId", ScalarKind::Int)
                .with_column("Total", ScalarKind::Int)
                .into_ref()
        }

        #[test]
        fn inner_join_sqlite() {
            let c = customers();
            let o = orders();
            let cid: Scalar<Int> = column(&c, "Id");
            let cname: Scalar<Str> = column(&c, "Name");
            let ocid: Scalar<Int> = column(&o, "CustomerId");
            let total: Scalar<Int> = column(&o, "Total");
            let q = Query::from(&c).join(
                &Query::from(&o),
                &cid,
                &ocid,
                [ProjectionItem::of(&cname), ProjectionItem::of(&total)],
            );
            let (sql, _) = sql(&q, Dialect::Sqlite).unwrap();
            assert_snapshot!(sql, @"SELECT a0.Name, a1.Total FROM customers a0 INNER JOIN orders a1 ON a0.Id = a1.CustomerId");
            validate_sql(&sql, &Dialect::Sqlite.config()).unwrap();
        }

        #[test]
        fn left_join_filtered_side_sqlite() {
            let c = customers();
            let o = orders();
            let cid: Scalar<Int> = column(&c, "Id");
            let cname: Scalar<Str> = column(&c, "Name");
            let ocid: Scalar<Int> = column(&o, "CustomerId");
            let total: Scalar<Int> = column(&o, "Total");
            let big = Query::from(&o).filter(&total.gt(&Scalar::lit(100)));
            let q = Query::from(&c).left_join(
                &big,
                &cid,
                &ocid,
                [ProjectionItem::of(&cname), ProjectionItem::of(&total)],
            );
            let (sql, ctx) = sql(&q, Dialect::Sqlite).unwrap();
            assert_snapshot!(sql, @"SELECT a0.Name, a2.Total FROM customers a0 LEFT JOIN (SELECT a1.Id, a1.CustomerId, a1.Total FROM orders a1 WHERE a1.Total > :p0) a2 ON a0.Id = a2.CustomerId");
            assert_eq!(ctx.bindings().len(), 1);
            validate_sql(&sql, &Dialect::Sqlite.config()).unwrap();
        }

        #[test]
        fn union_sqlite() {
            let c = customers();
            let c2 = Table::new("customers")
                .with_column("Id", ScalarKind::Int)
                .with_column("Name", ScalarKind::String)
                .with_column("Age", ScalarKind::Int)
                .into_ref();
            let age: Scalar<Int> = column(&c, "Age");
            let age2: Scalar<Int> = column(&c2, "Age");
            let name: Scalar<Str> = column(&c, "Name");
            let name2: Scalar<Str> = column(&c2, "Name");
            let young = Query::from(&c)
                .filter(&age.lt(&Scalar::lit(20)))
                .select([ProjectionItem::of(&name)]);
            let old = Query::from(&c2)
                .filter(&age2.gt(&Scalar::lit(60)))
                .select([ProjectionItem::of(&name2)]);
            let (sql, _) = sql(&young.union(&old), Dialect::Sqlite).unwrap();
            assert_snapshot!(sql, @"SELECT a0.Name FROM customers a0 WHERE a0.Age < :p0 UNION SELECT a1.Name FROM customers a1 WHERE a1.Age > :p1");
            validate_sql(&sql, &Dialect::Sqlite.config()).unwrap();
        }

        #[test]
        fn paged_sqlite() {
            let c = customers();
            let name: Scalar<Str> = column(&c, "Name");
            let q = Query::from(&c)
                .select([ProjectionItem::of(&name)])
                .page(10, 20);
            let (sql, ctx) = sql(&q, Dialect::Sqlite).unwrap();
            assert_snapshot!(sql, @"SELECT a0.Name FROM customers a0 ORDER BY a0.Name ASC LIMIT :p0 OFFSET :p1");
            assert_eq!(ctx.bindings().get(":p0"), Some(&Value::Int(10)));
            assert_eq!(ctx.bindings().get(":p1"), Some(&Value::Int(20)));
            validate_sql(&sql, &Dialect::Sqlite.config()).unwrap();
        }

        #[test]
        fn scalar_subquery_tsql() {
            let c = customers();
            let o = orders();
            let id: Scalar<Int> = column(&c, "Id");
            let ocid: Scalar<Int> = column(&o, "CustomerId");
            let buyers = Query::from(&o).select([ProjectionItem::of(&ocid)]);
            let q = Query::from(&c)
                .filter(&id.in_query(&buyers))
                .select([ProjectionItem::of(&id)]);
            let (sql, _) = sql(&q, Dialect::SqlServer).unwrap();
            assert_snapshot!(sql, @"SELECT a0.Id FROM customers a0 WHERE a0.Id IN (SELECT a1.CustomerId FROM orders a1)");
            validate_sql(&sql, &Dialect::SqlServer.config()).unwrap();
        }
    }
}

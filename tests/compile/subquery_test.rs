//! Subqueries nested in expressions: scalar aggregates, IN-membership,
//! correlation with the enclosing query and scope restoration.

use std::sync::Arc;

use typeql::compile::{compile, CompileError};
use typeql::prelude::*;

fn customers() -> Arc<Table> {
    Table::new("customers")
        .with_column("Id", ScalarKind::Int)
        .with_column("Name", ScalarKind::String)
        .into_ref()
}

fn orders() -> Arc<Table> {
    Table::new("orders")
        .with_column("Id", ScalarKind::Int)
        .with_column("CustomerId", ScalarKind::Int)
        .with_column("Total", ScalarKind::Decimal)
        .into_ref()
}

#[test]
fn test_count_in_projection() {
    let c = customers();
    let o = orders();
    let name: Scalar<Str> = column(&c, "Name");
    let order_count = Query::from(&o).count();

    let q = Query::from(&c).select([
        ProjectionItem::of(&name),
        ProjectionItem::named(&order_count, "Orders"),
    ]);
    let compiled = compile(&q, &Dialect::SqlServer.config()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT a0.Name, (SELECT COUNT(*) FROM orders a1) AS Orders FROM customers a0"
    );
    assert!(compiled.bindings.is_empty());
}

#[test]
fn test_correlated_sum() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let name: Scalar<Str> = column(&c, "Name");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let total: Scalar<Decimal> = column(&o, "Total");

    let spent = Query::from(&o).filter(&ocid.eq(&cid)).sum(&total);
    let q = Query::from(&c).select([
        ProjectionItem::of(&name),
        ProjectionItem::named(&spent, "Spent"),
    ]);

    let compiled = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT a0.Name, (SELECT SUM(a1.Total) FROM orders a1 WHERE a1.CustomerId = a0.Id) AS Spent FROM customers a0"
    );
}

#[test]
fn test_in_subquery_filter() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let total: Scalar<Decimal> = column(&o, "Total");

    let big_spenders = Query::from(&o)
        .filter(&total.gt(&Scalar::lit(500)))
        .select([ProjectionItem::of(&ocid)]);
    let q = Query::from(&c).filter(&cid.in_query(&big_spenders));

    let compiled = compile(&q, &Dialect::SqlServer.config()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT a0.Id, a0.Name FROM customers a0 WHERE a0.Id IN (SELECT a1.CustomerId FROM orders a1 WHERE a1.Total > @p0)"
    );
    assert_eq!(compiled.bindings.len(), 1);
}

#[test]
fn test_subquery_ordering_dropped() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let total: Scalar<Decimal> = column(&o, "Total");

    let buyers = Query::from(&o)
        .order_by_desc(&total)
        .select([ProjectionItem::of(&ocid)]);
    let q = Query::from(&c).filter(&cid.in_query(&buyers));

    let compiled = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert!(!compiled.sql.contains("ORDER BY"));
}

#[test]
fn test_paged_subquery_keeps_ordering() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let total: Scalar<Decimal> = column(&o, "Total");

    let top = Query::from(&o)
        .order_by_desc(&total)
        .select([ProjectionItem::of(&ocid)])
        .limit(5);
    let q = Query::from(&c).filter(&cid.in_query(&top));

    let compiled = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT a0.Id, a0.Name FROM customers a0 WHERE a0.Id IN (SELECT a1.CustomerId FROM orders a1 ORDER BY a1.Total DESC LIMIT :p0 OFFSET :p1)"
    );
}

#[test]
fn test_multi_column_subquery_rejected() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let q = Query::from(&c).filter(&cid.in_query(&Query::from(&o)));

    assert_eq!(
        compile(&q, &Dialect::Sqlite.config()).unwrap_err(),
        CompileError::NotScalar { columns: 3 }
    );
}

#[test]
fn test_subquery_tables_do_not_leak() {
    let c = customers();
    let o = orders();
    let cid: Scalar<Int> = column(&c, "Id");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let total: Scalar<Decimal> = column(&o, "Total");

    // `orders` is only in scope inside the subquery.
    let q = Query::from(&c)
        .filter(&cid.in_query(&Query::from(&o).select([ProjectionItem::of(&ocid)])))
        .filter(&total.gt(&Scalar::lit(0)));

    assert_eq!(
        compile(&q, &Dialect::Sqlite.config()).unwrap_err(),
        CompileError::UnboundColumn {
            table: "orders".into(),
            column: "Total".into()
        }
    );
}

#[test]
fn test_aliases_continue_after_subquery() {
    let c = customers();
    let o = orders();
    let other = customers();
    let cid: Scalar<Int> = column(&c, "Id");
    let ocid: Scalar<Int> = column(&o, "CustomerId");
    let other_id: Scalar<Int> = column(&other, "Id");

    let q = Query::from(&c)
        .filter(&cid.in_query(&Query::from(&o).select([ProjectionItem::of(&ocid)])))
        .select([ProjectionItem::of(&cid)])
        .union(&Query::from(&other).select([ProjectionItem::of(&other_id)]));

    let compiled = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT a0.Id FROM customers a0 WHERE a0.Id IN (SELECT a1.CustomerId FROM orders a1) UNION SELECT a2.Id FROM customers a2"
    );
}

//! One query tree, several dialects.
//!
//! Structure is identical across dialects; only the rendering constants
//! (parameter prefix, boolean encoding, concatenation, paging, quoting) differ.

use std::sync::Arc;

use typeql::compile::{compile, compile_with};
use typeql::config::Settings;
use typeql::dialect::{BoolEncoding, DialectConfig};
use typeql::prelude::*;

fn accounts() -> Arc<Table> {
    Table::new("accounts")
        .with_column("Id", ScalarKind::Int)
        .with_column("Owner", ScalarKind::String)
        .with_column("Active", ScalarKind::Bool)
        .into_ref()
}

fn active_owners(t: &Arc<Table>) -> Query {
    let owner: Scalar<Str> = column(t, "Owner");
    let active: Scalar<Bool> = column(t, "Active");
    Query::from(t)
        .filter(&active.eq(&Scalar::lit(true)))
        .select([ProjectionItem::named(&owner.concat(&Scalar::lit("*")), "Label")])
}

fn keyword_dialect() -> DialectConfig {
    let settings = Settings::from_toml_str(
        r#"
[compiler]
dialect = "pg"

[dialects.pg]
parameter_prefix = "$"
bool_encoding = "keyword"
string_concat = { operator = "||" }
paging = "limit_offset"
identifier_quote = "double"
"#,
    )
    .unwrap();
    settings.dialect("pg").unwrap()
}

#[test]
fn test_boolean_literal_encoding() {
    let t = accounts();
    let q = active_owners(&t);

    let numeric = compile(&q, &Dialect::SqlServer.config()).unwrap();
    let keyword = compile(&q, &keyword_dialect()).unwrap();

    assert_eq!(numeric.bindings.get("@p0"), Some(&Value::Int(1)));
    assert_eq!(keyword.bindings.get("$p0"), Some(&Value::Bool(true)));
    assert_eq!(numeric.bindings.len(), keyword.bindings.len());
}

#[test]
fn test_same_tree_three_dialects() {
    let t = accounts();
    let q = active_owners(&t);

    let tsql = compile(&q, &Dialect::SqlServer.config()).unwrap();
    assert_eq!(
        tsql.sql,
        "SELECT CONCAT(a0.Owner, @p1) AS Label FROM accounts a0 WHERE a0.Active = @p0"
    );

    let sqlite = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert_eq!(
        sqlite.sql,
        "SELECT (a0.Owner || :p1) AS Label FROM accounts a0 WHERE a0.Active = :p0"
    );

    let pg = compile(&q, &keyword_dialect()).unwrap();
    assert_eq!(
        pg.sql,
        r#"SELECT ("a0"."Owner" || $p1) AS "Label" FROM "accounts" "a0" WHERE "a0"."Active" = $p0"#
    );

    let names: Vec<&str> = pg.bindings.names().collect();
    assert_eq!(names, vec!["$p0", "$p1"]);
}

#[test]
fn test_paging_syntax() {
    let t = accounts();
    let id: Scalar<Int> = column(&t, "Id");
    let q = Query::from(&t)
        .order_by(&id)
        .select([ProjectionItem::of(&id)])
        .page(20, 40);

    let tsql = compile(&q, &Dialect::SqlServer.config()).unwrap();
    assert_eq!(
        tsql.sql,
        "SELECT a0.Id FROM accounts a0 ORDER BY a0.Id ASC OFFSET @p1 ROWS FETCH NEXT @p0 ROWS ONLY"
    );

    let sqlite = compile(&q, &Dialect::Sqlite.config()).unwrap();
    assert_eq!(
        sqlite.sql,
        "SELECT a0.Id FROM accounts a0 ORDER BY a0.Id ASC LIMIT :p0 OFFSET :p1"
    );

    // Bindings agree: count first, then offset.
    let tsql_values: Vec<&Value> = tsql.bindings.iter().map(|(_, v)| v).collect();
    let sqlite_values: Vec<&Value> = sqlite.bindings.iter().map(|(_, v)| v).collect();
    assert_eq!(tsql_values, sqlite_values);
    assert_eq!(tsql_values, vec![&Value::Int(20), &Value::Int(40)]);
}

#[test]
fn test_options_from_settings() {
    let settings = Settings::from_toml_str(
        r#"
[compiler]
dialect = "sqlite"
layout = "pretty"
"#,
    )
    .unwrap();
    let options = settings.compile_options().unwrap();
    assert_eq!(options.dialect.bool_encoding, BoolEncoding::Numeric);

    let t = accounts();
    let compiled = compile_with(&active_owners(&t), &options).unwrap();
    insta::assert_snapshot!(compiled.sql, @r"
    SELECT
        (a0.Owner || :p1) AS Label
    FROM accounts a0
    WHERE a0.Active = :p0
    ");
}

#[test]
fn test_custom_false_predicate() {
    let mut dialect = Dialect::Sqlite.config();
    dialect.false_predicate = "0 = 1".into();

    let t = accounts();
    let id: Scalar<Int> = column(&t, "Id");
    let q = Query::from(&t)
        .filter(&id.in_values(Vec::<i64>::new()))
        .select([ProjectionItem::of(&id)]);

    let compiled = compile(&q, &dialect).unwrap();
    assert_eq!(compiled.sql, "SELECT a0.Id FROM accounts a0 WHERE 0 = 1");
}

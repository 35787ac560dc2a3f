//! Single SELECT statement under construction.
//!
//! The query compiler folds relational steps into a [`Statement`] for as long
//! as SQL clause order allows, and turns it into a derived table when a step
//! has to apply to the statement's *result* (see `query.rs`).

use std::sync::Arc;

use crate::sql::dialect::{helpers, DialectConfig, PagingSyntax};
use crate::sql::expr::{ExprId, ExprRef};
use crate::sql::query::{SortDir, Table, TableId};
use crate::sql::token::{Token, TokenStream};

use super::expr::qualified;
use super::{CompileError, CompileResult};

/// One output column.
#[derive(Debug, Clone)]
pub(crate) struct SelectItem {
    pub tokens: TokenStream,
    /// Output field name, unique within the statement.
    pub name: String,
    /// Whether the name was given by the caller.
    pub explicit: bool,
    /// The projected node, if the column was projected explicitly.
    pub node: Option<ExprRef>,
}

impl SelectItem {
    /// Whether the item renders as `x.name`, so `AS name` would be redundant.
    fn is_self_named(&self) -> bool {
        let tokens: Vec<&Token> = self.tokens.iter().collect();
        matches!(
            tokens.as_slice(),
            [Token::Ident(_), Token::Dot, Token::Ident(field)] if *field == self.name
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrderKey {
    pub node: ExprRef,
    pub dir: SortDir,
    pub tokens: TokenStream,
}

/// Bound parameter names of a paging clause.
#[derive(Debug, Clone)]
pub(crate) struct Paging {
    pub count: String,
    pub offset: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Statement {
    pub from: TokenStream,
    /// Output when no projection was given.
    pub implicit: Vec<SelectItem>,
    /// Tables whose columns resolve by name against `implicit`.
    pub exposed: Vec<Arc<Table>>,
    /// Table instances bound to aliases inside `from`.
    pub bound: Vec<TableId>,
    /// Nodes registered as projection aliases resolving into `from`.
    pub aliased: Vec<ExprRef>,
    pub select: Option<Vec<SelectItem>>,
    pub distinct: bool,
    pub filters: Vec<TokenStream>,
    pub group_by: Option<Vec<TokenStream>>,
    pub having: Vec<TokenStream>,
    pub order_by: Vec<OrderKey>,
    pub paging: Option<Paging>,
}

impl Statement {
    /// Statement over a base table instance.
    pub fn from_table(table: &Arc<Table>, alias: &str) -> Self {
        let mut from = TokenStream::new();
        from.push(Token::Ident(table.name.clone()))
            .space()
            .push(Token::Ident(alias.into()));
        let implicit = table
            .columns
            .iter()
            .map(|c| SelectItem {
                tokens: qualified(alias, &c.name),
                name: c.name.clone(),
                explicit: false,
                node: None,
            })
            .collect();
        Self {
            from,
            implicit,
            exposed: vec![table.clone()],
            bound: vec![TableId::of(table)],
            ..Default::default()
        }
    }

    /// Nothing but a FROM over one table.
    pub fn is_bare(&self) -> bool {
        self.select.is_none()
            && !self.distinct
            && self.filters.is_empty()
            && self.group_by.is_none()
            && self.having.is_empty()
            && self.order_by.is_empty()
            && self.paging.is_none()
            && self.aliased.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by.is_some()
    }

    /// The output columns, explicit or implicit.
    pub fn output(&self) -> CompileResult<&[SelectItem]> {
        if let Some(items) = &self.select {
            return Ok(items.as_slice());
        }
        if self.is_grouped() {
            return Err(CompileError::UnsupportedConstruct(
                "grouped query without a projection".into(),
            ));
        }
        if self.implicit.is_empty() {
            return Err(CompileError::UnsupportedConstruct(
                "implicit projection of a table with no declared columns".into(),
            ));
        }
        Ok(self.implicit.as_slice())
    }

    /// Output item projecting `node`, if any.
    pub fn item_for(&self, node: &ExprRef) -> Option<&SelectItem> {
        let id = ExprId::of(node);
        self.select
            .as_deref()
            .unwrap_or(self.implicit.as_slice())
            .iter()
            .find(|item| item.node.as_ref().map(ExprId::of) == Some(id))
    }

    /// Whether `key` sorts by one of the output columns, by node or by SQL.
    pub fn projects(&self, key: &OrderKey) -> bool {
        let Ok(items) = self.output() else {
            return false;
        };
        let id = ExprId::of(&key.node);
        items.iter().any(|item| {
            item.node.as_ref().map(ExprId::of) == Some(id) || item.tokens == key.tokens
        })
    }

    /// Render the statement.
    ///
    /// In derived mode every output column is named, so an enclosing statement
    /// can reference it as `alias.field`.
    pub fn render(&self, dialect: &DialectConfig, derived: bool) -> CompileResult<TokenStream> {
        let items = self.output()?;
        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(1).append(&item.tokens);
            if item.explicit || (derived && !item.is_self_named()) {
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::Ident(item.name.clone()));
            }
        }

        ts.newline().push(Token::From).space().append(&self.from);

        if !self.filters.is_empty() {
            ts.newline().push(Token::Where).space();
            conjunction(&mut ts, &self.filters);
        }

        if let Some(keys) = &self.group_by {
            ts.newline().push(Token::GroupBy).space();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(key);
            }
        }

        if !self.having.is_empty() {
            ts.newline().push(Token::Having).space();
            conjunction(&mut ts, &self.having);
        }

        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, key) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&key.tokens).space().push(direction(key.dir));
            }
        } else if self.paging.is_some() {
            // Paging needs a deterministic order.
            ts.newline()
                .push(Token::OrderBy)
                .space()
                .append(&items[0].tokens)
                .space()
                .push(Token::Asc);
        }

        if let Some(paging) = &self.paging {
            let clause = match dialect.paging {
                PagingSyntax::OffsetFetch => {
                    helpers::emit_offset_fetch(&paging.count, &paging.offset)
                }
                PagingSyntax::LimitOffset => {
                    helpers::emit_limit_offset_standard(&paging.count, &paging.offset)
                }
            };
            ts.newline().append(&clause);
        }

        Ok(ts)
    }
}

/// Assign output names: explicit names must be unique; inferred names take a
/// numeric suffix when taken.
pub(crate) fn assign_names(
    items: Vec<(TokenStream, Option<String>, String, ExprRef)>,
) -> CompileResult<Vec<SelectItem>> {
    let mut taken: Vec<String> = vec![];
    for (_, alias, _, _) in &items {
        if let Some(alias) = alias {
            if taken.contains(alias) {
                return Err(CompileError::DuplicateField(alias.clone()));
            }
            taken.push(alias.clone());
        }
    }

    let mut out = Vec::with_capacity(items.len());
    for (tokens, alias, inferred, node) in items {
        let (name, explicit) = match alias {
            Some(alias) => (alias, true),
            None => {
                let mut name = inferred.clone();
                let mut suffix = 1;
                while taken.contains(&name) {
                    name = format!("{}{}", inferred, suffix);
                    suffix += 1;
                }
                taken.push(name.clone());
                (name, false)
            }
        };
        out.push(SelectItem {
            tokens,
            name,
            explicit,
            node: Some(node),
        });
    }
    Ok(out)
}

fn conjunction(ts: &mut TokenStream, predicates: &[TokenStream]) {
    for (i, p) in predicates.iter().enumerate() {
        if i > 0 {
            ts.space().push(Token::And).space();
        }
        ts.append(p);
    }
}

fn direction(dir: SortDir) -> Token {
    match dir {
        SortDir::Asc => Token::Asc,
        SortDir::Desc => Token::Desc,
    }
}

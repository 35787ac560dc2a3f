//! Expression compiler.
//!
//! `compile_expr(expr, ctx) -> (tokens, ctx')`. Dispatch order:
//!
//! 1. projection-alias shortcut (and grouping-key reuse),
//! 2. dialect-sensitive forms (boolean literals, string concatenation),
//! 3. kind-generic forms.
//!
//! Literal values never reach the token stream; each one is bound through
//! [`Context::with_parameter`] and referenced by name.

use crate::sql::context::Context;
use crate::sql::dialect::ConcatSyntax;
use crate::sql::expr::{BinaryOperator, CompareOperator, Expr, ExprRef, UnaryOperator};
use crate::sql::token::{Token, TokenStream};
use crate::sql::value::Value;

use super::query::compile_subquery;
use super::{CompileError, CompileResult};

/// Compile one expression.
pub fn compile_expr(expr: &ExprRef, ctx: Context) -> CompileResult<(TokenStream, Context)> {
    if let Some(field) = ctx.projection_alias_of(expr) {
        return Ok((qualified(&field.alias, &field.field), ctx));
    }
    if let Some(tokens) = ctx.key_fragment(expr) {
        return Ok((tokens.clone(), ctx));
    }

    match expr.as_ref() {
        Expr::Literal(value) => Ok(bind(value, ctx)),

        Expr::Unary { op, operand } => {
            if *op == UnaryOperator::Negate {
                require_numeric(operand, "negation")?;
            }
            let (inner, ctx) = compile_expr(operand, ctx)?;
            let mut ts = TokenStream::new();
            match op {
                UnaryOperator::Not => ts.push(Token::Not).space(),
                UnaryOperator::Negate => ts.push(Token::Minus),
            };
            ts.lparen().append(&inner).rparen();
            Ok((ts, ctx))
        }

        Expr::Binary { op, left, right } => {
            if op.is_arithmetic() {
                require_numeric(left, "arithmetic")?;
                require_numeric(right, "arithmetic")?;
            }
            let (l, ctx) = compile_expr(left, ctx)?;
            let (r, ctx) = compile_expr(right, ctx)?;
            let ts = match op {
                BinaryOperator::Concat => match &ctx.dialect().string_concat {
                    ConcatSyntax::Operator(symbol) => infix(&l, Token::Symbol(symbol.clone()), &r),
                    ConcatSyntax::Function(name) => {
                        let mut ts = TokenStream::new();
                        ts.push(Token::FunctionName(name.clone()))
                            .lparen()
                            .append(&l)
                            .comma()
                            .space()
                            .append(&r)
                            .rparen();
                        ts
                    }
                },
                _ => infix(&l, binary_token(*op), &r),
            };
            Ok((ts, ctx))
        }

        Expr::Column(column)
            if !column.table.columns.is_empty() && column.table.column(&column.name).is_none() =>
        {
            Err(CompileError::UnknownColumn {
                table: column.table.name.clone(),
                column: column.name.clone(),
            })
        }

        Expr::Column(column) => match ctx.source_alias(column.table_id()) {
            Some(alias) => Ok((qualified(alias, &column.name), ctx)),
            None => Err(CompileError::UnboundColumn {
                table: column.table.name.clone(),
                column: column.name.clone(),
            }),
        },

        Expr::Parameter { name, .. } => Ok((Token::Param(name.clone()).into(), ctx)),

        Expr::Case {
            cond,
            then,
            otherwise,
        } => {
            let (c, ctx) = compile_expr(cond, ctx)?;
            let (t, ctx) = compile_expr(then, ctx)?;
            let (e, ctx) = compile_expr(otherwise, ctx)?;
            let mut ts = TokenStream::new();
            ts.push(Token::Case)
                .space()
                .push(Token::When)
                .space()
                .append(&c)
                .space()
                .push(Token::Then)
                .space()
                .append(&t)
                .space()
                .push(Token::Else)
                .space()
                .append(&e)
                .space()
                .push(Token::End);
            Ok((ts, ctx))
        }

        Expr::Null(_) => Ok((Token::Null.into(), ctx)),

        Expr::Aggregate { func, operand } => {
            let (arg, ctx) = match operand {
                Some(operand) => compile_expr(operand, ctx)?,
                None => (Token::Star.into(), ctx),
            };
            let mut ts = TokenStream::new();
            ts.push(Token::FunctionName(func.name().into()))
                .lparen()
                .append(&arg)
                .rparen();
            Ok((ts, ctx))
        }

        Expr::Compare { op, left, right } => {
            if left.is_null() || right.is_null() {
                return compile_null_comparison(*op, left, right, ctx);
            }
            let (l, ctx) = compile_expr(left, ctx)?;
            let (r, ctx) = compile_expr(right, ctx)?;
            let mut ts = TokenStream::new();
            ts.append(&l)
                .space()
                .push(compare_token(*op))
                .space()
                .append(&r);
            Ok((ts, ctx))
        }

        Expr::Widen { inner, .. } => compile_expr(inner, ctx),

        Expr::Like { value, pattern } => {
            let (v, ctx) = compile_expr(value, ctx)?;
            let (param, ctx) = ctx.with_parameter(Value::String(pattern.clone()));
            let mut ts = TokenStream::new();
            ts.append(&v)
                .space()
                .push(Token::Like)
                .space()
                .push(Token::Param(param));
            Ok((ts, ctx))
        }

        Expr::InValues { values, .. } if values.is_empty() => {
            Ok((Token::FalsePredicate.into(), ctx))
        }

        Expr::InValues { expr, values } => {
            let (subject, mut ctx) = compile_expr(expr, ctx)?;
            let mut ts = TokenStream::new();
            ts.append(&subject)
                .space()
                .push(Token::In)
                .space()
                .lparen();
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                let (param, next) = bind(value, ctx);
                ts.append(&param);
                ctx = next;
            }
            ts.rparen();
            Ok((ts, ctx))
        }

        Expr::InSubquery { expr, query } => {
            let (subject, ctx) = compile_expr(expr, ctx)?;
            let (sub, ctx) = compile_subquery(query, ctx)?;
            let mut ts = TokenStream::new();
            ts.append(&subject)
                .space()
                .push(Token::In)
                .space()
                .lparen()
                .append(&sub)
                .rparen();
            Ok((ts, ctx))
        }

        Expr::Subquery { query, .. } => {
            let (sub, ctx) = compile_subquery(query, ctx)?;
            let mut ts = TokenStream::new();
            ts.lparen().append(&sub).rparen();
            Ok((ts, ctx))
        }
    }
}

/// `x = NULL` -> `x IS NULL`, `x <> NULL` -> `x IS NOT NULL`, either operand order.
fn compile_null_comparison(
    op: CompareOperator,
    left: &ExprRef,
    right: &ExprRef,
    ctx: Context,
) -> CompileResult<(TokenStream, Context)> {
    let test = match op {
        CompareOperator::Eq => Token::IsNull,
        CompareOperator::Ne => Token::IsNotNull,
        _ => {
            return Err(CompileError::UnsupportedConstruct(format!(
                "ordering comparison ({}) against NULL",
                compare_token(op).serialize(ctx.dialect(), Default::default())
            )))
        }
    };
    let subject = if right.is_null() { left } else { right };
    let (s, ctx) = compile_expr(subject, ctx)?;
    let mut ts = TokenStream::new();
    ts.append(&s).space().push(test);
    Ok((ts, ctx))
}

/// Bind a literal; booleans follow the dialect's encoding.
fn bind(value: &Value, ctx: Context) -> (TokenStream, Context) {
    let value = match value {
        Value::Bool(b) => ctx.dialect().encode_bool(*b),
        other => other.clone(),
    };
    let (name, ctx) = ctx.with_parameter(value);
    (Token::Param(name).into(), ctx)
}

/// `alias.field`
pub(crate) fn qualified(alias: &str, field: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(alias.into()))
        .push(Token::Dot)
        .push(Token::Ident(field.into()));
    ts
}

/// Arithmetic applies to Int and Decimal operands only.
fn require_numeric(operand: &ExprRef, construct: &str) -> CompileResult<()> {
    let kind = operand.kind();
    if kind.is_numeric() {
        Ok(())
    } else {
        Err(CompileError::UnsupportedConstruct(format!(
            "{} on a {} operand",
            construct, kind
        )))
    }
}

/// `(l op r)`
fn infix(l: &TokenStream, op: Token, r: &TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.lparen()
        .append(l)
        .space()
        .push(op)
        .space()
        .append(r)
        .rparen();
    ts
}

fn binary_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Add => Token::Plus,
        BinaryOperator::Sub => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
        BinaryOperator::Mod => Token::Mod,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        // Concat is rendered per dialect before reaching here.
        BinaryOperator::Concat => Token::Symbol("||".into()),
    }
}

fn compare_token(op: CompareOperator) -> Token {
    match op {
        CompareOperator::Eq => Token::Eq,
        CompareOperator::Ne => Token::Ne,
        CompareOperator::Lt => Token::Lt,
        CompareOperator::Lte => Token::Lte,
        CompareOperator::Gt => Token::Gt,
        CompareOperator::Gte => Token::Gte,
    }
}

//! Typed expression facade.
//!
//! [`Scalar<T>`] wraps a shared [`Expr`] node and tags it with a kind marker, so
//! only kind-correct trees can be assembled: arithmetic on numeric kinds,
//! concatenation on strings, comparisons between equal kinds yielding
//! `Scalar<Bool>`, and explicit [`Scalar::widen`] for int-to-decimal conversion.
//!
//! Cloning a `Scalar` clones the handle, not the node, so the clone keeps the
//! node's identity. Reuse a projected value by cloning its `Scalar`.
//!
//! # Example
//!
//! ```ignore
//! use typeql::prelude::*;
//!
//! let customers = Table::new("customers")
//!     .with_column("Age", ScalarKind::Int)
//!     .into_ref();
//! let age: Scalar<Int> = column(&customers, "Age");
//! let adult = age.gt(&Scalar::lit(18));
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::expr::{
    AggregateFunc, BinaryOperator, ColumnRef, CompareOperator, Expr, ExprId, ExprRef,
    UnaryOperator,
};
use super::query::{Query, Table};
use super::value::{ScalarKind, Value};

// =============================================================================
// Kind markers
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A scalar kind known at compile time.
pub trait SqlType: sealed::Sealed {
    const KIND: ScalarKind;
    /// The host type of literals of this kind.
    type Host: Into<Value>;
}

/// Kinds that support arithmetic.
pub trait Numeric: SqlType {}

/// Boolean kind marker.
#[derive(Debug)]
pub enum Bool {}
/// Integer kind marker.
#[derive(Debug)]
pub enum Int {}
/// String kind marker.
#[derive(Debug)]
pub enum Str {}
/// Decimal kind marker.
#[derive(Debug)]
pub enum Decimal {}
/// Date/time kind marker.
#[derive(Debug)]
pub enum DateTime {}
/// GUID kind marker.
#[derive(Debug)]
pub enum Guid {}

macro_rules! sql_type {
    ($marker:ty, $kind:expr, $host:ty) => {
        impl sealed::Sealed for $marker {}
        impl SqlType for $marker {
            const KIND: ScalarKind = $kind;
            type Host = $host;
        }
    };
}

sql_type!(Bool, ScalarKind::Bool, bool);
sql_type!(Int, ScalarKind::Int, i64);
sql_type!(Str, ScalarKind::String, String);
sql_type!(Decimal, ScalarKind::Decimal, rust_decimal::Decimal);
sql_type!(DateTime, ScalarKind::DateTime, NaiveDateTime);
sql_type!(Guid, ScalarKind::Guid, Uuid);

impl Numeric for Int {}
impl Numeric for Decimal {}

// =============================================================================
// Scalar<T>
// =============================================================================

/// A typed handle to a shared expression node.
pub struct Scalar<T> {
    node: ExprRef,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Scalar<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Scalar").field(&self.node).finish()
    }
}

impl<T> Scalar<T> {
    fn wrap(expr: Expr) -> Self {
        Self {
            node: Arc::new(expr),
            _kind: PhantomData,
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &ExprRef {
        &self.node
    }

    /// A new handle to the underlying node.
    pub fn expr(&self) -> ExprRef {
        self.node.clone()
    }

    /// Identity of the underlying node.
    pub fn id(&self) -> ExprId {
        ExprId::of(&self.node)
    }
}

impl<T: SqlType> Scalar<T> {
    /// Literal value; always compiled to a bound parameter.
    pub fn lit(value: impl Into<T::Host>) -> Self {
        let host: T::Host = value.into();
        Self::wrap(Expr::Literal(host.into()))
    }

    /// NULL of this kind.
    pub fn null() -> Self {
        Self::wrap(Expr::Null(T::KIND))
    }

    /// Caller-supplied named parameter, emitted verbatim.
    pub fn param(name: &str) -> Self {
        Self::wrap(Expr::Parameter {
            name: name.into(),
            kind: T::KIND,
        })
    }

    /// A one-column query used as a scalar.
    pub fn subquery(query: &Query) -> Self {
        Self::wrap(Expr::Subquery {
            kind: T::KIND,
            query: query.node().clone(),
        })
    }

    /// CASE WHEN cond THEN then ELSE otherwise END
    pub fn case(cond: &Scalar<Bool>, then: &Scalar<T>, otherwise: &Scalar<T>) -> Self {
        Self::wrap(Expr::Case {
            cond: cond.expr(),
            then: then.expr(),
            otherwise: otherwise.expr(),
        })
    }

    fn compare(&self, op: CompareOperator, other: &Scalar<T>) -> Scalar<Bool> {
        Scalar::wrap(Expr::Compare {
            op,
            left: self.expr(),
            right: other.expr(),
        })
    }

    pub fn eq(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Eq, other)
    }

    pub fn ne(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Ne, other)
    }

    pub fn lt(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Lt, other)
    }

    pub fn lte(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Lte, other)
    }

    pub fn gt(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Gt, other)
    }

    pub fn gte(&self, other: &Scalar<T>) -> Scalar<Bool> {
        self.compare(CompareOperator::Gte, other)
    }

    /// `self = NULL`, compiled as `IS NULL`.
    pub fn is_null(&self) -> Scalar<Bool> {
        self.eq(&Scalar::null())
    }

    /// `self <> NULL`, compiled as `IS NOT NULL`.
    pub fn is_not_null(&self) -> Scalar<Bool> {
        self.ne(&Scalar::null())
    }

    /// `self IN (values...)`; an empty list is never satisfied.
    pub fn in_values<V: Into<T::Host>>(&self, values: impl IntoIterator<Item = V>) -> Scalar<Bool> {
        Scalar::wrap(Expr::InValues {
            expr: self.expr(),
            values: values
                .into_iter()
                .map(|v| {
                    let host: T::Host = v.into();
                    host.into()
                })
                .collect(),
        })
    }

    /// `self IN (SELECT ...)`; the query must expose one column.
    pub fn in_query(&self, query: &Query) -> Scalar<Bool> {
        Scalar::wrap(Expr::InSubquery {
            expr: self.expr(),
            query: query.node().clone(),
        })
    }

    pub fn min(&self) -> Scalar<T> {
        aggregate(AggregateFunc::Min, Some(self.expr()))
    }

    pub fn max(&self) -> Scalar<T> {
        aggregate(AggregateFunc::Max, Some(self.expr()))
    }

    /// COUNT(self)
    pub fn count(&self) -> Scalar<Int> {
        aggregate(AggregateFunc::Count, Some(self.expr()))
    }
}

impl<T: Numeric> Scalar<T> {
    fn arith(&self, op: BinaryOperator, other: &Scalar<T>) -> Scalar<T> {
        Scalar::wrap(Expr::Binary {
            op,
            left: self.expr(),
            right: other.expr(),
        })
    }

    pub fn sum(&self) -> Scalar<T> {
        aggregate(AggregateFunc::Sum, Some(self.expr()))
    }

    pub fn avg(&self) -> Scalar<Decimal> {
        aggregate(AggregateFunc::Avg, Some(self.expr()))
    }
}

impl Scalar<Int> {
    /// Implicit int-to-decimal conversion.
    pub fn widen(&self) -> Scalar<Decimal> {
        Scalar::wrap(Expr::Widen {
            to: ScalarKind::Decimal,
            inner: self.expr(),
        })
    }

    /// self % other
    pub fn rem(&self, other: &Scalar<Int>) -> Scalar<Int> {
        self.arith(BinaryOperator::Mod, other)
    }
}

impl Scalar<Str> {
    /// self || other
    pub fn concat(&self, other: &Scalar<Str>) -> Scalar<Str> {
        Scalar::wrap(Expr::Binary {
            op: BinaryOperator::Concat,
            left: self.expr(),
            right: other.expr(),
        })
    }

    /// self LIKE pattern; the pattern is bound as a parameter.
    pub fn like(&self, pattern: &str) -> Scalar<Bool> {
        Scalar::wrap(Expr::Like {
            value: self.expr(),
            pattern: pattern.into(),
        })
    }
}

impl Scalar<Bool> {
    pub fn and(&self, other: &Scalar<Bool>) -> Scalar<Bool> {
        Scalar::wrap(Expr::Binary {
            op: BinaryOperator::And,
            left: self.expr(),
            right: other.expr(),
        })
    }

    pub fn or(&self, other: &Scalar<Bool>) -> Scalar<Bool> {
        Scalar::wrap(Expr::Binary {
            op: BinaryOperator::Or,
            left: self.expr(),
            right: other.expr(),
        })
    }
}

macro_rules! arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Numeric> std::ops::$trait for Scalar<T> {
            type Output = Scalar<T>;
            fn $method(self, rhs: Scalar<T>) -> Scalar<T> {
                self.arith($op, &rhs)
            }
        }

        impl<T: Numeric> std::ops::$trait for &Scalar<T> {
            type Output = Scalar<T>;
            fn $method(self, rhs: &Scalar<T>) -> Scalar<T> {
                self.arith($op, rhs)
            }
        }
    };
}

arith_op!(Add, add, BinaryOperator::Add);
arith_op!(Sub, sub, BinaryOperator::Sub);
arith_op!(Mul, mul, BinaryOperator::Mul);
arith_op!(Div, div, BinaryOperator::Div);

impl<T: Numeric> std::ops::Neg for Scalar<T> {
    type Output = Scalar<T>;
    fn neg(self) -> Scalar<T> {
        Scalar::wrap(Expr::Unary {
            op: UnaryOperator::Negate,
            operand: self.node,
        })
    }
}

impl std::ops::Not for Scalar<Bool> {
    type Output = Scalar<Bool>;
    fn not(self) -> Scalar<Bool> {
        Scalar::wrap(Expr::Unary {
            op: UnaryOperator::Not,
            operand: self.node,
        })
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Column of a table instance.
pub fn column<T: SqlType>(table: &Arc<Table>, name: &str) -> Scalar<T> {
    Scalar::wrap(Expr::Column(ColumnRef {
        table: table.clone(),
        name: name.into(),
        kind: T::KIND,
    }))
}

/// COUNT(*)
pub fn count_star() -> Scalar<Int> {
    aggregate(AggregateFunc::Count, None)
}

fn aggregate<T>(func: AggregateFunc, operand: Option<ExprRef>) -> Scalar<T> {
    Scalar::wrap(Expr::Aggregate { func, operand })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customers() -> Arc<Table> {
        Table::new("customers")
            .with_column("Id", ScalarKind::Int)
            .with_column("Name", ScalarKind::String)
            .into_ref()
    }

    #[test]
    fn test_clone_keeps_identity() {
        let id: Scalar<Int> = column(&customers(), "Id");
        assert_eq!(id.id(), id.clone().id());
    }

    #[test]
    fn test_comparison_yields_bool() {
        let t = customers();
        let id: Scalar<Int> = column(&t, "Id");
        let pred = id.gt(&Scalar::lit(18));
        assert_eq!(pred.node().kind(), ScalarKind::Bool);
    }

    #[test]
    fn test_arithmetic_operators() {
        let t = customers();
        let id: Scalar<Int> = column(&t, "Id");
        let sum = id.clone() + Scalar::lit(1);
        assert!(matches!(
            sum.node().as_ref(),
            Expr::Binary {
                op: BinaryOperator::Add,
                ..
            }
        ));
        let neg = -id;
        assert!(matches!(
            neg.node().as_ref(),
            Expr::Unary {
                op: UnaryOperator::Negate,
                ..
            }
        ));
    }

    #[test]
    fn test_widen() {
        let t = customers();
        let id: Scalar<Int> = column(&t, "Id");
        assert_eq!(id.widen().node().kind(), ScalarKind::Decimal);
    }

    #[test]
    fn test_in_values_converts_host_values() {
        let t = customers();
        let name: Scalar<Str> = column(&t, "Name");
        let pred = name.in_values(["a", "b"]);
        match pred.node().as_ref() {
            Expr::InValues { values, .. } => {
                assert_eq!(values, &vec![Value::from("a"), Value::from("b")]);
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_is_null_builds_null_comparison() {
        let t = customers();
        let name: Scalar<Str> = column(&t, "Name");
        match name.is_null().node().as_ref() {
            Expr::Compare { op, right, .. } => {
                assert_eq!(*op, CompareOperator::Eq);
                assert!(right.is_null());
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }
}

//! Expression AST - the scalar half of a query tree.
//!
//! Nodes are immutable and shared through [`ExprRef`]. The address of a shared
//! node is its identity ([`ExprId`]): an enclosing query that references a value
//! computed by an inner projection does so by holding the very same node, and
//! the compiler uses that identity to emit the projected alias instead of
//! recompiling the subtree.
//!
//! Every variant must be handled by the expression compiler - the Rust compiler
//! enforces this through exhaustive matching. Kind-correct construction is the
//! job of the typed facade in [`super::typed`].

use std::sync::Arc;

use super::query::{QueryNode, Table, TableId};
use super::value::{ScalarKind, Value};

/// Shared handle to an expression node.
pub type ExprRef = Arc<Expr>;

/// Identity of an expression node within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Identity of a shared node.
    pub fn of(expr: &ExprRef) -> Self {
        ExprId(Arc::as_ptr(expr) as *const () as usize)
    }
}

// =============================================================================
// Expression AST
// =============================================================================

/// A scalar expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Host value, always bound as a parameter.
    Literal(Value),

    /// Unary operation: op operand
    Unary {
        op: UnaryOperator,
        operand: ExprRef,
    },

    /// Binary operation within one kind: left op right
    Binary {
        op: BinaryOperator,
        left: ExprRef,
        right: ExprRef,
    },

    /// Column of a table instance.
    Column(ColumnRef),

    /// Named parameter supplied by the caller, emitted verbatim.
    Parameter { name: String, kind: ScalarKind },

    /// CASE WHEN cond THEN then ELSE otherwise END
    Case {
        cond: ExprRef,
        then: ExprRef,
        otherwise: ExprRef,
    },

    /// NULL of a given kind.
    Null(ScalarKind),

    /// Aggregate call; `operand` is `None` for `COUNT(*)`.
    Aggregate {
        func: AggregateFunc,
        operand: Option<ExprRef>,
    },

    /// Comparison of two same-kind operands.
    Compare {
        op: CompareOperator,
        left: ExprRef,
        right: ExprRef,
    },

    /// Implicit numeric conversion (e.g. int to decimal).
    Widen { to: ScalarKind, inner: ExprRef },

    /// value LIKE pattern
    Like { value: ExprRef, pattern: String },

    /// expr IN (v1, v2, ...)
    InValues { expr: ExprRef, values: Vec<Value> },

    /// expr IN (SELECT ...)
    InSubquery {
        expr: ExprRef,
        query: Arc<QueryNode>,
    },

    /// A one-column query used as a scalar, e.g. an aggregate over a whole query.
    Subquery {
        kind: ScalarKind,
        query: Arc<QueryNode>,
    },
}

/// Reference to a column of a table instance.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub table: Arc<Table>,
    pub name: String,
    pub kind: ScalarKind,
}

impl ColumnRef {
    /// Identity of the table instance this column belongs to.
    pub fn table_id(&self) -> TableId {
        TableId::of(&self.table)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // String
    Concat,
    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
        )
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// SQL function name.
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }

    /// Result kind for an operand of the given kind.
    pub fn result_kind(self, operand: Option<ScalarKind>) -> ScalarKind {
        match (self, operand) {
            (AggregateFunc::Count, _) => ScalarKind::Int,
            (AggregateFunc::Avg, _) => ScalarKind::Decimal,
            (_, Some(kind)) => kind,
            (_, None) => ScalarKind::Int,
        }
    }
}

impl Expr {
    /// The scalar kind this expression evaluates to.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Expr::Literal(v) => v.kind(),
            Expr::Unary { operand, .. } => operand.kind(),
            Expr::Binary { op, left, .. } => match op {
                BinaryOperator::Concat => ScalarKind::String,
                BinaryOperator::And | BinaryOperator::Or => ScalarKind::Bool,
                _ => left.kind(),
            },
            Expr::Column(c) => c.kind,
            Expr::Parameter { kind, .. } => *kind,
            Expr::Case { then, .. } => then.kind(),
            Expr::Null(kind) => *kind,
            Expr::Aggregate { func, operand } => {
                func.result_kind(operand.as_ref().map(|o| o.kind()))
            }
            Expr::Compare { .. }
            | Expr::Like { .. }
            | Expr::InValues { .. }
            | Expr::InSubquery { .. } => ScalarKind::Bool,
            Expr::Widen { to, .. } => *to,
            Expr::Subquery { kind, .. } => *kind,
        }
    }

    /// Whether an aggregate call appears in this expression.
    ///
    /// Subqueries are opaque: an aggregate inside them belongs to the subquery.
    pub fn contains_aggregate(&self) -> bool {
        self.contains_aggregate_except(&|_| false)
    }

    /// Like [`Expr::contains_aggregate`], but skips the subtrees for which
    /// `resolved` holds (values already computed by a derived table).
    pub fn contains_aggregate_except(&self, resolved: &dyn Fn(&ExprRef) -> bool) -> bool {
        let check = |e: &ExprRef| !resolved(e) && e.contains_aggregate_except(resolved);
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Literal(_)
            | Expr::Column(_)
            | Expr::Parameter { .. }
            | Expr::Null(_)
            | Expr::Subquery { .. } => false,
            Expr::Unary { operand, .. } => check(operand),
            Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
                check(left) || check(right)
            }
            Expr::Case {
                cond,
                then,
                otherwise,
            } => check(cond) || check(then) || check(otherwise),
            Expr::Widen { inner, .. } => check(inner),
            Expr::Like { value, .. } => check(value),
            Expr::InValues { expr, .. } | Expr::InSubquery { expr, .. } => check(expr),
        }
    }

    /// Whether this is a NULL node.
    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Null(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

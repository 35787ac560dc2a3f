//! Query tree - the relational half of a query.
//!
//! A [`QueryNode`] is one relational step over a source node. Trees are built
//! once (usually through the fluent [`Query`] wrapper), shared through
//! [`QueryRef`] and never mutated; compiling the same tree twice yields the same
//! SQL and bindings.
//!
//! Tables are static schema descriptors. Each `Arc<Table>` is one *table
//! instance*: a self-join uses two instances of the same descriptor, and the
//! compiler gives each instance its own alias.

use std::sync::Arc;

use super::expr::{AggregateFunc, ExprRef};
use super::typed::{Bool, Decimal, Int, Numeric, Scalar, SqlType};
use super::value::ScalarKind;

/// Shared handle to a query node.
pub type QueryRef = Arc<QueryNode>;

// =============================================================================
// Schema descriptors
// =============================================================================

/// A declared column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ScalarKind,
}

/// A table descriptor: name plus ordered column declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
        }
    }

    pub fn with_column(mut self, name: &str, kind: ScalarKind) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            kind,
        });
        self
    }

    /// Turn the descriptor into a table instance.
    pub fn into_ref(self) -> Arc<Table> {
        Arc::new(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Identity of a table instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

impl TableId {
    pub fn of(table: &Arc<Table>) -> Self {
        TableId(Arc::as_ptr(table) as usize)
    }
}

// =============================================================================
// Query tree
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// A projected value with an optional explicit output name.
#[derive(Debug, Clone)]
pub struct ProjectionItem {
    pub expr: ExprRef,
    pub alias: Option<String>,
}

impl ProjectionItem {
    /// Project a value under an inferred name.
    pub fn of<T>(value: &Scalar<T>) -> Self {
        Self {
            expr: value.expr(),
            alias: None,
        }
    }

    /// Project a value under an explicit name.
    pub fn named<T>(value: &Scalar<T>, alias: &str) -> Self {
        Self {
            expr: value.expr(),
            alias: Some(alias.into()),
        }
    }
}

impl<T> From<&Scalar<T>> for ProjectionItem {
    fn from(value: &Scalar<T>) -> Self {
        ProjectionItem::of(value)
    }
}

/// One relational step.
#[derive(Debug, Clone)]
pub enum QueryNode {
    /// Base table instance.
    From(Arc<Table>),

    /// Row filter.
    Where { source: QueryRef, predicate: ExprRef },

    /// Sort by `key`, making it the primary ordering.
    OrderBy {
        source: QueryRef,
        key: ExprRef,
        dir: SortDir,
    },

    /// Secondary ordering appended after existing keys.
    ThenBy {
        source: QueryRef,
        key: ExprRef,
        dir: SortDir,
    },

    /// Projection.
    Select {
        source: QueryRef,
        projection: Vec<ProjectionItem>,
    },

    GroupBy { source: QueryRef, keys: Vec<ExprRef> },

    /// Filter over groups.
    Having { source: QueryRef, predicate: ExprRef },

    /// `left JOIN right ON left_key = right_key`, then projected.
    Join {
        kind: JoinKind,
        left: QueryRef,
        right: QueryRef,
        left_key: ExprRef,
        right_key: ExprRef,
        projection: Vec<ProjectionItem>,
    },

    Distinct { source: QueryRef },

    /// Paging; `count` rows after skipping `offset`.
    Limit {
        source: QueryRef,
        count: u64,
        offset: u64,
    },

    SetOp {
        kind: SetOpKind,
        left: QueryRef,
        right: QueryRef,
    },

    /// A whole query reduced to one aggregate value.
    ///
    /// `selector` is the aggregated expression; `None` means `COUNT(*)`.
    Aggregate {
        func: AggregateFunc,
        source: QueryRef,
        selector: Option<ExprRef>,
    },
}

impl QueryNode {
    /// Short variant name, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            QueryNode::From(_) => "From",
            QueryNode::Where { .. } => "Where",
            QueryNode::OrderBy { .. } => "OrderBy",
            QueryNode::ThenBy { .. } => "ThenBy",
            QueryNode::Select { .. } => "Select",
            QueryNode::GroupBy { .. } => "GroupBy",
            QueryNode::Having { .. } => "Having",
            QueryNode::Join { .. } => "Join",
            QueryNode::Distinct { .. } => "Distinct",
            QueryNode::Limit { .. } => "Limit",
            QueryNode::SetOp { .. } => "SetOp",
            QueryNode::Aggregate { .. } => "Aggregate",
        }
    }

    /// Number of relational steps in the tree (subqueries inside expressions
    /// are not counted).
    pub fn depth(&self) -> usize {
        match self {
            QueryNode::From(_) => 1,
            QueryNode::Where { source, .. }
            | QueryNode::OrderBy { source, .. }
            | QueryNode::ThenBy { source, .. }
            | QueryNode::Select { source, .. }
            | QueryNode::GroupBy { source, .. }
            | QueryNode::Having { source, .. }
            | QueryNode::Distinct { source }
            | QueryNode::Limit { source, .. }
            | QueryNode::Aggregate { source, .. } => 1 + source.depth(),
            QueryNode::Join { left, right, .. } | QueryNode::SetOp { left, right, .. } => {
                1 + left.depth().max(right.depth())
            }
        }
    }
}

// =============================================================================
// Fluent wrapper
// =============================================================================

/// Fluent, immutable query builder.
///
/// Every method returns a new `Query` whose root node references `self`'s root.
///
/// ```ignore
/// let q = Query::from(&customers)
///     .filter(&age.gt(&Scalar::lit(18)))
///     .order_by(&name)
///     .select([ProjectionItem::of(&name)]);
/// ```
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct Query(QueryRef);

impl Query {
    /// Start from a table instance.
    pub fn from(table: &Arc<Table>) -> Self {
        Query(Arc::new(QueryNode::From(table.clone())))
    }

    /// Wrap an existing node.
    pub fn from_node(node: QueryRef) -> Self {
        Query(node)
    }

    pub fn node(&self) -> &QueryRef {
        &self.0
    }

    fn then(&self, node: QueryNode) -> Self {
        Query(Arc::new(node))
    }

    pub fn filter(&self, predicate: &Scalar<Bool>) -> Self {
        self.then(QueryNode::Where {
            source: self.0.clone(),
            predicate: predicate.expr(),
        })
    }

    pub fn order_by<T>(&self, key: &Scalar<T>) -> Self {
        self.sort(key, SortDir::Asc)
    }

    pub fn order_by_desc<T>(&self, key: &Scalar<T>) -> Self {
        self.sort(key, SortDir::Desc)
    }

    /// Primary ordering with an explicit direction.
    pub fn sort<T>(&self, key: &Scalar<T>, dir: SortDir) -> Self {
        self.then(QueryNode::OrderBy {
            source: self.0.clone(),
            key: key.expr(),
            dir,
        })
    }

    pub fn then_by<T>(&self, key: &Scalar<T>) -> Self {
        self.then_sort(key, SortDir::Asc)
    }

    pub fn then_by_desc<T>(&self, key: &Scalar<T>) -> Self {
        self.then_sort(key, SortDir::Desc)
    }

    /// Secondary ordering with an explicit direction.
    pub fn then_sort<T>(&self, key: &Scalar<T>, dir: SortDir) -> Self {
        self.then(QueryNode::ThenBy {
            source: self.0.clone(),
            key: key.expr(),
            dir,
        })
    }

    pub fn select(&self, projection: impl IntoIterator<Item = ProjectionItem>) -> Self {
        self.then(QueryNode::Select {
            source: self.0.clone(),
            projection: projection.into_iter().collect(),
        })
    }

    pub fn group_by(&self, keys: impl IntoIterator<Item = ExprRef>) -> Self {
        self.then(QueryNode::GroupBy {
            source: self.0.clone(),
            keys: keys.into_iter().collect(),
        })
    }

    pub fn having(&self, predicate: &Scalar<Bool>) -> Self {
        self.then(QueryNode::Having {
            source: self.0.clone(),
            predicate: predicate.expr(),
        })
    }

    /// Inner join on `left_key = right_key`.
    pub fn join<T: SqlType>(
        &self,
        right: &Query,
        left_key: &Scalar<T>,
        right_key: &Scalar<T>,
        projection: impl IntoIterator<Item = ProjectionItem>,
    ) -> Self {
        self.join_kind(JoinKind::Inner, right, left_key, right_key, projection)
    }

    /// Left outer join on `left_key = right_key`.
    pub fn left_join<T: SqlType>(
        &self,
        right: &Query,
        left_key: &Scalar<T>,
        right_key: &Scalar<T>,
        projection: impl IntoIterator<Item = ProjectionItem>,
    ) -> Self {
        self.join_kind(JoinKind::Left, right, left_key, right_key, projection)
    }

    fn join_kind<T: SqlType>(
        &self,
        kind: JoinKind,
        right: &Query,
        left_key: &Scalar<T>,
        right_key: &Scalar<T>,
        projection: impl IntoIterator<Item = ProjectionItem>,
    ) -> Self {
        self.then(QueryNode::Join {
            kind,
            left: self.0.clone(),
            right: right.0.clone(),
            left_key: left_key.expr(),
            right_key: right_key.expr(),
            projection: projection.into_iter().collect(),
        })
    }

    pub fn distinct(&self) -> Self {
        self.then(QueryNode::Distinct {
            source: self.0.clone(),
        })
    }

    pub fn limit(&self, count: u64) -> Self {
        self.page(count, 0)
    }

    /// `count` rows after skipping `offset`.
    pub fn page(&self, count: u64, offset: u64) -> Self {
        self.then(QueryNode::Limit {
            source: self.0.clone(),
            count,
            offset,
        })
    }

    fn set_op(&self, kind: SetOpKind, other: &Query) -> Self {
        self.then(QueryNode::SetOp {
            kind,
            left: self.0.clone(),
            right: other.0.clone(),
        })
    }

    pub fn union(&self, other: &Query) -> Self {
        self.set_op(SetOpKind::Union, other)
    }

    pub fn union_all(&self, other: &Query) -> Self {
        self.set_op(SetOpKind::UnionAll, other)
    }

    pub fn intersect(&self, other: &Query) -> Self {
        self.set_op(SetOpKind::Intersect, other)
    }

    pub fn except(&self, other: &Query) -> Self {
        self.set_op(SetOpKind::Except, other)
    }

    // -------------------------------------------------------------------------
    // Aggregate terminals
    // -------------------------------------------------------------------------

    /// The whole query reduced to one aggregate, as a query of one column.
    pub fn aggregate(&self, func: AggregateFunc, selector: Option<ExprRef>) -> Self {
        self.then(QueryNode::Aggregate {
            func,
            source: self.0.clone(),
            selector,
        })
    }

    /// Number of rows, as a scalar subquery.
    pub fn count(&self) -> Scalar<Int> {
        Scalar::subquery(&self.aggregate(AggregateFunc::Count, None))
    }

    pub fn sum<T: Numeric>(&self, selector: &Scalar<T>) -> Scalar<T> {
        Scalar::subquery(&self.aggregate(AggregateFunc::Sum, Some(selector.expr())))
    }

    pub fn avg<T: Numeric>(&self, selector: &Scalar<T>) -> Scalar<Decimal> {
        Scalar::subquery(&self.aggregate(AggregateFunc::Avg, Some(selector.expr())))
    }

    pub fn min<T: SqlType>(&self, selector: &Scalar<T>) -> Scalar<T> {
        Scalar::subquery(&self.aggregate(AggregateFunc::Min, Some(selector.expr())))
    }

    pub fn max<T: SqlType>(&self, selector: &Scalar<T>) -> Scalar<T> {
        Scalar::subquery(&self.aggregate(AggregateFunc::Max, Some(selector.expr())))
    }
}

impl From<Query> for QueryRef {
    fn from(query: Query) -> Self {
        query.0
    }
}

impl AsRef<QueryNode> for Query {
    fn as_ref(&self) -> &QueryNode {
        &self.0
    }
}

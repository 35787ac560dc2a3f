//! Compilation context.
//!
//! A [`Context`] is the immutable state threaded through every compile step.
//! Operations that allocate a parameter name or an alias consume the context and
//! return the name together with a new context; nothing is mutated behind the
//! caller's back and no counter lives outside the value.
//!
//! Within one top-level compile the chain is linear, so parameter names
//! (`prefix + "p" + count`) and aliases (`"a" + counter`) are unique by
//! construction.

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use super::dialect::DialectConfig;
use super::expr::{ExprId, ExprRef};
use super::query::TableId;
use super::token::TokenStream;
use super::value::Value;

// =============================================================================
// Bindings
// =============================================================================

/// Ordered parameter-name to value map.
///
/// Names are unique and appear in allocation order. Serializes as a map, ready
/// to hand to a parameterized-query API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// JSON object of the bindings, in allocation order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn push(&mut self, name: String, value: Value) {
        self.entries.push((name, value));
    }
}

impl Serialize for Bindings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// Context
// =============================================================================

/// Where an already-projected value can be referenced: `alias.field`.
#[derive(Debug, Clone)]
pub struct ProjectedField {
    pub alias: String,
    pub field: String,
    /// Keeps the node (and therefore its identity) alive while registered.
    node: Option<ExprRef>,
}

impl ProjectedField {
    pub fn new(alias: &str, field: &str) -> Self {
        Self {
            alias: alias.into(),
            field: field.into(),
            node: None,
        }
    }

    pub(crate) fn with_node(mut self, node: ExprRef) -> Self {
        self.node = Some(node);
        self
    }
}

impl PartialEq for ProjectedField {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && self.field == other.field
    }
}

/// Immutable compilation state.
#[derive(Debug, Clone)]
pub struct Context {
    dialect: Arc<DialectConfig>,
    bindings: Bindings,
    alias_counter: usize,
    projection_aliases: HashMap<ExprId, ProjectedField>,
    sources: HashMap<TableId, String>,
    key_fragments: HashMap<ExprId, TokenStream>,
}

impl Context {
    pub fn new(dialect: DialectConfig) -> Self {
        Self {
            dialect: Arc::new(dialect),
            bindings: Bindings::new(),
            alias_counter: 0,
            projection_aliases: HashMap::new(),
            sources: HashMap::new(),
            key_fragments: HashMap::new(),
        }
    }

    pub fn dialect(&self) -> &DialectConfig {
        &self.dialect
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }

    /// Bind `value` under a fresh parameter name.
    pub fn with_parameter(mut self, value: Value) -> (String, Self) {
        let name = format!("{}p{}", self.dialect.parameter_prefix, self.bindings.len());
        trace!(param = %name, "allocated parameter");
        self.bindings.push(name.clone(), value);
        (name, self)
    }

    /// A fresh table alias.
    pub fn with_alias(mut self) -> (String, Self) {
        let alias = format!("a{}", self.alias_counter);
        self.alias_counter += 1;
        trace!(alias = %alias, "allocated alias");
        (alias, self)
    }

    /// Where an enclosing statement already projected `expr`.
    pub fn projection_alias_of(&self, expr: &ExprRef) -> Option<&ProjectedField> {
        self.projection_aliases.get(&ExprId::of(expr))
    }

    pub fn with_projection_alias(mut self, expr: &ExprRef, field: ProjectedField) -> Self {
        self.projection_aliases
            .insert(ExprId::of(expr), field.with_node(expr.clone()));
        self
    }

    /// Whether `expr` is already computed by a derived table in scope.
    pub fn resolves(&self, expr: &ExprRef) -> bool {
        self.projection_aliases.contains_key(&ExprId::of(expr))
    }

    pub(crate) fn without_projection_alias(mut self, expr: &ExprRef) -> Self {
        self.projection_aliases.remove(&ExprId::of(expr));
        self
    }

    /// Make columns of `table` render as `alias.column`.
    pub fn bind_source(mut self, table: TableId, alias: &str) -> Self {
        self.sources.insert(table, alias.into());
        self
    }

    pub fn unbind_source(mut self, table: TableId) -> Self {
        self.sources.remove(&table);
        self
    }

    /// Alias bound to a table instance.
    pub fn source_alias(&self, table: TableId) -> Option<&str> {
        self.sources.get(&table).map(String::as_str)
    }

    /// Rendered fragment of a grouping key, reused verbatim by the projection
    /// and HAVING of the same statement.
    pub(crate) fn key_fragment(&self, expr: &ExprRef) -> Option<&TokenStream> {
        self.key_fragments.get(&ExprId::of(expr))
    }

    pub(crate) fn with_key_fragment(mut self, expr: &ExprRef, tokens: TokenStream) -> Self {
        self.key_fragments.insert(ExprId::of(expr), tokens);
        self
    }

    pub(crate) fn clear_key_fragments(mut self) -> Self {
        self.key_fragments.clear();
        self
    }

    /// Restore the name scope of `outer`, keeping this context's counter and
    /// bindings. Used when leaving a subquery.
    pub fn with_scope_of(self, outer: &Context) -> Self {
        Self {
            dialect: self.dialect,
            bindings: self.bindings,
            alias_counter: self.alias_counter,
            projection_aliases: outer.projection_aliases.clone(),
            sources: outer.sources.clone(),
            key_fragments: outer.key_fragments.clone(),
        }
    }
}

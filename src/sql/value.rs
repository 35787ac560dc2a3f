//! Scalar kinds and host values.
//!
//! Every literal in a query tree carries a [`Value`]. Values are never rendered
//! into SQL text; the compiler binds them to generated parameter names.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical kind of a scalar expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int,
    String,
    Decimal,
    DateTime,
    Guid,
}

impl ScalarKind {
    /// Whether arithmetic operators apply to this kind.
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Decimal)
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::String => "string",
            ScalarKind::Decimal => "decimal",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Guid => "guid",
        };
        f.write_str(name)
    }
}

/// A host value bound to a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl Value {
    /// The scalar kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Bool(_) => ScalarKind::Bool,
            Value::Int(_) => ScalarKind::Int,
            Value::String(_) => ScalarKind::String,
            Value::Decimal(_) => ScalarKind::Decimal,
            Value::DateTime(_) => ScalarKind::DateTime,
            Value::Guid(_) => ScalarKind::Guid,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Guid(id)
    }
}

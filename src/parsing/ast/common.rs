//! Shared AST pieces: literals, predicates, ordering

use serde::{Deserialize, Serialize};
use std::fmt;

/// An untyped literal value as written in source text. The validator turns
/// these into [`crate::types::TypedValue`]s against the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Unsigned integer literal, e.g. `95`.
    Nat(u64),
    /// Negative integer literal, e.g. `-7`.
    Int(i64),
    /// Float literal, e.g. `3.25` or `1e9`.
    Float(f64),
    Bool(bool),
    /// Single-quoted string literal, unescaped.
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nat(n) => write!(f, "{}", n),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Comparison operators usable in a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterOrEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// A single `column op literal` WHERE predicate. Boolean composition
/// (AND/OR/NOT) is deliberately not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Literal,
}

/// Sort direction in ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

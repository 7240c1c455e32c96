//! Typed runtime values
//!
//! A [`TypedValue`] always matches exactly one [`TypeExpr`] variant. There
//! is no implicit widening or coercion between variants: a plain `Str` is
//! never accepted where `NonEmptyString` is declared. The validator is the
//! only place where an untyped literal becomes a `TypedValue`, and it does
//! so through the refined constructors.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::data_type::TypeExpr;
use super::refined::{BoundedFloat, BoundedInt, BoundedNat, Confidence, NonEmptyString, PromptScores, Tracked};

/// A runtime value tagged by its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Nat(u64),
    Int(i64),
    Str(String),
    Bool(bool),
    Float(f64),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    BoundedNat(BoundedNat),
    BoundedInt(BoundedInt),
    BoundedFloat(BoundedFloat),
    NonEmpty(NonEmptyString),
    Confidence(Confidence),
    Vector(Vec<TypedValue>),
    Tracked(Box<Tracked<TypedValue>>),
    PromptScores(PromptScores),
}

impl TypedValue {
    /// True if this value's variant structurally matches the given type
    /// expression, including refinement parameters. Exact match only.
    pub fn matches(&self, ty: &TypeExpr) -> bool {
        match (self, ty) {
            (TypedValue::Nat(_), TypeExpr::Nat) => true,
            (TypedValue::Int(_), TypeExpr::Int) => true,
            (TypedValue::Str(_), TypeExpr::String) => true,
            (TypedValue::Bool(_), TypeExpr::Bool) => true,
            (TypedValue::Float(_), TypeExpr::Float) => true,
            (TypedValue::Uuid(_), TypeExpr::Uuid) => true,
            (TypedValue::Timestamp(_), TypeExpr::Timestamp) => true,
            (TypedValue::BoundedNat(b), TypeExpr::BoundedNat { min, max }) => {
                b.min() == *min && b.max() == *max
            }
            (TypedValue::BoundedInt(b), TypeExpr::BoundedInt { min, max }) => {
                b.min() == *min && b.max() == *max
            }
            (TypedValue::BoundedFloat(b), TypeExpr::BoundedFloat { min, max }) => {
                b.min() == *min && b.max() == *max
            }
            (TypedValue::NonEmpty(_), TypeExpr::NonEmptyString) => true,
            (TypedValue::Confidence(_), TypeExpr::Confidence) => true,
            (TypedValue::Vector(items), TypeExpr::Vector { elem, len }) => {
                items.len() as u64 == *len && items.iter().all(|item| item.matches(elem))
            }
            (TypedValue::Tracked(tracked), TypeExpr::Tracked(elem)) => {
                tracked.value().matches(elem)
            }
            (TypedValue::PromptScores(_), TypeExpr::PromptScores) => true,
            _ => false,
        }
    }

    /// A short name for the value's variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Nat(_) => "Nat",
            TypedValue::Int(_) => "Int",
            TypedValue::Str(_) => "String",
            TypedValue::Bool(_) => "Bool",
            TypedValue::Float(_) => "Float",
            TypedValue::Uuid(_) => "Uuid",
            TypedValue::Timestamp(_) => "Timestamp",
            TypedValue::BoundedNat(_) => "BoundedNat",
            TypedValue::BoundedInt(_) => "BoundedInt",
            TypedValue::BoundedFloat(_) => "BoundedFloat",
            TypedValue::NonEmpty(_) => "NonEmptyString",
            TypedValue::Confidence(_) => "Confidence",
            TypedValue::Vector(_) => "Vector",
            TypedValue::Tracked(_) => "Tracked",
            TypedValue::PromptScores(_) => "PromptScores",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Nat(n) => write!(f, "{}", n),
            TypedValue::Int(i) => write!(f, "{}", i),
            TypedValue::Str(s) => write!(f, "'{}'", s),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::Float(x) => write!(f, "{}", x),
            TypedValue::Uuid(u) => write!(f, "{}", u),
            TypedValue::Timestamp(ts) => write!(f, "{}", ts),
            TypedValue::BoundedNat(b) => write!(f, "{}", b.value()),
            TypedValue::BoundedInt(b) => write!(f, "{}", b.value()),
            TypedValue::BoundedFloat(b) => write!(f, "{}", b.value()),
            TypedValue::NonEmpty(s) => write!(f, "'{}'", s),
            TypedValue::Confidence(c) => write!(f, "{}", c.value()),
            TypedValue::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            TypedValue::Tracked(tracked) => {
                write!(f, "{} (by {})", tracked.value(), tracked.actor())
            }
            TypedValue::PromptScores(scores) => write!(f, "PROMPT:{}", scores.overall()),
        }
    }
}

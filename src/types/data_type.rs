//! EVQL type expressions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A type expression, as written in a column declaration or a `::`
/// annotation. Closed: every variant the language knows about is here,
/// and consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Nat,
    Int,
    String,
    Bool,
    Float,
    Uuid,
    Timestamp,
    /// Natural number in the inclusive range [min, max].
    BoundedNat { min: u64, max: u64 },
    /// Integer in the inclusive range [min, max].
    BoundedInt { min: i64, max: i64 },
    /// Float in the inclusive range [min, max].
    BoundedFloat { min: f64, max: f64 },
    NonEmptyString,
    /// Float in [0.0, 1.0].
    Confidence,
    /// Fixed-length vector of a single element type.
    Vector { elem: Box<TypeExpr>, len: u64 },
    /// A value carrying actor/rationale/timestamp provenance.
    Tracked(Box<TypeExpr>),
    /// Six-dimension PROMPT quality rubric with derived overall score.
    PromptScores,
}

impl TypeExpr {
    /// Builds a BoundedNat, rejecting min > max.
    pub fn bounded_nat(min: u64, max: u64) -> Result<TypeExpr> {
        if min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedNat {} {}: min must be <= max",
                min, max
            )));
        }
        Ok(TypeExpr::BoundedNat { min, max })
    }

    /// Builds a BoundedInt, rejecting min > max.
    pub fn bounded_int(min: i64, max: i64) -> Result<TypeExpr> {
        if min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedInt {} {}: min must be <= max",
                min, max
            )));
        }
        Ok(TypeExpr::BoundedInt { min, max })
    }

    /// Builds a BoundedFloat, rejecting min > max (and NaN bounds).
    pub fn bounded_float(min: f64, max: f64) -> Result<TypeExpr> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::InvalidTypeExpr(format!(
                "BoundedFloat {} {}: min must be <= max",
                min, max
            )));
        }
        Ok(TypeExpr::BoundedFloat { min, max })
    }

    /// The kind discriminant, used for permission checks.
    pub fn kind(&self) -> TypeExprKind {
        match self {
            TypeExpr::Nat => TypeExprKind::Nat,
            TypeExpr::Int => TypeExprKind::Int,
            TypeExpr::String => TypeExprKind::String,
            TypeExpr::Bool => TypeExprKind::Bool,
            TypeExpr::Float => TypeExprKind::Float,
            TypeExpr::Uuid => TypeExprKind::Uuid,
            TypeExpr::Timestamp => TypeExprKind::Timestamp,
            TypeExpr::BoundedNat { .. } => TypeExprKind::BoundedNat,
            TypeExpr::BoundedInt { .. } => TypeExprKind::BoundedInt,
            TypeExpr::BoundedFloat { .. } => TypeExprKind::BoundedFloat,
            TypeExpr::NonEmptyString => TypeExprKind::NonEmptyString,
            TypeExpr::Confidence => TypeExprKind::Confidence,
            TypeExpr::Vector { .. } => TypeExprKind::Vector,
            TypeExpr::Tracked(_) => TypeExprKind::Tracked,
            TypeExpr::PromptScores => TypeExprKind::PromptScores,
        }
    }

    /// True for types narrowed by a runtime-checked predicate.
    pub fn is_refined(&self) -> bool {
        matches!(
            self,
            TypeExpr::BoundedNat { .. }
                | TypeExpr::BoundedInt { .. }
                | TypeExpr::BoundedFloat { .. }
                | TypeExpr::NonEmptyString
                | TypeExpr::Confidence
                | TypeExpr::Tracked(_)
                | TypeExpr::PromptScores
        )
    }

    /// All kinds referenced by this type, including nested element types.
    pub fn referenced_kinds(&self, out: &mut std::collections::BTreeSet<TypeExprKind>) {
        out.insert(self.kind());
        match self {
            TypeExpr::Vector { elem, .. } => elem.referenced_kinds(out),
            TypeExpr::Tracked(elem) => elem.referenced_kinds(out),
            _ => {}
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Nat => write!(f, "Nat"),
            TypeExpr::Int => write!(f, "Int"),
            TypeExpr::String => write!(f, "String"),
            TypeExpr::Bool => write!(f, "Bool"),
            TypeExpr::Float => write!(f, "Float"),
            TypeExpr::Uuid => write!(f, "Uuid"),
            TypeExpr::Timestamp => write!(f, "Timestamp"),
            TypeExpr::BoundedNat { min, max } => write!(f, "BoundedNat {} {}", min, max),
            TypeExpr::BoundedInt { min, max } => write!(f, "BoundedInt {} {}", min, max),
            TypeExpr::BoundedFloat { min, max } => write!(f, "BoundedFloat {} {}", min, max),
            TypeExpr::NonEmptyString => write!(f, "NonEmptyString"),
            TypeExpr::Confidence => write!(f, "Confidence"),
            TypeExpr::Vector { elem, len } => write!(f, "Vector {} {}", elem, len),
            TypeExpr::Tracked(elem) => write!(f, "Tracked {}", elem),
            TypeExpr::PromptScores => write!(f, "PromptScores"),
        }
    }
}

/// Fieldless discriminant of [`TypeExpr`]. Orderable and hashable so it can
/// live in permission sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeExprKind {
    Nat,
    Int,
    String,
    Bool,
    Float,
    Uuid,
    Timestamp,
    BoundedNat,
    BoundedInt,
    BoundedFloat,
    NonEmptyString,
    Confidence,
    Vector,
    Tracked,
    PromptScores,
}

impl TypeExprKind {
    /// Inverse of Display, used when decoding permission sets.
    pub fn from_name(name: &str) -> Option<TypeExprKind> {
        Some(match name {
            "Nat" => TypeExprKind::Nat,
            "Int" => TypeExprKind::Int,
            "String" => TypeExprKind::String,
            "Bool" => TypeExprKind::Bool,
            "Float" => TypeExprKind::Float,
            "Uuid" => TypeExprKind::Uuid,
            "Timestamp" => TypeExprKind::Timestamp,
            "BoundedNat" => TypeExprKind::BoundedNat,
            "BoundedInt" => TypeExprKind::BoundedInt,
            "BoundedFloat" => TypeExprKind::BoundedFloat,
            "NonEmptyString" => TypeExprKind::NonEmptyString,
            "Confidence" => TypeExprKind::Confidence,
            "Vector" => TypeExprKind::Vector,
            "Tracked" => TypeExprKind::Tracked,
            "PromptScores" => TypeExprKind::PromptScores,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeExprKind::Nat => "Nat",
            TypeExprKind::Int => "Int",
            TypeExprKind::String => "String",
            TypeExprKind::Bool => "Bool",
            TypeExprKind::Float => "Float",
            TypeExprKind::Uuid => "Uuid",
            TypeExprKind::Timestamp => "Timestamp",
            TypeExprKind::BoundedNat => "BoundedNat",
            TypeExprKind::BoundedInt => "BoundedInt",
            TypeExprKind::BoundedFloat => "BoundedFloat",
            TypeExprKind::NonEmptyString => "NonEmptyString",
            TypeExprKind::Confidence => "Confidence",
            TypeExprKind::Vector => "Vector",
            TypeExprKind::Tracked => "Tracked",
            TypeExprKind::PromptScores => "PromptScores",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_nat_rejects_inverted_range() {
        assert!(TypeExpr::bounded_nat(10, 5).is_err());
        assert!(TypeExpr::bounded_nat(5, 5).is_ok());
    }

    #[test]
    fn bounded_float_rejects_nan_bounds() {
        assert!(TypeExpr::bounded_float(f64::NAN, 1.0).is_err());
        assert!(TypeExpr::bounded_float(0.0, 1.0).is_ok());
    }

    #[test]
    fn referenced_kinds_includes_nested() {
        let ty = TypeExpr::Tracked(Box::new(TypeExpr::BoundedNat { min: 0, max: 100 }));
        let mut kinds = std::collections::BTreeSet::new();
        ty.referenced_kinds(&mut kinds);
        assert!(kinds.contains(&TypeExprKind::Tracked));
        assert!(kinds.contains(&TypeExprKind::BoundedNat));
    }

    #[test]
    fn display_round_trips_through_name() {
        assert_eq!(
            TypeExpr::BoundedNat { min: 0, max: 100 }.to_string(),
            "BoundedNat 0 100"
        );
        assert_eq!(
            TypeExpr::Vector {
                elem: Box::new(TypeExpr::Float),
                len: 3
            }
            .to_string(),
            "Vector Float 3"
        );
    }
}

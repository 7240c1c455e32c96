//! Proof obligations
//!
//! A proof obligation is a named condition that must hold for a statement
//! to be considered safe. Bounds and non-emptiness are decidable and the
//! validator discharges them automatically; schema constraints and custom
//! predicates are surfaced unverified for external review.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A condition attached to a validated statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProofObligation {
    /// An integer value must lie in [min, max].
    BoundsCheck { min: i128, max: i128, value: i128 },
    /// A float value must lie in [min, max].
    FloatBoundsCheck { min: f64, max: f64, value: f64 },
    /// A string must be non-empty.
    NonEmpty { value: String },
    /// A schema-level constraint must hold for the referenced row.
    ConstraintCheck { schema_ref: String, row_ref: u64 },
    /// An arbitrary named predicate, checked externally.
    Custom { predicate_id: String },
}

impl fmt::Display for ProofObligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofObligation::BoundsCheck { min, max, value } => {
                write!(f, "bounds: {} <= {} <= {}", min, value, max)
            }
            ProofObligation::FloatBoundsCheck { min, max, value } => {
                write!(f, "bounds: {} <= {} <= {}", min, value, max)
            }
            ProofObligation::NonEmpty { value } => write!(f, "non-empty: '{}'", value),
            ProofObligation::ConstraintCheck { schema_ref, row_ref } => {
                write!(f, "constraint on {} row {}", schema_ref, row_ref)
            }
            ProofObligation::Custom { predicate_id } => write!(f, "predicate {}", predicate_id),
        }
    }
}

/// An obligation together with its discharge status. Embedded in the IR so
/// downstream consumers can audit what was proven and what was deferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationRecord {
    pub obligation: ProofObligation,
    /// Human-readable account of how the obligation was (or was not)
    /// discharged.
    pub evidence: String,
    pub verified: bool,
}

impl ObligationRecord {
    /// An obligation discharged automatically by the validator.
    pub fn verified(obligation: ProofObligation, evidence: impl Into<String>) -> Self {
        ObligationRecord {
            obligation,
            evidence: evidence.into(),
            verified: true,
        }
    }

    /// An obligation deferred to external review.
    pub fn unverified(obligation: ProofObligation, evidence: impl Into<String>) -> Self {
        ObligationRecord {
            obligation,
            evidence: evidence.into(),
            verified: false,
        }
    }
}

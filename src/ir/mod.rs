//! Intermediate representation
//!
//! The IR is the validated, permission-annotated form of a statement,
//! ready for execution or transport. IR values are immutable once produced
//! and never partially constructed: lowering either returns a complete
//! [`IrStatement`] or an error.

pub mod lower;

pub use lower::lower;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::semantic::obligation::ObligationRecord;
use crate::semantic::validated::ValidatedStatement;
use crate::types::data_type::TypeExprKind;

/// How thoroughly the statement was validated before lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// Full validation: schema constraints are surfaced as obligations.
    #[default]
    Strict,
    /// Decidable refinements only; constraint checking is deferred to the
    /// execution engine.
    Runtime,
}

/// The permission profile under which a statement is validated and
/// lowered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionMetadata {
    pub user_id: Uuid,
    pub role_id: String,
    pub validation_level: ValidationLevel,
    /// Type kinds this role may reference. Empty means unrestricted.
    pub allowed_types: BTreeSet<TypeExprKind>,
    /// When this profile was issued (seconds since epoch). Carried into
    /// the IR verbatim; lowering never reads the clock.
    pub timestamp: u64,
}

impl PermissionMetadata {
    /// An unrestricted profile, useful for trusted internal callers and
    /// tests.
    pub fn unrestricted(user_id: Uuid, role_id: impl Into<String>, timestamp: u64) -> Self {
        PermissionMetadata {
            user_id,
            role_id: role_id.into(),
            validation_level: ValidationLevel::default(),
            allowed_types: BTreeSet::new(),
            timestamp,
        }
    }

    /// Whether this profile may reference the given type kind.
    pub fn allows(&self, kind: TypeExprKind) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(&kind)
    }
}

/// A lowered statement: the validated statement, the permission profile it
/// was lowered under, the obligation ledger, and an opaque proof blob (the
/// canonical encoding of the obligations) for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrStatement {
    pub statement: ValidatedStatement,
    pub permissions: PermissionMetadata,
    pub obligations: Vec<ObligationRecord>,
    #[serde(with = "proof_blob_hex")]
    pub proof_blob: Vec<u8>,
}

impl IrStatement {
    /// True if every obligation was discharged.
    pub fn fully_verified(&self) -> bool {
        self.obligations.iter().all(|o| o.verified)
    }
}

/// The proof blob is raw bytes; JSON carries it hex-encoded so the debug
/// representation stays readable.
mod proof_blob_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        if hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length proof blob"));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| serde::de::Error::custom("invalid proof blob hex"))
            })
            .collect()
    }
}

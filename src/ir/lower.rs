//! Lowering: validated statement -> IR
//!
//! Lowering is deterministic and pure: the same validated statement and
//! permission profile always produce byte-identical IR. It reads no clock
//! and no global state.

use super::{IrStatement, PermissionMetadata};
use crate::codec::cbor;
use crate::error::{Error, Result};
use crate::semantic::obligation::ObligationRecord;
use crate::semantic::validated::ValidatedStatement;

/// Lowers a validated statement under the given permission profile.
///
/// Every type kind the statement references is checked against the
/// profile's allowed set (empty set means unrestricted). The obligation
/// ledger is embedded both structurally and as an opaque proof blob for
/// the audit trail.
pub fn lower(
    statement: ValidatedStatement,
    obligations: Vec<ObligationRecord>,
    permissions: &PermissionMetadata,
) -> Result<IrStatement> {
    for kind in statement.referenced_type_kinds() {
        if !permissions.allows(kind) {
            return Err(Error::PermissionDenied {
                type_kind: kind.to_string(),
                role: permissions.role_id.clone(),
            });
        }
    }

    let proof_blob = cbor::encode_obligations(&obligations);

    Ok(IrStatement {
        statement,
        permissions: permissions.clone(),
        obligations,
        proof_blob,
    })
}

//! Semantic analysis: schema validation and proof obligations

pub mod obligation;
pub mod validated;
pub mod validator;

pub use obligation::{ObligationRecord, ProofObligation};
pub use validated::{ValidatedColumn, ValidatedPredicate, ValidatedStatement};
pub use validator::validate;

//! EVQL: an evidence-oriented query language front end.
//!
//! EVQL compiles a small, constrained query dialect into a
//! permission-annotated intermediate representation. Every mutating
//! statement must carry a RATIONALE, every value passes through refined
//! types whose invariants are enforced by construction, and every
//! refinement check leaves a proof obligation in the output IR.
//!
//! The compilation pipeline:
//!
//! 1. [`parsing`]: lexer and recursive-descent parser, with a strict mode
//!    that requires explicit type declarations.
//! 2. [`semantic`]: validation against a [`registry`] schema snapshot,
//!    producing typed statements and an obligation ledger.
//! 3. [`ir`]: lowering into [`ir::IrStatement`] under a permission
//!    profile.
//! 4. [`codec`]: canonical binary and JSON serialization; untrusted
//!    decodes re-validate every refinement.
//!
//! [`pipeline::Pipeline`] wires the stages together; [`ffi`] exposes the
//! same path to C callers.

pub mod codec;
pub mod error;
pub mod ffi;
pub mod ir;
pub mod parsing;
pub mod pipeline;
pub mod registry;
pub mod semantic;
pub mod types;

pub use error::{Error, Result};
pub use ir::{IrStatement, PermissionMetadata, ValidationLevel};
pub use parsing::{parse_statement, ParseMode, Statement};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, SerializationFormat, Stage};
pub use registry::{SchemaRegistry, SchemaSnapshot};
pub use semantic::validate;

//! EVQL type system: type expressions, refined value types, typed runtime
//! values, and table schemas.

pub mod data_type;
pub mod refined;
pub mod schema;
pub mod value;

pub use data_type::{TypeExpr, TypeExprKind};
pub use refined::{
    ActorId, BoundedFloat, BoundedInt, BoundedNat, Confidence, NonEmptyString, PromptScores,
    Rationale, Tracked,
};
pub use schema::{Column, Constraint, NormalForm, Schema};
pub use value::TypedValue;

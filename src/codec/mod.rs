//! Statement serialization
//!
//! Two interchangeable surfaces over [`IrStatement`]: a canonical binary
//! codec with semantic tags for the refined types, and a JSON rendering
//! for logs and tooling. Both reject payloads that violate refinement
//! invariants; the binary codec skips re-validation only when the caller
//! opts in through [`cbor::decode_trusted`].

pub mod cbor;
pub mod json;

pub use cbor::{decode, decode_trusted, encode, encode_trusted};
pub use json::{from_json, to_json};

//! JSON serialization for IR statements
//!
//! A human-readable alternative to the binary codec, built on the serde
//! derives. Refined types deserialize through their raw shadows, so
//! [`from_json`] re-validates every invariant the same way an untrusted
//! binary decode does; there is no trusted fast path for JSON.

use crate::error::{Error, Result};
use crate::ir::IrStatement;

/// Renders an IR statement as pretty-printed JSON.
pub fn to_json(ir: &IrStatement) -> Result<String> {
    serde_json::to_string_pretty(ir).map_err(|e| Error::Codec(e.to_string()))
}

/// Parses an IR statement from JSON, re-running all refinement checks.
pub fn from_json(json: &str) -> Result<IrStatement> {
    serde_json::from_str(json).map_err(|e| Error::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_a_codec_error() {
        assert!(matches!(from_json("{not json"), Err(Error::Codec(_))));
        assert!(matches!(from_json("{}"), Err(Error::Codec(_))));
    }
}

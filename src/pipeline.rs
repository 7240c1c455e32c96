//! End-to-end query pipeline
//!
//! Runs a source string through every stage: lex, parse, validate against
//! a schema snapshot, lower into permission-checked IR, and encode. Stage
//! failures are wrapped in a [`PipelineError`] that names the stage and,
//! for positioned errors, carries the offending source line.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::codec;
use crate::error::Error;
use crate::ir::{self, IrStatement, PermissionMetadata};
use crate::parsing::{parse_statement, ParseMode};
use crate::registry::SchemaRegistry;
use crate::semantic::validate;

/// Output encoding for [`Pipeline::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerializationFormat {
    #[default]
    Cbor,
    Json,
}

/// Everything a pipeline needs besides the schema registry.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: ParseMode,
    pub permissions: PermissionMetadata,
    pub format: SerializationFormat,
}

impl PipelineConfig {
    /// Lenient parsing, unrestricted permissions, binary output.
    pub fn new(permissions: PermissionMetadata) -> Self {
        PipelineConfig {
            mode: ParseMode::default(),
            permissions,
            format: SerializationFormat::default(),
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }
}

/// The stage at which a pipeline run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Lex,
    Parse,
    Validate,
    Lower,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Validate => "validate",
            Stage::Lower => "lower",
            Stage::Encode => "encode",
        })
    }
}

/// A stage failure with enough context to report against the source text.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
    /// The source line the error points at, when the error is positioned.
    pub snippet: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl PipelineError {
    fn new(stage: Stage, source: Error, text: &str) -> Self {
        let position = match &source {
            Error::Lex { line, column, .. } => Some((*line, *column)),
            Error::ParseAt { line, column, .. } => Some((*line, *column)),
            _ => None,
        };
        let snippet = position
            .and_then(|(line, _)| text.lines().nth(line.saturating_sub(1) as usize))
            .map(str::to_string);
        PipelineError {
            stage,
            source,
            snippet,
            line: position.map(|(l, _)| l),
            column: position.map(|(_, c)| c),
        }
    }
}

/// The fully processed form of one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub ir: IrStatement,
    /// Encoded per the configured [`SerializationFormat`].
    pub encoded: Vec<u8>,
}

/// A configured pipeline bound to a schema registry.
pub struct Pipeline {
    config: PipelineConfig,
    registry: SchemaRegistry,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, registry: SchemaRegistry) -> Self {
        Pipeline { config, registry }
    }

    /// Processes one statement from source text to encoded IR.
    ///
    /// Each run validates against a point-in-time schema snapshot, so a
    /// concurrent registry update cannot change the rules mid-statement.
    pub fn run(&self, source: &str) -> Result<PipelineOutput, PipelineError> {
        let snapshot = self.registry.snapshot();
        debug!(
            mode = ?self.config.mode,
            schema_version = snapshot.version(),
            "pipeline run"
        );

        let statement = parse_statement(source, self.config.mode).map_err(|e| {
            let stage = match e {
                Error::Lex { .. } => Stage::Lex,
                _ => Stage::Parse,
            };
            warn!(%stage, error = %e, "statement rejected");
            PipelineError::new(stage, e, source)
        })?;
        debug!(
            kind = statement.kind_name(),
            table = statement.table(),
            justified = statement.rationale().is_some(),
            "parsed"
        );

        let (validated, obligations) =
            validate(&statement, &snapshot, &self.config.permissions).map_err(|e| {
                warn!(error = %e, "validation failed");
                PipelineError::new(Stage::Validate, e, source)
            })?;
        debug!(
            kind = validated.kind_name(),
            obligations = obligations.len(),
            "validated"
        );

        let ir = ir::lower(validated, obligations, &self.config.permissions)
            .map_err(|e| {
                warn!(error = %e, "lowering failed");
                PipelineError::new(Stage::Lower, e, source)
            })?;

        let encoded = match self.config.format {
            SerializationFormat::Cbor => codec::encode(&ir),
            SerializationFormat::Json => codec::to_json(&ir)
                .map_err(|e| PipelineError::new(Stage::Encode, e, source))?
                .into_bytes(),
        };
        debug!(bytes = encoded.len(), verified = ir.fully_verified(), "encoded");

        Ok(PipelineOutput { ir, encoded })
    }
}

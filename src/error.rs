//! Error types for the EVQL front end

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lexer errors
    #[error("Lex error at {line}:{column}: {message}")]
    Lex {
        line: u32,
        column: u32,
        message: String,
    },

    // Parser errors
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Parse error at {line}:{column}: expected {expected}, found {found}")]
    ParseAt {
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },

    #[error("{0} statement requires a RATIONALE clause")]
    MissingRationale(&'static str),

    #[error("DELETE statement requires a WHERE clause")]
    MissingWhereOnDelete,

    #[error("Invalid type expression: {0}")]
    InvalidTypeExpr(String),

    // Validation errors
    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Column {column} not found in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Type mismatch on column {column}: expected {expected}, found {actual} ({suggestion})")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
        suggestion: String,
    },

    #[error("Value {value} outside bounds [{min}, {max}]")]
    BoundsViolation { min: i128, max: i128, value: i128 },

    #[error("Value {value} outside float bounds [{min}, {max}]")]
    FloatBoundsViolation { min: f64, max: f64, value: f64 },

    #[error("Empty string not allowed: {0}")]
    EmptyStringViolation(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // Lowering errors
    #[error("Permission denied: role {role} may not reference type {type_kind}")]
    PermissionDenied { type_kind: String, role: String },

    // Codec errors
    #[error("Codec error: {0}")]
    Codec(String),
}

impl Error {
    /// Located parse error with an expected/found pair.
    pub fn parse_at(
        line: u32,
        column: u32,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::ParseAt {
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

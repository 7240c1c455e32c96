//! Parsing: lexer, AST, and the statement parser

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Statement;
pub use lexer::{tokenize, Keyword, Lexer, Token, TokenKind, TypeKeyword};
pub use parser::Parser;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How much the parser demands of column declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// Explicit `name : Type` declarations required in INSERT column lists.
    Strict,
    /// Bare column names allowed; types inferred from literal values and
    /// checked against the schema.
    #[default]
    Lenient,
}

/// Lexes and parses a single statement in the given mode.
pub fn parse_statement(source: &str, mode: ParseMode) -> Result<Statement> {
    let tokens = tokenize(source)?;
    Parser::parse(tokens, mode)
}

//! The EVQL statement parser
//!
//! The parser walks a token stream produced by the lexer and builds a
//! [`Statement`]. It only ensures the syntax is well-formed; whether a
//! table or column exists, and whether values satisfy the declared
//! refinement types, is the validator's job.
//!
//! The grammar-specific logic is split across traits, one per concern,
//! all layered over [`TokenHelper`]:
//!
//! - [`TypeParser`] — the refinement-type sub-grammar
//! - [`LiteralParser`] — literal values
//! - [`DmlParser`] — the four statement forms

mod dml_parser;
mod literal_parser;
mod token_helper;
mod type_parser;

pub use dml_parser::DmlParser;
pub use literal_parser::LiteralParser;
pub use token_helper::TokenHelper;
pub use type_parser::TypeParser;

use super::lexer::{Keyword, Token, TokenKind};
use super::ParseMode;
use crate::error::{Error, Result};
use crate::parsing::ast::Statement;

/// Cursor-based parser over a lexed token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    mode: ParseMode,
}

impl Parser {
    /// Parses a single statement from the given tokens. The entire stream
    /// must be consumed, up to an optional trailing semicolon.
    pub fn parse(tokens: Vec<Token>, mode: ParseMode) -> Result<Statement> {
        let mut parser = Parser::new(tokens, mode);
        let statement = parser.parse_statement()?;
        parser.skip(TokenKind::Semicolon);
        if parser.peek().kind != TokenKind::Eof {
            return Err(parser.err_expected("end of statement"));
        }
        Ok(statement)
    }

    fn new(mut tokens: Vec<Token>, mode: ParseMode) -> Self {
        // The lexer always terminates the stream with Eof; guarantee it
        // here as well so peek() is total even for hand-built streams.
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column))
                .unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Parser {
            tokens,
            pos: 0,
            mode,
        }
    }

    /// Dispatches on the leading keyword.
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Select) => self.parse_select(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Eof => Err(Error::Parse("empty statement".into())),
            _ => Err(self.err_expected("INSERT, SELECT, UPDATE or DELETE")),
        }
    }
}

impl TokenHelper for Parser {
    fn pos(&self) -> usize {
        self.pos
    }

    fn mode(&self) -> ParseMode {
        self.mode
    }

    fn peek(&self) -> &Token {
        // The stream is never empty and always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }
}

impl TypeParser for Parser {}
impl LiteralParser for Parser {}
impl DmlParser for Parser {}

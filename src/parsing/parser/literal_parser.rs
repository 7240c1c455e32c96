//! Literal sub-parser

use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::ast::Literal;
use crate::parsing::lexer::{Keyword, TokenKind};

pub trait LiteralParser: TokenHelper {
    /// Parses a single literal value.
    fn parse_literal(&mut self) -> Result<Literal> {
        match self.peek().kind {
            TokenKind::Nat => {
                let token = self.advance();
                let value = token
                    .lexeme
                    .parse::<u64>()
                    .map_err(|e| Error::Parse(format!("invalid natural number: {}", e)))?;
                Ok(Literal::Nat(value))
            }
            TokenKind::Int => {
                let token = self.advance();
                let value = token
                    .lexeme
                    .parse::<i64>()
                    .map_err(|e| Error::Parse(format!("invalid integer: {}", e)))?;
                Ok(Literal::Int(value))
            }
            TokenKind::Float => {
                let token = self.advance();
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|e| Error::Parse(format!("invalid float: {}", e)))?;
                Ok(Literal::Float(value))
            }
            TokenKind::Str => Ok(Literal::Str(self.advance().lexeme)),
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Literal::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Literal::Bool(false))
            }
            _ => Err(self.err_expected("literal")),
        }
    }
}

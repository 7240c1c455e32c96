//! Token navigation and combinator primitives
//!
//! The base trait every sub-parser extends. Besides single-token
//! navigation it provides the generic combinators (`optional`, `many`,
//! `many1`, `sep_by`). All of them terminate: a sub-parser that fails
//! without consuming input ends the repetition instead of looping.

use crate::error::{Error, Result};
use crate::parsing::lexer::{Token, TokenKind};
use crate::parsing::ParseMode;

pub trait TokenHelper {
    /// Current cursor position in the token stream. Used by the repetition
    /// combinators to detect input consumption.
    fn pos(&self) -> usize;

    /// The parse mode this parser was configured with.
    fn mode(&self) -> ParseMode;

    /// Peeks the next token without consuming it. The stream always ends
    /// with an Eof token, so this never runs off the end.
    fn peek(&self) -> &Token;

    /// Consumes and returns the next token. At the end of input this keeps
    /// returning the Eof token.
    fn advance(&mut self) -> Token;

    /// An "expected X, found Y" error located at the next token.
    fn err_expected(&self, expected: impl Into<String>) -> Error {
        let found = self.peek();
        Error::parse_at(found.line, found.column, expected, found.to_string())
    }

    /// Consumes the next token if its kind matches, or errors.
    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.err_expected(describe_kind(kind)))
        }
    }

    /// Consumes the next token if its kind matches, returning whether it did.
    fn next_is(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the next token if it is the given kind. Equivalent to
    /// next_is(), but expresses intent better.
    fn skip(&mut self, kind: TokenKind) {
        self.next_is(kind);
    }

    /// Consumes the next token and returns its lexeme if it is an
    /// identifier, or errors.
    fn next_ident(&mut self) -> Result<String> {
        if self.peek().kind == TokenKind::Ident {
            Ok(self.advance().lexeme)
        } else {
            Err(self.err_expected("identifier"))
        }
    }

    /// Runs the sub-parser, backtracking to the starting position if it
    /// fails without having consumed input. A failure that did consume
    /// input is a real syntax error and propagates.
    fn optional<T>(&mut self, mut p: impl FnMut(&mut Self) -> Result<T>) -> Result<Option<T>>
    where
        Self: Sized,
    {
        let start = self.pos();
        match p(self) {
            Ok(value) => Ok(Some(value)),
            Err(_) if self.pos() == start => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Zero or more occurrences of the sub-parser. Stops at the first
    /// failure that consumed no input; a partial parse propagates its
    /// error so malformed trailing input is not silently dropped.
    fn many<T>(&mut self, mut p: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        loop {
            let start = self.pos();
            match p(self) {
                Ok(item) => {
                    // A sub-parser that succeeds without consuming input
                    // would never terminate; treat it as completion.
                    if self.pos() == start {
                        return Ok(items);
                    }
                    items.push(item);
                }
                Err(_) if self.pos() == start => return Ok(items),
                Err(e) => return Err(e),
            }
        }
    }

    /// One or more occurrences of the sub-parser.
    fn many1<T>(&mut self, mut p: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        let first = p(self)?;
        let mut rest = self.many(p)?;
        rest.insert(0, first);
        Ok(rest)
    }

    /// One or more occurrences of the sub-parser separated by the given
    /// token. After a consumed separator the sub-parser must succeed.
    fn sep_by<T>(
        &mut self,
        separator: TokenKind,
        mut p: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        let mut items = vec![p(self)?];
        while self.next_is(separator) {
            items.push(p(self)?);
        }
        Ok(items)
    }
}

/// Human-readable name of a token kind, for expected/found messages.
pub fn describe_kind(kind: TokenKind) -> String {
    match kind {
        TokenKind::Keyword(kw) => kw.to_string(),
        TokenKind::TypeName(kw) => kw.to_string(),
        TokenKind::Ident => "identifier".into(),
        TokenKind::Nat => "natural number".into(),
        TokenKind::Int => "integer".into(),
        TokenKind::Float => "float".into(),
        TokenKind::Str => "string literal".into(),
        TokenKind::Equal => "=".into(),
        TokenKind::LessThan => "<".into(),
        TokenKind::GreaterThan => ">".into(),
        TokenKind::LessOrEqual => "<=".into(),
        TokenKind::GreaterOrEqual => ">=".into(),
        TokenKind::NotEqual => "!=".into(),
        TokenKind::DoubleColon => "::".into(),
        TokenKind::Colon => ":".into(),
        TokenKind::OpenParen => "(".into(),
        TokenKind::CloseParen => ")".into(),
        TokenKind::Comma => ",".into(),
        TokenKind::Semicolon => ";".into(),
        TokenKind::Asterisk => "*".into(),
        TokenKind::Eof => "end of input".into(),
    }
}

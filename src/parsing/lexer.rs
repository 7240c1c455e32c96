//! Lexer for EVQL source text
//!
//! A hand-written scanner producing a flat `Vec<Token>`. Each token carries
//! its lexeme and a 1-based line/column for error reporting.
//!
//! SQL-style keywords (INSERT, SELECT, WHERE, ...) match case-insensitively.
//! Type names (Nat, BoundedNat, PromptScores, ...) match case-sensitively;
//! a miscased type name lexes as a plain identifier and fails later in the
//! type-expression parser with a better message.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{Error, Result};

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The token's text. For string literals this is the unescaped contents.
    pub lexeme: String,
    /// 1-based line of the first character.
    pub line: u32,
    /// 1-based column of the first character.
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "'{}'", self.lexeme),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

/// Every possible token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// SQL keyword (case-insensitive).
    Keyword(Keyword),
    /// Refinement/scalar type name (case-sensitive).
    TypeName(TypeKeyword),
    /// Identifier (XID_Start followed by XID_Continue*).
    Ident,
    /// Unsigned integer literal.
    Nat,
    /// Negative integer literal.
    Int,
    /// Float literal.
    Float,
    /// Single-quoted string literal.
    Str,
    // Operators
    Equal,          // =
    LessThan,       // <
    GreaterThan,    // >
    LessOrEqual,    // <=
    GreaterOrEqual, // >=
    NotEqual,       // !=
    DoubleColon,    // ::
    Colon,          // :
    // Punctuation
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Asterisk,
    /// End of input. Always the last token in the stream.
    Eof,
}

/// SQL-style statement keywords. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Insert,
    Into,
    Values,
    Rationale,
    Actor,
    Select,
    From,
    Where,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Update,
    Set,
    Delete,
    As,
    True,
    False,
}

impl Keyword {
    fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_ascii_uppercase().as_str() {
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "RATIONALE" => Keyword::Rationale,
            "ACTOR" => Keyword::Actor,
            "SELECT" => Keyword::Select,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "AS" => Keyword::As,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            _ => return None,
        })
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Rationale => "RATIONALE",
            Keyword::Actor => "ACTOR",
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Limit => "LIMIT",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::As => "AS",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
        };
        write!(f, "{}", name)
    }
}

/// Type-expression keywords. Matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Nat,
    Int,
    String,
    Bool,
    Float,
    Uuid,
    Timestamp,
    BoundedNat,
    BoundedInt,
    BoundedFloat,
    NonEmptyString,
    Confidence,
    PromptScores,
    Vector,
    Tracked,
}

impl TypeKeyword {
    fn from_str(ident: &str) -> Option<TypeKeyword> {
        Some(match ident {
            "Nat" => TypeKeyword::Nat,
            "Int" => TypeKeyword::Int,
            "String" => TypeKeyword::String,
            "Bool" => TypeKeyword::Bool,
            "Float" => TypeKeyword::Float,
            "Uuid" => TypeKeyword::Uuid,
            "Timestamp" => TypeKeyword::Timestamp,
            "BoundedNat" => TypeKeyword::BoundedNat,
            "BoundedInt" => TypeKeyword::BoundedInt,
            "BoundedFloat" => TypeKeyword::BoundedFloat,
            "NonEmptyString" => TypeKeyword::NonEmptyString,
            "Confidence" => TypeKeyword::Confidence,
            "PromptScores" => TypeKeyword::PromptScores,
            "Vector" => TypeKeyword::Vector,
            "Tracked" => TypeKeyword::Tracked,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKeyword::Nat => "Nat",
            TypeKeyword::Int => "Int",
            TypeKeyword::String => "String",
            TypeKeyword::Bool => "Bool",
            TypeKeyword::Float => "Float",
            TypeKeyword::Uuid => "Uuid",
            TypeKeyword::Timestamp => "Timestamp",
            TypeKeyword::BoundedNat => "BoundedNat",
            TypeKeyword::BoundedInt => "BoundedInt",
            TypeKeyword::BoundedFloat => "BoundedFloat",
            TypeKeyword::NonEmptyString => "NonEmptyString",
            TypeKeyword::Confidence => "Confidence",
            TypeKeyword::PromptScores => "PromptScores",
            TypeKeyword::Vector => "Vector",
            TypeKeyword::Tracked => "Tracked",
        };
        write!(f, "{}", name)
    }
}

/// Tokenizes an entire source string.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Lexer state over a source string.
pub struct Lexer<'src> {
    chars: Peekable<Chars<'src>>,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source. The last token is always Eof.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Lex {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    /// Consumes the next character, tracking line/column.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consumes the next character if it equals `expected`.
    fn next_is(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips whitespace, `--` line comments and `/* */` block comments.
    /// An unterminated block comment is a lex error, but a lone `-` is
    /// left in place for the number scanner.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') => {
                    // Only a comment if followed by a second '-'.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() != Some(&'-') {
                        return Ok(());
                    }
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() != Some(&'*') {
                        return Ok(());
                    }
                    self.advance(); // '/'
                    self.advance(); // '*'
                    loop {
                        match self.advance() {
                            Some('*') if self.next_is('/') => break,
                            Some(_) => {}
                            None => return Err(self.err("unterminated block comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let line = self.line;
        let column = self.column;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, "", line, column)),
        };

        if c == '\'' {
            return self.scan_string(line, column);
        }
        if c.is_ascii_digit() {
            return self.scan_number(false, line, column);
        }
        if c == '-' {
            self.advance();
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.scan_number(true, line, column);
            }
            return Err(self.err("unexpected character '-'"));
        }
        if unicode_ident::is_xid_start(c) || c == '_' {
            return Ok(self.scan_ident(line, column));
        }

        self.advance();
        let kind = match c {
            '=' => TokenKind::Equal,
            '<' if self.next_is('=') => TokenKind::LessOrEqual,
            '<' => TokenKind::LessThan,
            '>' if self.next_is('=') => TokenKind::GreaterOrEqual,
            '>' => TokenKind::GreaterThan,
            '!' if self.next_is('=') => TokenKind::NotEqual,
            ':' if self.next_is(':') => TokenKind::DoubleColon,
            ':' => TokenKind::Colon,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Asterisk,
            other => {
                return Err(Error::Lex {
                    line,
                    column,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        let lexeme = match kind {
            TokenKind::LessOrEqual => "<=".to_string(),
            TokenKind::GreaterOrEqual => ">=".to_string(),
            TokenKind::NotEqual => "!=".to_string(),
            TokenKind::DoubleColon => "::".to_string(),
            _ => c.to_string(),
        };
        Ok(Token::new(kind, lexeme, line, column))
    }

    /// Scans a single-quoted string literal. Supports \' \\ \n \t escapes.
    fn scan_string(&mut self, line: u32, column: u32) -> Result<Token> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\'') => return Ok(Token::new(TokenKind::Str, value, line, column)),
                Some('\\') => match self.advance() {
                    Some('\'') => value.push('\''),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        return Err(Error::Lex {
                            line,
                            column,
                            message: format!("unknown escape sequence '\\{}'", other),
                        })
                    }
                    None => {
                        return Err(Error::Lex {
                            line,
                            column,
                            message: "unterminated string literal".into(),
                        })
                    }
                },
                Some(c) => value.push(c),
                None => {
                    return Err(Error::Lex {
                        line,
                        column,
                        message: "unterminated string literal".into(),
                    })
                }
            }
        }
    }

    /// Scans a numeric literal: nat, negative int, or float (with optional
    /// exponent). The leading '-', if any, was already consumed.
    fn scan_number(&mut self, negative: bool, line: u32, column: u32) -> Result<Token> {
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push(self.advance().unwrap());
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err("expected digit after decimal point"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            text.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.advance().unwrap());
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err("expected digit in exponent"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else if negative {
            TokenKind::Int
        } else {
            TokenKind::Nat
        };
        Ok(Token::new(kind, text, line, column))
    }

    /// Scans an identifier, then classifies it as a type name (exact match),
    /// a SQL keyword (case-insensitive match) or a plain identifier.
    fn scan_ident(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        text.push(self.advance().unwrap());
        while self
            .peek()
            .is_some_and(|c| unicode_ident::is_xid_continue(c) || c == '_')
        {
            text.push(self.advance().unwrap());
        }

        if let Some(type_kw) = TypeKeyword::from_str(&text) {
            return Token::new(TokenKind::TypeName(type_kw), text, line, column);
        }
        if let Some(keyword) = Keyword::from_str(&text) {
            return Token::new(TokenKind::Keyword(keyword), text, line, column);
        }
        Token::new(TokenKind::Ident, text, line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("select SELECT SeLeCt"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn type_names_are_case_sensitive() {
        let tokens = tokenize("BoundedNat boundednat").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::TypeName(TypeKeyword::BoundedNat));
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("42 -7 3.25 1e9"),
            vec![
                TokenKind::Nat,
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = tokenize(r"'it\'s \n here'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "it's \n here");
    }

    #[test]
    fn unterminated_string_is_error() {
        assert!(matches!(tokenize("'oops"), Err(Error::Lex { .. })));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("SELECT -- trailing\n /* block\n comment */ *"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Asterisk,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_does_not_swallow_negative_number() {
        assert_eq!(kinds("-5"), vec![TokenKind::Int, TokenKind::Eof]);
        assert_eq!(kinds("--5\n7"), vec![TokenKind::Nat, TokenKind::Eof]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("= < > <= >= != :: :"),
            vec![
                TokenKind::Equal,
                TokenKind::LessThan,
                TokenKind::GreaterThan,
                TokenKind::LessOrEqual,
                TokenKind::GreaterOrEqual,
                TokenKind::NotEqual,
                TokenKind::DoubleColon,
                TokenKind::Colon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unicode_identifiers() {
        let tokens = tokenize("données_2024").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lexeme, "données_2024");
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = tokenize("SELECT *\nFROM evidence").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 8));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 1));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 6));
    }

    #[test]
    fn stray_character_is_error() {
        let err = tokenize("SELECT #").unwrap_err();
        assert!(matches!(err, Error::Lex { column: 8, .. }));
    }
}

//! Statement parsing: INSERT, SELECT, UPDATE, DELETE
//!
//! The safety rules live here rather than in the validator: a missing
//! RATIONALE on any mutating statement and a missing WHERE on DELETE are
//! parse errors, so no unsafe statement ever reaches later stages.

use super::literal_parser::LiteralParser;
use super::token_helper::TokenHelper;
use super::type_parser::TypeParser;
use crate::error::{Error, Result};
use crate::parsing::ast::{
    Assignment, ColumnDecl, CompareOp, DeleteStatement, Direction, InsertStatement, Literal,
    OrderBy, Predicate, SelectList, SelectStatement, Statement, UpdateStatement,
};
use crate::parsing::lexer::{Keyword, TokenKind};
use crate::parsing::ParseMode;
use crate::types::refined::{ActorId, Rationale};

pub trait DmlParser: TokenHelper + TypeParser + LiteralParser + Sized {
    /// Parses an INSERT statement.
    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword(Keyword::Insert))?;
        self.expect(TokenKind::Keyword(Keyword::Into))?;
        let table = self.next_ident()?;

        self.expect(TokenKind::OpenParen)?;
        let columns = self.sep_by(TokenKind::Comma, |p| p.parse_column_decl())?;
        self.expect(TokenKind::CloseParen)?;

        self.expect(TokenKind::Keyword(Keyword::Values))?;
        let rows = self.sep_by(TokenKind::Comma, |p| p.parse_values_row())?;

        for row in &rows {
            if row.len() != columns.len() {
                return Err(Error::Parse(format!(
                    "INSERT row has {} values but {} columns were named",
                    row.len(),
                    columns.len()
                )));
            }
        }

        let rationale = self.parse_rationale("INSERT")?;
        let actor = if self.next_is(TokenKind::Keyword(Keyword::Actor)) {
            Some(self.parse_provenance_string("ACTOR")?)
        } else {
            None
        };

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            rows,
            rationale,
            actor,
        }))
    }

    /// One column in an INSERT column list. Strict mode requires the
    /// explicit `name : Type` form; lenient mode accepts a bare name.
    fn parse_column_decl(&mut self) -> Result<ColumnDecl> {
        let name = self.next_ident()?;
        let datatype = match self.mode() {
            ParseMode::Strict => {
                if !self.next_is(TokenKind::Colon) {
                    return Err(self.err_expected(format!(
                        "':' with a type declaration for column {} (strict mode)",
                        name
                    )));
                }
                Some(self.parse_type()?)
            }
            ParseMode::Lenient => {
                if self.next_is(TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                }
            }
        };
        Ok(ColumnDecl { name, datatype })
    }

    /// One parenthesized VALUES row.
    fn parse_values_row(&mut self) -> Result<Vec<Literal>> {
        self.expect(TokenKind::OpenParen)?;
        let row = self.sep_by(TokenKind::Comma, |p| p.parse_literal())?;
        self.expect(TokenKind::CloseParen)?;
        Ok(row)
    }

    /// Parses a SELECT statement.
    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword(Keyword::Select))?;

        let select = if self.next_is(TokenKind::Asterisk) {
            SelectList::All
        } else {
            SelectList::Columns(self.sep_by(TokenKind::Comma, |p| p.next_ident())?)
        };

        let returning_refinement = if self.next_is(TokenKind::DoubleColon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::Keyword(Keyword::From))?;
        let from = self.next_ident()?;
        let alias = if self.next_is(TokenKind::Keyword(Keyword::As)) {
            Some(self.next_ident()?)
        } else {
            None
        };

        let r#where = self.parse_where_clause()?;
        let order_by = self.parse_order_by_clause()?;
        let limit = self.parse_limit_clause()?;

        Ok(Statement::Select(SelectStatement {
            select,
            from,
            alias,
            r#where,
            order_by,
            limit,
            returning_refinement,
        }))
    }

    /// Parses an UPDATE statement.
    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword(Keyword::Update))?;
        let table = self.next_ident()?;
        self.expect(TokenKind::Keyword(Keyword::Set))?;
        let assignments = self.sep_by(TokenKind::Comma, |p| {
            let column = p.next_ident()?;
            p.expect(TokenKind::Equal)?;
            let value = p.parse_literal()?;
            Ok(Assignment { column, value })
        })?;
        let r#where = self.parse_where_clause()?;
        let rationale = self.parse_rationale("UPDATE")?;

        Ok(Statement::Update(UpdateStatement {
            table,
            assignments,
            r#where,
            rationale,
        }))
    }

    /// Parses a DELETE statement. WHERE is mandatory.
    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Keyword(Keyword::Delete))?;
        self.expect(TokenKind::Keyword(Keyword::From))?;
        let table = self.next_ident()?;

        let r#where = match self.parse_where_clause()? {
            Some(predicate) => predicate,
            None => return Err(Error::MissingWhereOnDelete),
        };
        let rationale = self.parse_rationale("DELETE")?;

        Ok(Statement::Delete(DeleteStatement {
            table,
            r#where,
            rationale,
        }))
    }

    /// Optional single-predicate WHERE clause.
    fn parse_where_clause(&mut self) -> Result<Option<Predicate>> {
        if !self.next_is(TokenKind::Keyword(Keyword::Where)) {
            return Ok(None);
        }
        let column = self.next_ident()?;
        let op = self.parse_compare_op()?;
        let value = self.parse_literal()?;
        Ok(Some(Predicate { column, op, value }))
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.peek().kind {
            TokenKind::Equal => CompareOp::Equal,
            TokenKind::NotEqual => CompareOp::NotEqual,
            TokenKind::LessThan => CompareOp::LessThan,
            TokenKind::LessOrEqual => CompareOp::LessOrEqual,
            TokenKind::GreaterThan => CompareOp::GreaterThan,
            TokenKind::GreaterOrEqual => CompareOp::GreaterOrEqual,
            _ => return Err(self.err_expected("comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    /// Optional ORDER BY clause.
    fn parse_order_by_clause(&mut self) -> Result<Vec<OrderBy>> {
        if !self.next_is(TokenKind::Keyword(Keyword::Order)) {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::Keyword(Keyword::By))?;
        self.sep_by(TokenKind::Comma, |p| {
            let column = p.next_ident()?;
            let direction = if p.next_is(TokenKind::Keyword(Keyword::Desc)) {
                Direction::Descending
            } else {
                p.skip(TokenKind::Keyword(Keyword::Asc));
                Direction::Ascending
            };
            Ok(OrderBy { column, direction })
        })
    }

    /// Optional LIMIT clause.
    fn parse_limit_clause(&mut self) -> Result<Option<u64>> {
        if !self.next_is(TokenKind::Keyword(Keyword::Limit)) {
            return Ok(None);
        }
        if self.peek().kind != TokenKind::Nat {
            return Err(self.err_expected("natural number after LIMIT"));
        }
        let token = self.advance();
        let limit = token
            .lexeme
            .parse::<u64>()
            .map_err(|e| Error::Parse(format!("invalid LIMIT: {}", e)))?;
        Ok(Some(limit))
    }

    /// Mandatory RATIONALE clause. Absence is a hard parse error carrying
    /// the statement kind; an empty rationale string is rejected by the
    /// NonEmptyString constructor.
    fn parse_rationale(&mut self, statement_kind: &'static str) -> Result<Rationale> {
        if !self.next_is(TokenKind::Keyword(Keyword::Rationale)) {
            return Err(Error::MissingRationale(statement_kind));
        }
        self.parse_provenance_string("RATIONALE")
    }

    fn parse_provenance_string(&mut self, clause: &str) -> Result<ActorId> {
        if self.peek().kind != TokenKind::Str {
            return Err(self.err_expected(format!("string literal after {}", clause)));
        }
        let token = self.advance();
        ActorId::new(token.lexeme)
            .map_err(|_| Error::EmptyStringViolation(format!("{} text", clause)))
    }
}

//! Type-expression sub-grammar
//!
//! Shared by strict-mode column declarations and `::` annotations.
//! Structural errors in the type literal itself (BoundedNat with
//! min > max) are rejected here, before any schema is consulted.

use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::lexer::{TokenKind, TypeKeyword};
use crate::types::data_type::TypeExpr;

pub trait TypeParser: TokenHelper {
    /// Parses a type expression, recursing for Vector/Tracked elements.
    fn parse_type(&mut self) -> Result<TypeExpr>
    where
        Self: Sized,
    {
        let token = self.peek().clone();
        let keyword = match token.kind {
            TokenKind::TypeName(kw) => kw,
            _ => return Err(self.err_expected("type name")),
        };
        self.advance();

        Ok(match keyword {
            TypeKeyword::Nat => TypeExpr::Nat,
            TypeKeyword::Int => TypeExpr::Int,
            TypeKeyword::String => TypeExpr::String,
            TypeKeyword::Bool => TypeExpr::Bool,
            TypeKeyword::Float => TypeExpr::Float,
            TypeKeyword::Uuid => TypeExpr::Uuid,
            TypeKeyword::Timestamp => TypeExpr::Timestamp,
            TypeKeyword::NonEmptyString => TypeExpr::NonEmptyString,
            TypeKeyword::Confidence => TypeExpr::Confidence,
            TypeKeyword::PromptScores => TypeExpr::PromptScores,
            TypeKeyword::BoundedNat => {
                let min = self.parse_nat_arg("BoundedNat")?;
                let max = self.parse_nat_arg("BoundedNat")?;
                TypeExpr::bounded_nat(min, max)?
            }
            TypeKeyword::BoundedInt => {
                let min = self.parse_int_arg("BoundedInt")?;
                let max = self.parse_int_arg("BoundedInt")?;
                TypeExpr::bounded_int(min, max)?
            }
            TypeKeyword::BoundedFloat => {
                let min = self.parse_float_arg("BoundedFloat")?;
                let max = self.parse_float_arg("BoundedFloat")?;
                TypeExpr::bounded_float(min, max)?
            }
            TypeKeyword::Vector => {
                let elem = self.parse_type()?;
                let len = self.parse_nat_arg("Vector")?;
                TypeExpr::Vector {
                    elem: Box::new(elem),
                    len,
                }
            }
            TypeKeyword::Tracked => {
                let elem = self.parse_type()?;
                TypeExpr::Tracked(Box::new(elem))
            }
        })
    }

    /// A natural-number type argument, e.g. the bounds of BoundedNat.
    fn parse_nat_arg(&mut self, context: &str) -> Result<u64> {
        if self.peek().kind != TokenKind::Nat {
            return Err(self.err_expected(format!("natural number argument for {}", context)));
        }
        let token = self.advance();
        token
            .lexeme
            .parse::<u64>()
            .map_err(|_| Error::InvalidTypeExpr(format!("{}: argument {} out of range", context, token.lexeme)))
    }

    /// An integer type argument. Accepts both nat and negative literals.
    fn parse_int_arg(&mut self, context: &str) -> Result<i64> {
        if !matches!(self.peek().kind, TokenKind::Nat | TokenKind::Int) {
            return Err(self.err_expected(format!("integer argument for {}", context)));
        }
        let token = self.advance();
        token
            .lexeme
            .parse::<i64>()
            .map_err(|_| Error::InvalidTypeExpr(format!("{}: argument {} out of range", context, token.lexeme)))
    }

    /// A float type argument. Integer literals widen to float here; this
    /// is a syntactic convenience for bounds, not value coercion.
    fn parse_float_arg(&mut self, context: &str) -> Result<f64> {
        if !matches!(
            self.peek().kind,
            TokenKind::Nat | TokenKind::Int | TokenKind::Float
        ) {
            return Err(self.err_expected(format!("numeric argument for {}", context)));
        }
        let token = self.advance();
        token
            .lexeme
            .parse::<f64>()
            .map_err(|_| Error::InvalidTypeExpr(format!("{}: invalid argument {}", context, token.lexeme)))
    }
}

//! Abstract syntax tree for EVQL statements
//!
//! The AST is the parser's output: syntactically well-formed, but not yet
//! checked against any schema. Mandatory RATIONALE clauses are already
//! enforced here by construction (the fields are [`Rationale`], which is
//! non-empty by type).

pub mod common;
pub mod dml;

pub use common::{CompareOp, Direction, Literal, OrderBy, Predicate};
pub use dml::{
    Assignment, ColumnDecl, DeleteStatement, InsertStatement, SelectList, SelectStatement,
    UpdateStatement,
};

use serde::{Deserialize, Serialize};

use crate::types::refined::Rationale;

/// An EVQL statement. Root node of the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Insert(InsertStatement),
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// The statement's keyword, for diagnostics and logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "INSERT",
            Statement::Select(_) => "SELECT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
        }
    }

    /// The table this statement targets.
    pub fn table(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.table,
            Statement::Select(s) => &s.from,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    /// The rationale, for the three mutating statement kinds.
    pub fn rationale(&self) -> Option<&Rationale> {
        match self {
            Statement::Insert(s) => Some(&s.rationale),
            Statement::Select(_) => None,
            Statement::Update(s) => Some(&s.rationale),
            Statement::Delete(s) => Some(&s.rationale),
        }
    }
}

//! Statement AST: INSERT, SELECT, UPDATE, DELETE

use serde::{Deserialize, Serialize};

use super::common::{Literal, OrderBy, Predicate};
use crate::types::data_type::TypeExpr;
use crate::types::refined::{ActorId, Rationale};

/// A column named in an INSERT column list. In strict mode the parser
/// requires the `name : Type` form; in lenient mode the type is None and
/// inferred later from the literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecl {
    pub name: String,
    pub datatype: Option<TypeExpr>,
}

/// INSERT INTO table (cols) VALUES (lits) RATIONALE 'text' [ACTOR 'id']
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<ColumnDecl>,
    /// One or more VALUES rows.
    pub rows: Vec<Vec<Literal>>,
    pub rationale: Rationale,
    pub actor: Option<ActorId>,
}

/// The projection of a SELECT: `*` or an explicit column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectList {
    All,
    Columns(Vec<String>),
}

/// SELECT list FROM table [AS alias] [WHERE pred] [ORDER BY ...] [LIMIT n]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub select: SelectList,
    pub from: String,
    pub alias: Option<String>,
    pub r#where: Option<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    /// Optional `:: TypeExpr` refinement on the returned values.
    pub returning_refinement: Option<TypeExpr>,
}

/// One `col = literal` assignment in an UPDATE SET list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Literal,
}

/// UPDATE table SET assignments [WHERE pred] RATIONALE 'text'
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub r#where: Option<Predicate>,
    pub rationale: Rationale,
}

/// DELETE FROM table WHERE pred RATIONALE 'text'
///
/// WHERE is mandatory; unconditional deletes do not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub r#where: Predicate,
    pub rationale: Rationale,
}

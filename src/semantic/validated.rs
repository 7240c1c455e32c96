//! Validated statement forms
//!
//! The validator's output: every column resolved against the schema, every
//! literal turned into a [`TypedValue`] through the refined constructors.
//! Owned by exactly one pipeline invocation and immutable once built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::parsing::ast::{CompareOp, OrderBy};
use crate::types::data_type::{TypeExpr, TypeExprKind};
use crate::types::refined::{ActorId, Rationale};
use crate::types::value::TypedValue;

/// A column resolved against the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedColumn {
    pub name: String,
    pub datatype: TypeExpr,
}

/// A WHERE predicate with its comparison value typed per the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPredicate {
    pub column: ValidatedColumn,
    pub op: CompareOp,
    pub value: TypedValue,
}

/// A schema-checked statement, ready for lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidatedStatement {
    Insert {
        table: String,
        columns: Vec<ValidatedColumn>,
        rows: Vec<Vec<TypedValue>>,
        rationale: Rationale,
        actor: Option<ActorId>,
    },
    Select {
        table: String,
        alias: Option<String>,
        columns: Vec<ValidatedColumn>,
        predicate: Option<ValidatedPredicate>,
        order_by: Vec<OrderBy>,
        limit: Option<u64>,
        returning_refinement: Option<TypeExpr>,
    },
    Update {
        table: String,
        assignments: Vec<(ValidatedColumn, TypedValue)>,
        predicate: Option<ValidatedPredicate>,
        rationale: Rationale,
    },
    Delete {
        table: String,
        predicate: ValidatedPredicate,
        rationale: Rationale,
    },
}

impl ValidatedStatement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ValidatedStatement::Insert { .. } => "INSERT",
            ValidatedStatement::Select { .. } => "SELECT",
            ValidatedStatement::Update { .. } => "UPDATE",
            ValidatedStatement::Delete { .. } => "DELETE",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            ValidatedStatement::Insert { table, .. } => table,
            ValidatedStatement::Select { table, .. } => table,
            ValidatedStatement::Update { table, .. } => table,
            ValidatedStatement::Delete { table, .. } => table,
        }
    }

    /// Every type kind this statement references, for permission checks.
    /// Ordered so that lowering stays deterministic.
    pub fn referenced_type_kinds(&self) -> BTreeSet<TypeExprKind> {
        let mut kinds = BTreeSet::new();
        let mut add = |ty: &TypeExpr| ty.referenced_kinds(&mut kinds);
        match self {
            ValidatedStatement::Insert { columns, .. } => {
                columns.iter().for_each(|c| add(&c.datatype));
            }
            ValidatedStatement::Select {
                columns,
                predicate,
                returning_refinement,
                ..
            } => {
                columns.iter().for_each(|c| add(&c.datatype));
                if let Some(p) = predicate {
                    add(&p.column.datatype);
                }
                if let Some(ty) = returning_refinement {
                    add(ty);
                }
            }
            ValidatedStatement::Update {
                assignments,
                predicate,
                ..
            } => {
                assignments.iter().for_each(|(c, _)| add(&c.datatype));
                if let Some(p) = predicate {
                    add(&p.column.datatype);
                }
            }
            ValidatedStatement::Delete { predicate, .. } => {
                add(&predicate.column.datatype);
            }
        }
        kinds
    }
}

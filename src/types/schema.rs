//! Table schemas
//!
//! Schemas are immutable after construction and always built through the
//! validating [`Schema::new`]. They are stored in, and handed out by, the
//! [`crate::registry::SchemaRegistry`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::data_type::TypeExpr;
use crate::error::{Error, Result};

/// A table schema: name, columns, declared constraints and an optional
/// target normal form annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Table name. Can't be empty.
    pub name: String,
    /// The table's columns. Names are unique.
    pub columns: Vec<Column>,
    /// Declared constraints, surfaced as unverified proof obligations.
    pub constraints: Vec<Constraint>,
    /// The normal form this table is expected to satisfy, if declared.
    pub target_normal_form: Option<NormalForm>,
}

impl Schema {
    /// Creates a schema, validating the name, column name uniqueness, and
    /// that at most one column is the primary key.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidValue("table name cannot be empty".into()));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(Error::InvalidValue(format!(
                    "table {}: column name cannot be empty",
                    name
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::InvalidValue(format!(
                    "table {}: duplicate column {}",
                    name, column.name
                )));
            }
        }
        if columns.iter().filter(|c| c.is_primary_key).count() > 1 {
            return Err(Error::InvalidValue(format!(
                "table {}: at most one primary key column",
                name
            )));
        }
        Ok(Schema {
            name,
            columns,
            constraints: Vec::new(),
            target_normal_form: None,
        })
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_target_normal_form(mut self, form: NormalForm) -> Self {
        self.target_normal_form = Some(form);
        self
    }

    /// Returns the column with the given name, if it exists.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: TypeExpr,
    pub is_primary_key: bool,
    pub is_unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: TypeExpr) -> Self {
        Column {
            name: name.into(),
            datatype,
            is_primary_key: false,
            is_unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// A declared table constraint. None of these are decidable from a single
/// statement, so the validator surfaces them as unverified obligations for
/// external review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Arbitrary named predicate over rows.
    Check { predicate: String },
    /// Column references another table's primary key.
    ForeignKey { column: String, references: String },
    /// Column values must be unique across the table.
    Unique { column: String },
}

/// Normal forms a table may declare as its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalForm {
    First,
    Second,
    Third,
    BoyceCodd,
    Fourth,
}

impl fmt::Display for NormalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormalForm::First => "1NF",
            NormalForm::Second => "2NF",
            NormalForm::Third => "3NF",
            NormalForm::BoyceCodd => "BCNF",
            NormalForm::Fourth => "4NF",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_rejects_duplicate_columns() {
        let columns = vec![
            Column::new("id", TypeExpr::Uuid),
            Column::new("id", TypeExpr::Nat),
        ];
        assert!(Schema::new("t", columns).is_err());
    }

    #[test]
    fn schema_rejects_two_primary_keys() {
        let columns = vec![
            Column::new("a", TypeExpr::Uuid).primary_key(),
            Column::new("b", TypeExpr::Nat).primary_key(),
        ];
        assert!(Schema::new("t", columns).is_err());
    }

    #[test]
    fn schema_rejects_empty_name() {
        assert!(Schema::new("", vec![]).is_err());
    }
}

//! Statement validation
//!
//! Takes a parsed [`Statement`], a schema snapshot and a permission
//! profile, and produces a [`ValidatedStatement`] plus the proof
//! obligations synthesized along the way.
//!
//! Literals become [`TypedValue`]s only through the refined constructors,
//! so every value in a validated statement already satisfies its type's
//! invariant. Decidable obligations (bounds, non-emptiness) are discharged
//! on the spot; schema constraints are surfaced unverified for external
//! review (under [`ValidationLevel::Strict`]) or left to the execution
//! engine (under [`ValidationLevel::Runtime`]).

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::obligation::{ObligationRecord, ProofObligation};
use super::validated::{ValidatedColumn, ValidatedPredicate, ValidatedStatement};
use crate::error::{Error, Result};
use crate::ir::{PermissionMetadata, ValidationLevel};
use crate::parsing::ast::{Literal, Predicate, SelectList, Statement};
use crate::registry::SchemaSnapshot;
use crate::types::data_type::TypeExpr;
use crate::types::refined::{BoundedFloat, BoundedInt, BoundedNat, Confidence, NonEmptyString};
use crate::types::schema::{Constraint, Schema};
use crate::types::value::TypedValue;

/// Validates a statement against a schema snapshot.
pub fn validate(
    statement: &Statement,
    snapshot: &SchemaSnapshot,
    permissions: &PermissionMetadata,
) -> Result<(ValidatedStatement, Vec<ObligationRecord>)> {
    Validator {
        snapshot,
        permissions,
        obligations: Vec::new(),
    }
    .run(statement)
}

struct Validator<'a> {
    snapshot: &'a SchemaSnapshot,
    permissions: &'a PermissionMetadata,
    obligations: Vec<ObligationRecord>,
}

impl Validator<'_> {
    fn run(mut self, statement: &Statement) -> Result<(ValidatedStatement, Vec<ObligationRecord>)> {
        let validated = match statement {
            Statement::Insert(insert) => self.validate_insert(insert)?,
            Statement::Select(select) => self.validate_select(select)?,
            Statement::Update(update) => self.validate_update(update)?,
            Statement::Delete(delete) => self.validate_delete(delete)?,
        };
        Ok((validated, self.obligations))
    }

    fn schema(&self, table: &str) -> Result<&Schema> {
        self.snapshot
            .lookup(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    fn resolve_column<'s>(
        &self,
        schema: &'s Schema,
        column: &str,
    ) -> Result<&'s crate::types::schema::Column> {
        schema.get_column(column).ok_or_else(|| Error::UnknownColumn {
            table: schema.name.clone(),
            column: column.to_string(),
        })
    }

    fn validate_insert(
        &mut self,
        insert: &crate::parsing::ast::InsertStatement,
    ) -> Result<ValidatedStatement> {
        let schema = self.schema(&insert.table)?.clone();

        let mut columns = Vec::with_capacity(insert.columns.len());
        for decl in &insert.columns {
            let schema_column = self.resolve_column(&schema, &decl.name)?;
            // In strict mode the declared type must match the schema
            // exactly. Structural equality, no coercion.
            if let Some(declared) = &decl.datatype {
                if *declared != schema_column.datatype {
                    return Err(self.type_mismatch(
                        &decl.name,
                        &schema_column.datatype,
                        &declared.to_string(),
                    ));
                }
            }
            columns.push(ValidatedColumn {
                name: schema_column.name.clone(),
                datatype: schema_column.datatype.clone(),
            });
        }

        let mut rows = Vec::with_capacity(insert.rows.len());
        for (row_index, row) in insert.rows.iter().enumerate() {
            let mut typed_row = Vec::with_capacity(row.len());
            for (column, literal) in columns.iter().zip(row) {
                typed_row.push(self.typed_value(&column.name, &column.datatype, literal)?);
            }
            self.synthesize_constraint_obligations(&schema, row_index as u64);
            rows.push(typed_row);
        }

        Ok(ValidatedStatement::Insert {
            table: schema.name.clone(),
            columns,
            rows,
            rationale: insert.rationale.clone(),
            actor: insert.actor.clone(),
        })
    }

    fn validate_select(
        &mut self,
        select: &crate::parsing::ast::SelectStatement,
    ) -> Result<ValidatedStatement> {
        let schema = self.schema(&select.from)?.clone();

        let columns = match &select.select {
            SelectList::All => schema
                .columns
                .iter()
                .map(|c| ValidatedColumn {
                    name: c.name.clone(),
                    datatype: c.datatype.clone(),
                })
                .collect::<Vec<_>>(),
            SelectList::Columns(names) => {
                let mut columns = Vec::with_capacity(names.len());
                for name in names {
                    let column = self.resolve_column(&schema, name)?;
                    columns.push(ValidatedColumn {
                        name: column.name.clone(),
                        datatype: column.datatype.clone(),
                    });
                }
                columns
            }
        };

        if let Some(refinement) = &select.returning_refinement {
            self.check_returning_refinement(&columns, refinement)?;
        }

        let predicate = match &select.r#where {
            Some(p) => Some(self.validate_predicate(&schema, p)?),
            None => None,
        };

        for order in &select.order_by {
            self.resolve_column(&schema, &order.column)?;
        }

        Ok(ValidatedStatement::Select {
            table: schema.name.clone(),
            alias: select.alias.clone(),
            columns,
            predicate,
            order_by: select.order_by.clone(),
            limit: select.limit,
            returning_refinement: select.returning_refinement.clone(),
        })
    }

    fn validate_update(
        &mut self,
        update: &crate::parsing::ast::UpdateStatement,
    ) -> Result<ValidatedStatement> {
        let schema = self.schema(&update.table)?.clone();

        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            let column = self.resolve_column(&schema, &assignment.column)?;
            let column = ValidatedColumn {
                name: column.name.clone(),
                datatype: column.datatype.clone(),
            };
            let value = self.typed_value(&column.name, &column.datatype, &assignment.value)?;
            assignments.push((column, value));
        }

        let predicate = match &update.r#where {
            Some(p) => Some(self.validate_predicate(&schema, p)?),
            None => None,
        };
        self.synthesize_constraint_obligations(&schema, 0);

        Ok(ValidatedStatement::Update {
            table: schema.name.clone(),
            assignments,
            predicate,
            rationale: update.rationale.clone(),
        })
    }

    fn validate_delete(
        &mut self,
        delete: &crate::parsing::ast::DeleteStatement,
    ) -> Result<ValidatedStatement> {
        let schema = self.schema(&delete.table)?.clone();
        let predicate = self.validate_predicate(&schema, &delete.r#where)?;

        Ok(ValidatedStatement::Delete {
            table: schema.name.clone(),
            predicate,
            rationale: delete.rationale.clone(),
        })
    }

    fn validate_predicate(
        &mut self,
        schema: &Schema,
        predicate: &Predicate,
    ) -> Result<ValidatedPredicate> {
        let column = self.resolve_column(schema, &predicate.column)?;
        let column = ValidatedColumn {
            name: column.name.clone(),
            datatype: column.datatype.clone(),
        };
        let value = self.typed_value(&column.name, &column.datatype, &predicate.value)?;
        Ok(ValidatedPredicate {
            column,
            op: predicate.op,
            value,
        })
    }

    /// A `:: TypeExpr` refinement on a SELECT must match the single
    /// selected column's type exactly. Since the actual row values are not
    /// visible at validation time, refined kinds additionally synthesize an
    /// unverified obligation for the execution engine.
    fn check_returning_refinement(
        &mut self,
        columns: &[ValidatedColumn],
        refinement: &TypeExpr,
    ) -> Result<()> {
        let column = match columns {
            [single] => single,
            _ => {
                return Err(Error::InvalidValue(
                    "a '::' returning refinement requires exactly one selected column".into(),
                ))
            }
        };
        if column.datatype != *refinement {
            return Err(self.type_mismatch(&column.name, refinement, &column.datatype.to_string()));
        }
        if refinement.is_refined() {
            self.obligations.push(ObligationRecord::unverified(
                ProofObligation::Custom {
                    predicate_id: format!("returning:{}", refinement),
                },
                "returned rows re-checked by the execution engine",
            ));
        }
        Ok(())
    }

    /// Declared schema constraints are not decidable from a single
    /// statement. Under strict validation they are surfaced as unverified
    /// obligations; under runtime validation the execution engine owns
    /// them outright and nothing is synthesized.
    fn synthesize_constraint_obligations(&mut self, schema: &Schema, row_ref: u64) {
        if self.permissions.validation_level != ValidationLevel::Strict {
            return;
        }
        for constraint in &schema.constraints {
            let record = match constraint {
                Constraint::Check { predicate } => ObligationRecord::unverified(
                    ProofObligation::Custom {
                        predicate_id: predicate.clone(),
                    },
                    "requires external review",
                ),
                Constraint::ForeignKey { column, references } => ObligationRecord::unverified(
                    ProofObligation::ConstraintCheck {
                        schema_ref: schema.name.clone(),
                        row_ref,
                    },
                    format!("foreign key {} -> {}", column, references),
                ),
                Constraint::Unique { column } => ObligationRecord::unverified(
                    ProofObligation::ConstraintCheck {
                        schema_ref: schema.name.clone(),
                        row_ref,
                    },
                    format!("uniqueness of {}", column),
                ),
            };
            self.obligations.push(record);
        }
    }

    /// Converts a literal into a [`TypedValue`] for the declared type,
    /// synthesizing and discharging refinement obligations. This is the
    /// only literal-to-value path in the crate.
    fn typed_value(
        &mut self,
        column: &str,
        ty: &TypeExpr,
        literal: &Literal,
    ) -> Result<TypedValue> {
        match (ty, literal) {
            (TypeExpr::Nat, Literal::Nat(n)) => Ok(TypedValue::Nat(*n)),
            (TypeExpr::Int, Literal::Int(i)) => Ok(TypedValue::Int(*i)),
            (TypeExpr::Int, Literal::Nat(n)) => {
                let value = i64::try_from(*n)
                    .map_err(|_| Error::InvalidValue(format!("{} does not fit Int", n)))?;
                Ok(TypedValue::Int(value))
            }
            (TypeExpr::String, Literal::Str(s)) => Ok(TypedValue::Str(s.clone())),
            (TypeExpr::Bool, Literal::Bool(b)) => Ok(TypedValue::Bool(*b)),
            (TypeExpr::Float, literal) => match numeric_as_f64(literal) {
                Some(x) => Ok(TypedValue::Float(x)),
                None => Err(self.type_mismatch(column, ty, &literal_type_name(literal))),
            },
            (TypeExpr::Uuid, Literal::Str(s)) => {
                let uuid = Uuid::parse_str(s)
                    .map_err(|e| Error::InvalidValue(format!("column {}: invalid UUID: {}", column, e)))?;
                Ok(TypedValue::Uuid(uuid))
            }
            (TypeExpr::Timestamp, Literal::Str(s)) => {
                let ts = parse_timestamp(s).ok_or_else(|| {
                    Error::InvalidValue(format!("column {}: invalid timestamp '{}'", column, s))
                })?;
                Ok(TypedValue::Timestamp(ts))
            }
            (TypeExpr::BoundedNat { min, max }, Literal::Nat(n)) => {
                let bounded = BoundedNat::new(*min, *max, *n)?;
                self.obligations.push(ObligationRecord::verified(
                    ProofObligation::BoundsCheck {
                        min: *min as i128,
                        max: *max as i128,
                        value: *n as i128,
                    },
                    format!("column {}: {} <= {} <= {}", column, min, n, max),
                ));
                Ok(TypedValue::BoundedNat(bounded))
            }
            // A BoundedNat column fed a negative literal is a bounds
            // violation, not a type mismatch.
            (TypeExpr::BoundedNat { min, max }, Literal::Int(i)) => Err(Error::BoundsViolation {
                min: *min as i128,
                max: *max as i128,
                value: *i as i128,
            }),
            (TypeExpr::BoundedInt { min, max }, Literal::Int(_) | Literal::Nat(_)) => {
                let value = match literal {
                    Literal::Int(i) => *i,
                    Literal::Nat(n) => i64::try_from(*n)
                        .map_err(|_| Error::InvalidValue(format!("{} does not fit Int", n)))?,
                    _ => unreachable!(),
                };
                let bounded = BoundedInt::new(*min, *max, value)?;
                self.obligations.push(ObligationRecord::verified(
                    ProofObligation::BoundsCheck {
                        min: *min as i128,
                        max: *max as i128,
                        value: value as i128,
                    },
                    format!("column {}: {} <= {} <= {}", column, min, value, max),
                ));
                Ok(TypedValue::BoundedInt(bounded))
            }
            (TypeExpr::BoundedFloat { min, max }, literal) => match numeric_as_f64(literal) {
                Some(x) => {
                    let bounded = BoundedFloat::new(*min, *max, x)?;
                    self.obligations.push(ObligationRecord::verified(
                        ProofObligation::FloatBoundsCheck {
                            min: *min,
                            max: *max,
                            value: x,
                        },
                        format!("column {}: {} <= {} <= {}", column, min, x, max),
                    ));
                    Ok(TypedValue::BoundedFloat(bounded))
                }
                None => Err(self.type_mismatch(column, ty, &literal_type_name(literal))),
            },
            (TypeExpr::Confidence, literal) => match numeric_as_f64(literal) {
                Some(x) => {
                    let confidence = Confidence::new(x)?;
                    self.obligations.push(ObligationRecord::verified(
                        ProofObligation::FloatBoundsCheck {
                            min: 0.0,
                            max: 1.0,
                            value: x,
                        },
                        format!("column {}: confidence in unit interval", column),
                    ));
                    Ok(TypedValue::Confidence(confidence))
                }
                None => Err(self.type_mismatch(column, ty, &literal_type_name(literal))),
            },
            (TypeExpr::NonEmptyString, Literal::Str(s)) => {
                let value = NonEmptyString::new(s.clone()).map_err(|_| {
                    Error::EmptyStringViolation(format!("column {}", column))
                })?;
                self.obligations.push(ObligationRecord::verified(
                    ProofObligation::NonEmpty { value: s.clone() },
                    format!("column {}: length {} > 0", column, s.len()),
                ));
                Ok(TypedValue::NonEmpty(value))
            }
            // Vector, Tracked and PromptScores have no literal syntax;
            // their values enter the system through the API or the codec.
            (expected, literal) => {
                Err(self.type_mismatch(column, expected, &literal_type_name(literal)))
            }
        }
    }

    fn type_mismatch(&self, column: &str, expected: &TypeExpr, actual: &str) -> Error {
        Error::TypeMismatch {
            column: column.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            suggestion: suggestion(expected, actual),
        }
    }
}

/// Numeric literals usable where a float is declared. This is literal
/// typing, not value coercion: `95` may denote a float, but a Nat
/// `TypedValue` is never reinterpreted as Float.
fn numeric_as_f64(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Float(x) => Some(*x),
        Literal::Nat(n) => Some(*n as f64),
        Literal::Int(i) => Some(*i as f64),
        _ => None,
    }
}

fn literal_type_name(literal: &Literal) -> String {
    match literal {
        Literal::Nat(_) => "Nat".into(),
        Literal::Int(_) => "Int".into(),
        Literal::Float(_) => "Float".into(),
        Literal::Bool(_) => "Bool".into(),
        Literal::Str(_) => "String".into(),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
}

/// A human-oriented hint derived from the expected/actual pair. Consumed
/// by editor tooling, never by the core itself.
fn suggestion(expected: &TypeExpr, actual: &str) -> String {
    match expected {
        TypeExpr::NonEmptyString => "provide a non-empty single-quoted string".into(),
        TypeExpr::BoundedNat { min, max } => {
            format!("use a natural number between {} and {}", min, max)
        }
        TypeExpr::BoundedInt { min, max } => {
            format!("use an integer between {} and {}", min, max)
        }
        TypeExpr::BoundedFloat { min, max } => {
            format!("use a number between {} and {}", min, max)
        }
        TypeExpr::Confidence => "use a number between 0.0 and 1.0".into(),
        TypeExpr::Uuid => "provide a UUID string such as '550e8400-e29b-41d4-a716-446655440000'".into(),
        TypeExpr::Timestamp => "provide an RFC 3339 timestamp string".into(),
        TypeExpr::PromptScores | TypeExpr::Vector { .. } | TypeExpr::Tracked(_) => format!(
            "{} values cannot be written as literals; construct them through the API",
            expected
        ),
        _ => format!("change the {} value to {}", actual, expected),
    }
}

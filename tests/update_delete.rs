//! Tests for UPDATE and DELETE statements

mod common;

use common::TestContext;

use evql::error::Error;
use evql::semantic::validated::ValidatedStatement;
use evql::types::value::TypedValue;
use evql::Stage;

#[test]
fn update_refined_column() {
    let ctx = TestContext::new();
    let output = ctx
        .run(
            "UPDATE claims SET confidence = 0.75 WHERE citation_count > 100 \
             RATIONALE 'downgraded after replication failure'",
        )
        .unwrap();

    let ValidatedStatement::Update {
        assignments,
        predicate,
        rationale,
        ..
    } = &output.ir.statement
    else {
        panic!("expected update");
    };
    assert_eq!(assignments.len(), 1);
    assert!(matches!(assignments[0].1, TypedValue::Confidence(_)));
    assert!(predicate.is_some());
    assert!(rationale.as_str().contains("replication"));
}

#[test]
fn update_multiple_assignments_without_where() {
    // UPDATE without WHERE is legal (unlike DELETE); it touches every row.
    let ctx = TestContext::new();
    let output = ctx
        .run("UPDATE notes SET pinned = false, rank = 0 RATIONALE 'reset'")
        .unwrap();
    let ValidatedStatement::Update { assignments, predicate, .. } = &output.ir.statement else {
        panic!("expected update");
    };
    assert_eq!(assignments.len(), 2);
    assert!(predicate.is_none());
}

#[test]
fn update_out_of_bounds_value_is_rejected() {
    let ctx = TestContext::new();
    let err = ctx
        .run("UPDATE sources SET year = 3000 WHERE year = 1999 RATIONALE 'r'")
        .unwrap_err();
    assert!(matches!(err.source, Error::BoundsViolation { value: 3000, .. }));
}

#[test]
fn update_bounded_float_assignment() {
    let ctx = TestContext::new();
    let err = ctx
        .run("UPDATE sources SET weight = 1.5 WHERE year = 1999 RATIONALE 'r'")
        .unwrap_err();
    assert!(matches!(
        err.source,
        Error::FloatBoundsViolation { value, .. } if value == 1.5
    ));
}

#[test]
fn update_without_rationale_is_rejected() {
    let ctx = TestContext::new();
    let err = ctx.run("UPDATE notes SET rank = 1").unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert!(matches!(err.source, Error::MissingRationale("UPDATE")));
}

#[test]
fn delete_with_where_and_rationale() {
    let ctx = TestContext::new();
    let output = ctx
        .run("DELETE FROM notes WHERE rank = 0 RATIONALE 'pruning unranked notes'")
        .unwrap();
    let ValidatedStatement::Delete { predicate, .. } = &output.ir.statement else {
        panic!("expected delete");
    };
    assert_eq!(predicate.column.name, "rank");
}

#[test]
fn delete_without_where_is_a_parse_error() {
    let ctx = TestContext::new();
    let err = ctx.run("DELETE FROM notes RATIONALE 'r'").unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert!(matches!(err.source, Error::MissingWhereOnDelete));
}

#[test]
fn delete_without_rationale_is_rejected() {
    let ctx = TestContext::new();
    let err = ctx.run("DELETE FROM notes WHERE rank = 0").unwrap_err();
    assert!(matches!(err.source, Error::MissingRationale("DELETE")));
}

#[test]
fn delete_missing_both_reports_where_first() {
    let ctx = TestContext::new();
    let err = ctx.run("DELETE FROM notes").unwrap_err();
    assert!(matches!(err.source, Error::MissingWhereOnDelete));
}

#[test]
fn delete_predicate_is_schema_checked() {
    let ctx = TestContext::new();
    let err = ctx
        .run("DELETE FROM notes WHERE rank = 'high' RATIONALE 'r'")
        .unwrap_err();
    assert!(matches!(err.source, Error::TypeMismatch { .. }));
}

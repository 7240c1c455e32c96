//! Tests for INSERT statements

mod common;

use common::TestContext;

use evql::error::Error;
use evql::semantic::obligation::ProofObligation;
use evql::semantic::validated::ValidatedStatement;
use evql::Stage;

#[test]
fn insert_with_refined_columns() {
    let ctx = TestContext::new();
    let output = ctx
        .run(
            "INSERT INTO claims (summary, confidence, citation_count) \
             VALUES ('vaccines reduce mortality', 0.97, 412) \
             RATIONALE 'seed claim from meta-analysis'",
        )
        .unwrap();

    let ValidatedStatement::Insert { rows, rationale, .. } = &output.ir.statement else {
        panic!("expected insert");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 3);
    assert_eq!(rationale.as_str(), "seed claim from meta-analysis");

    // Non-emptiness and both range checks were discharged at validation
    // time; the schema's CHECK constraint stays unverified.
    let verified: Vec<_> = output
        .ir
        .obligations
        .iter()
        .filter(|o| o.verified)
        .collect();
    assert_eq!(verified.len(), 3);
    assert!(!output.ir.fully_verified());
}

#[test]
fn insert_multiple_rows() {
    let ctx = TestContext::new();
    let output = ctx
        .run(
            "INSERT INTO notes (body, pinned, rank) \
             VALUES ('first', true, 1), ('second', false, 2) \
             RATIONALE 'bulk import'",
        )
        .unwrap();

    let ValidatedStatement::Insert { rows, .. } = &output.ir.statement else {
        panic!("expected insert");
    };
    assert_eq!(rows.len(), 2);
    // The notes schema has no refined columns and no constraints.
    assert!(output.ir.fully_verified());
}

#[test]
fn insert_with_actor_attribution() {
    let ctx = TestContext::new();
    let output = ctx
        .run(
            "INSERT INTO notes (body, pinned, rank) VALUES ('x', true, 0) \
             RATIONALE 'annotated import' ACTOR 'batch-loader-7'",
        )
        .unwrap();

    let ValidatedStatement::Insert { actor, .. } = &output.ir.statement else {
        panic!("expected insert");
    };
    assert_eq!(actor.as_ref().unwrap().as_str(), "batch-loader-7");
}

#[test]
fn insert_without_rationale_is_rejected_at_parse() {
    let ctx = TestContext::new();
    let err = ctx
        .run("INSERT INTO notes (body, pinned, rank) VALUES ('x', true, 0)")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert!(matches!(err.source, Error::MissingRationale("INSERT")));
}

#[test]
fn insert_with_empty_rationale_is_rejected() {
    let ctx = TestContext::new();
    let err = ctx
        .run("INSERT INTO notes (body, pinned, rank) VALUES ('x', true, 0) RATIONALE ''")
        .unwrap_err();
    assert!(matches!(err.source, Error::EmptyStringViolation(_)));
}

#[test]
fn insert_out_of_bounds_nat_is_rejected() {
    let ctx = TestContext::new();
    let err = ctx
        .run(
            "INSERT INTO claims (summary, confidence, citation_count) \
             VALUES ('s', 0.5, 99999) RATIONALE 'r'",
        )
        .unwrap_err();
    assert_eq!(err.stage, Stage::Validate);
    assert!(matches!(
        err.source,
        Error::BoundsViolation {
            min: 0,
            max: 10_000,
            value: 99_999,
        }
    ));
}

#[test]
fn insert_negative_into_bounded_nat_is_a_bounds_violation() {
    let ctx = TestContext::new();
    let err = ctx
        .run(
            "INSERT INTO claims (summary, confidence, citation_count) \
             VALUES ('s', 0.5, -3) RATIONALE 'r'",
        )
        .unwrap_err();
    assert!(matches!(err.source, Error::BoundsViolation { value: -3, .. }));
}

#[test]
fn insert_empty_string_into_non_empty_column() {
    let ctx = TestContext::new();
    let err = ctx
        .run(
            "INSERT INTO claims (summary, confidence, citation_count) \
             VALUES ('', 0.5, 1) RATIONALE 'r'",
        )
        .unwrap_err();
    assert!(matches!(err.source, Error::EmptyStringViolation(_)));
}

#[test]
fn insert_type_mismatch_carries_a_suggestion() {
    let ctx = TestContext::new();
    let err = ctx
        .run(
            "INSERT INTO claims (summary, confidence, citation_count) \
             VALUES (42, 0.5, 1) RATIONALE 'r'",
        )
        .unwrap_err();
    let Error::TypeMismatch { column, suggestion, .. } = &err.source else {
        panic!("expected type mismatch, got {}", err.source);
    };
    assert_eq!(column, "summary");
    assert!(suggestion.contains("non-empty"));
}

#[test]
fn insert_row_arity_mismatch() {
    let ctx = TestContext::new();
    let err = ctx
        .run("INSERT INTO notes (body, pinned) VALUES ('x', true, 0) RATIONALE 'r'")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
}

#[test]
fn insert_into_unknown_table() {
    let ctx = TestContext::new();
    let err = ctx
        .run("INSERT INTO missing (a) VALUES (1) RATIONALE 'r'")
        .unwrap_err();
    assert!(matches!(err.source, Error::UnknownTable(ref t) if t == "missing"));
}

#[test]
fn insert_into_unknown_column() {
    let ctx = TestContext::new();
    let err = ctx
        .run("INSERT INTO notes (nope) VALUES (1) RATIONALE 'r'")
        .unwrap_err();
    assert!(
        matches!(err.source, Error::UnknownColumn { ref table, ref column } if table == "notes" && column == "nope")
    );
}

#[test]
fn strict_mode_requires_type_declarations() {
    let ctx = TestContext::new();
    let err = ctx
        .run_strict("INSERT INTO notes (body) VALUES ('x') RATIONALE 'r'")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);

    let output = ctx
        .run_strict("INSERT INTO notes (body : String) VALUES ('x') RATIONALE 'r'")
        .unwrap();
    assert!(output.ir.fully_verified());
}

#[test]
fn strict_mode_rejects_declared_type_that_disagrees_with_schema() {
    let ctx = TestContext::new();
    let err = ctx
        .run_strict("INSERT INTO notes (body : Nat) VALUES (1) RATIONALE 'r'")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Validate);
    assert!(matches!(err.source, Error::TypeMismatch { .. }));
}

#[test]
fn strict_mode_accepts_full_refined_declarations() {
    let ctx = TestContext::new();
    let output = ctx
        .run_strict(
            "INSERT INTO claims (summary : NonEmptyString, citation_count : BoundedNat 0 10000) \
             VALUES ('solid claim', 3) RATIONALE 'strict-mode entry'",
        )
        .unwrap();
    let bounds_checks = output
        .ir
        .obligations
        .iter()
        .filter(|o| matches!(o.obligation, ProofObligation::BoundsCheck { .. }))
        .count();
    assert_eq!(bounds_checks, 1);
}

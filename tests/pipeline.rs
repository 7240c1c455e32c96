//! End-to-end pipeline tests

mod common;

use common::{restricted_permissions, TestContext};

use evql::codec;
use evql::error::Error;
use evql::pipeline::{Pipeline, PipelineConfig, SerializationFormat};
use evql::registry::SchemaRegistry;
use evql::types::data_type::{TypeExpr, TypeExprKind};
use evql::types::schema::{Column, Schema};
use evql::{ParseMode, Stage};

fn evidence_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry.register(
        Schema::new(
            "evidence",
            vec![
                Column::new("title", TypeExpr::NonEmptyString),
                Column::new("score", TypeExpr::bounded_nat(0, 100).unwrap()),
            ],
        )
        .unwrap(),
    );
    registry
}

fn evidence_pipeline() -> Pipeline {
    Pipeline::new(
        PipelineConfig::new(common::test_permissions()),
        evidence_registry(),
    )
}

#[test]
fn valid_insert_lowers_with_discharged_obligations() {
    let output = evidence_pipeline()
        .run("INSERT INTO evidence (title, score) VALUES ('ONS Data', 95) RATIONALE 'Official statistics';")
        .unwrap();

    assert_eq!(output.ir.obligations.len(), 2);
    assert!(output.ir.fully_verified());
    assert!(!output.encoded.is_empty());
    assert_eq!(codec::decode(&output.encoded).unwrap(), output.ir);
}

#[test]
fn out_of_range_score_fails_validation() {
    let err = evidence_pipeline()
        .run("INSERT INTO evidence (title, score) VALUES ('ONS Data', 150) RATIONALE 'Official statistics';")
        .unwrap_err();

    assert_eq!(err.stage, Stage::Validate);
    assert!(matches!(
        err.source,
        Error::BoundsViolation {
            min: 0,
            max: 100,
            value: 150,
        }
    ));
}

#[test]
fn delete_without_where_fails_at_parse() {
    let err = evidence_pipeline()
        .run("DELETE FROM evidence RATIONALE 'cleanup';")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert!(matches!(err.source, Error::MissingWhereOnDelete));
}

#[test]
fn inverted_type_bounds_fail_before_schema_lookup() {
    // No "unknown_table" error: the type literal is rejected first.
    let err = evidence_pipeline()
        .run("SELECT score :: BoundedNat 10 5 FROM unknown_table")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert!(matches!(err.source, Error::InvalidTypeExpr(_)));
}

#[test]
fn lex_errors_carry_position_and_snippet() {
    let err = evidence_pipeline()
        .run("SELECT * FROM evidence WHERE title = 'unterminated")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Lex);
    assert_eq!(err.line, Some(1));
    assert!(err.snippet.as_deref().unwrap().contains("unterminated"));
}

#[test]
fn parse_errors_point_at_the_offending_line() {
    let err = evidence_pipeline()
        .run("SELECT title\nFROM evidence\nWHERE score ** 3")
        .unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert_eq!(err.line, Some(3));
    assert_eq!(err.snippet.as_deref(), Some("WHERE score ** 3"));
}

#[test]
fn permission_profile_gates_refined_types() {
    let registry = evidence_registry();
    let permissions = restricted_permissions(&[TypeExprKind::NonEmptyString]);
    let pipeline = Pipeline::new(PipelineConfig::new(permissions), registry);

    // title alone is fine; score drags in BoundedNat, which the profile
    // does not allow.
    assert!(pipeline.run("SELECT title FROM evidence").is_ok());

    let err = pipeline.run("SELECT score FROM evidence").unwrap_err();
    assert_eq!(err.stage, Stage::Lower);
    assert!(matches!(
        err.source,
        Error::PermissionDenied { ref type_kind, ref role }
            if type_kind == "BoundedNat" && role == "intern"
    ));
}

#[test]
fn json_format_produces_decodable_output() {
    let pipeline = Pipeline::new(
        PipelineConfig::new(common::test_permissions()).with_format(SerializationFormat::Json),
        evidence_registry(),
    );
    let output = pipeline
        .run("INSERT INTO evidence (title, score) VALUES ('x', 1) RATIONALE 'r'")
        .unwrap();
    let json = String::from_utf8(output.encoded).unwrap();
    assert_eq!(codec::from_json(&json).unwrap(), output.ir);
}

#[test]
fn each_run_sees_a_consistent_snapshot() {
    let ctx = TestContext::new();
    let pipeline = ctx.pipeline(ParseMode::Lenient);

    assert!(pipeline.run("SELECT * FROM notes").is_ok());

    // Removing the table affects subsequent runs, not completed ones.
    assert!(ctx.registry.remove("notes"));
    let err = pipeline.run("SELECT * FROM notes").unwrap_err();
    assert!(matches!(err.source, Error::UnknownTable(_)));
}

#[test]
fn registering_a_schema_mid_stream_is_picked_up() {
    let registry = SchemaRegistry::new();
    let pipeline = Pipeline::new(PipelineConfig::new(common::test_permissions()), registry.clone());

    assert!(pipeline.run("SELECT * FROM late").is_err());
    registry.register(
        Schema::new("late", vec![Column::new("a", TypeExpr::Nat)]).unwrap(),
    );
    assert!(pipeline.run("SELECT * FROM late").is_ok());
}

#[test]
fn pipeline_error_display_names_the_stage() {
    let err = evidence_pipeline().run("DELETE FROM evidence RATIONALE 'x'").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("parse stage failed"));
    assert!(text.contains("WHERE"));
}

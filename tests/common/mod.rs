//! Common test utilities for EVQL integration tests
#![allow(dead_code)]

use uuid::Uuid;

use evql::ir::{PermissionMetadata, ValidationLevel};
use evql::pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOutput};
use evql::registry::SchemaRegistry;
use evql::types::data_type::{TypeExpr, TypeExprKind};
use evql::types::schema::{Column, Constraint, NormalForm, Schema};
use evql::ParseMode;

/// Test context holding a registry pre-loaded with the evidence schemas.
pub struct TestContext {
    pub registry: SchemaRegistry,
    pub permissions: PermissionMetadata,
}

impl TestContext {
    pub fn new() -> Self {
        let registry = SchemaRegistry::new();
        registry.register(claims_schema());
        registry.register(sources_schema());
        registry.register(notes_schema());
        TestContext {
            registry,
            permissions: test_permissions(),
        }
    }

    /// A pipeline in the given parse mode over this context's registry.
    pub fn pipeline(&self, mode: ParseMode) -> Pipeline {
        let config = PipelineConfig::new(self.permissions.clone()).with_mode(mode);
        Pipeline::new(config, self.registry.clone())
    }

    pub fn run(&self, source: &str) -> Result<PipelineOutput, PipelineError> {
        self.pipeline(ParseMode::Lenient).run(source)
    }

    pub fn run_strict(&self, source: &str) -> Result<PipelineOutput, PipelineError> {
        self.pipeline(ParseMode::Strict).run(source)
    }
}

/// An unrestricted strict-validation profile with a fixed identity, so
/// test output is deterministic.
pub fn test_permissions() -> PermissionMetadata {
    let mut permissions = PermissionMetadata::unrestricted(
        Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888),
        "analyst",
        1_700_000_000,
    );
    permissions.validation_level = ValidationLevel::Strict;
    permissions
}

/// A profile that may only reference the given type kinds.
pub fn restricted_permissions(allowed: &[TypeExprKind]) -> PermissionMetadata {
    let mut permissions = test_permissions();
    permissions.role_id = "intern".into();
    permissions.allowed_types = allowed.iter().copied().collect();
    permissions
}

/// The main evidence table: refined columns of every flavor.
pub fn claims_schema() -> Schema {
    Schema::new(
        "claims",
        vec![
            Column::new("id", TypeExpr::Uuid).primary_key(),
            Column::new("summary", TypeExpr::NonEmptyString),
            Column::new("confidence", TypeExpr::Confidence),
            Column::new(
                "citation_count",
                TypeExpr::bounded_nat(0, 10_000).unwrap(),
            ),
            Column::new("scores", TypeExpr::PromptScores),
            Column::new("recorded_at", TypeExpr::Timestamp),
        ],
    )
    .unwrap()
    .with_constraint(Constraint::Check {
        predicate: "confidence >= 0.5 OR citation_count > 0".into(),
    })
    .with_target_normal_form(NormalForm::Third)
}

/// A secondary table exercising bounded ints/floats and tracked values.
pub fn sources_schema() -> Schema {
    Schema::new(
        "sources",
        vec![
            Column::new("name", TypeExpr::NonEmptyString).unique(),
            Column::new("year", TypeExpr::bounded_int(-500, 2100).unwrap()),
            Column::new("weight", TypeExpr::bounded_float(0.0, 1.0).unwrap()),
            Column::new(
                "reviewed",
                TypeExpr::Tracked(Box::new(TypeExpr::Bool)),
            ),
        ],
    )
    .unwrap()
}

/// A minimal unrefined table.
pub fn notes_schema() -> Schema {
    Schema::new(
        "notes",
        vec![
            Column::new("body", TypeExpr::String),
            Column::new("pinned", TypeExpr::Bool),
            Column::new("rank", TypeExpr::Nat),
        ],
    )
    .unwrap()
}

//! Validation Invariant Tests
//!
//! Tests for schema loading and validation from JSON documents:
//! - Malformed documents are structural errors
//! - Every finding names its exact location
//! - The report collects every problem in one pass
//! - Back-reference problems never block
//! - Validation is deterministic

use backbone::schema::{
    validate, ErrorCategory, FindingCode, Location, PrimaryKeyPolicy, SchemaErrorCode,
    SchemaLoader, Severity, Validator, ValidatorConfig,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn blog() -> Value {
    json!({
        "project_name": "blog",
        "db_type": "postgresql",
        "schema": [
            {
                "table_name": "users",
                "class_name": "User",
                "options": {"use_timestamps": true},
                "columns": [
                    {"name": "id", "type": "Integer", "primary_key": true, "autoincrement": true},
                    {
                        "name": "email",
                        "type": "String",
                        "length": 255,
                        "unique": true,
                        "index": true
                    }
                ],
                "relationships": [
                    {
                        "target_table": "posts",
                        "target_class": "Post",
                        "type": "one_to_many",
                        "back_populates": "author"
                    }
                ]
            },
            {
                "table_name": "posts",
                "class_name": "Post",
                "columns": [
                    {"name": "id", "type": "Integer", "primary_key": true},
                    {"name": "title", "type": "String", "length": 200},
                    {
                        "name": "author_id",
                        "type": "ForeignKey",
                        "target": "users.id",
                        "on_delete": "CASCADE"
                    }
                ],
                "relationships": [
                    {
                        "target_table": "users",
                        "target_class": "User",
                        "type": "many_to_one",
                        "name": "author",
                        "back_populates": "posts"
                    }
                ]
            }
        ]
    })
}

/// Appends a column to the table at `table`
fn with_column(mut doc: Value, table: usize, column: Value) -> Value {
    doc["schema"][table]["columns"]
        .as_array_mut()
        .unwrap()
        .push(column);
    doc
}

// =============================================================================
// Loading Tests
// =============================================================================

/// A well-formed blog schema loads and validates cleanly.
#[test]
fn test_blog_schema_is_accepted() {
    let doc = SchemaLoader::from_value(blog()).unwrap();
    let report = validate(&doc);

    assert!(report.is_accepted(), "{}", report.summary());
    assert_eq!(doc.tables.len(), 2);
    assert!(doc.table("users").unwrap().options.use_timestamps);
}

/// Invalid JSON is a structural error.
#[test]
fn test_invalid_json_is_structural() {
    let err = SchemaLoader::parse("{\"project_name\": ").unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::SchemaInvalidJson);
    assert_eq!(err.code().category(), ErrorCategory::Structural);
}

/// Unknown column types are rejected at load time.
#[test]
fn test_unknown_column_type_is_malformed() {
    let doc = with_column(blog(), 0, json!({"name": "avatar", "type": "Blob"}));
    let err = SchemaLoader::from_value(doc).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::SchemaInvalidShape);
    assert_eq!(err.to_finding().code, FindingCode::MalformedDocument);
}

// =============================================================================
// Referential Integrity Tests
// =============================================================================

/// A missing FK target table is reported at the exact column.
#[test]
fn test_missing_fk_table_reported_at_column() {
    let doc = with_column(
        blog(),
        1,
        json!({"name": "category_id", "type": "ForeignKey", "target": "categories.id"}),
    );
    let report = validate(&SchemaLoader::from_value(doc).unwrap());

    let finding = report.with_code(FindingCode::FkTableNotFound).next().unwrap();
    assert_eq!(finding.location, Location::column("posts", "category_id"));
    assert_eq!(finding.category(), ErrorCategory::Referential);
    assert_eq!(report.error_count(), 1);
}

/// A missing FK target column is reported at the exact column.
#[test]
fn test_missing_fk_column_reported_at_column() {
    let doc = with_column(
        blog(),
        1,
        json!({"name": "editor_id", "type": "ForeignKey", "target": "users.uuid"}),
    );
    let report = validate(&SchemaLoader::from_value(doc).unwrap());

    let finding = report.with_code(FindingCode::FkColumnNotFound).next().unwrap();
    assert_eq!(finding.location, Location::column("posts", "editor_id"));
}

/// One pass reports problems from every table.
#[test]
fn test_report_collects_all_findings() {
    let mut doc = blog();
    doc = with_column(doc, 0, json!({"name": "role", "type": "Enum", "values": []}));
    doc = with_column(doc, 1, json!({"name": "slug", "type": "String", "length": 0}));
    doc = with_column(
        doc,
        1,
        json!({"name": "price", "type": "Numeric", "precision": 4, "scale": 6}),
    );

    let report = validate(&SchemaLoader::from_value(doc).unwrap());

    assert_eq!(report.with_code(FindingCode::EmptyEnumValues).count(), 1);
    assert_eq!(report.with_code(FindingCode::InvalidStringLength).count(), 1);
    assert_eq!(report.with_code(FindingCode::InvalidNumericPrecision).count(), 1);
    assert!(report.error_count() >= 3);
}

/// A back_populates that matches nothing is a warning, not an error.
#[test]
fn test_back_populates_mismatch_is_warning() {
    let mut doc = blog();
    doc["schema"][0]["relationships"][0]["back_populates"] = json!("writer");
    let report = validate(&SchemaLoader::from_value(doc).unwrap());

    let finding = report
        .with_code(FindingCode::RelBackPopulatesMismatch)
        .next()
        .unwrap();
    assert_eq!(finding.severity, Severity::Warning);
    assert!(report.is_accepted());
}

/// A parent-side one_to_one may name the key held by the child table.
#[test]
fn test_one_to_one_key_on_target_table() {
    let doc = json!({
        "project_name": "accounts",
        "db_type": "postgresql",
        "schema": [
            {
                "table_name": "users",
                "class_name": "User",
                "columns": [{"name": "id", "type": "Integer", "primary_key": true}],
                "relationships": [{
                    "target_table": "profiles",
                    "target_class": "Profile",
                    "type": "one_to_one",
                    "foreign_key": "user_id",
                    "back_populates": "user"
                }]
            },
            {
                "table_name": "profiles",
                "class_name": "Profile",
                "columns": [
                    {"name": "id", "type": "Integer", "primary_key": true},
                    {
                        "name": "user_id",
                        "type": "ForeignKey",
                        "target": "users.id",
                        "unique": true
                    }
                ],
                "relationships": [{
                    "target_table": "users",
                    "target_class": "User",
                    "type": "one_to_one",
                    "name": "user",
                    "back_populates": "profile"
                }]
            }
        ]
    });
    let report = validate(&SchemaLoader::from_value(doc).unwrap());

    assert!(report.findings().is_empty(), "{}", report.summary());
}

// =============================================================================
// Primary Key Policy Tests
// =============================================================================

/// Composite keys are rejected by default and allowed by policy.
#[test]
fn test_composite_key_policy() {
    let doc = with_column(
        blog(),
        1,
        json!({"name": "revision", "type": "Integer", "primary_key": true}),
    );
    let doc = SchemaLoader::from_value(doc).unwrap();

    let strict = validate(&doc);
    let finding = strict
        .with_code(FindingCode::MultiplePrimaryKeys)
        .next()
        .unwrap();
    assert_eq!(finding.location.table_name(), Some("posts"));

    let lenient = Validator::with_config(ValidatorConfig {
        primary_key_policy: PrimaryKeyPolicy::AtLeastOne,
        ..ValidatorConfig::default()
    })
    .validate(&doc);
    assert_eq!(lenient.with_code(FindingCode::MultiplePrimaryKeys).count(), 0);
}

// =============================================================================
// Determinism Tests
// =============================================================================

/// Same document, same report.
#[test]
fn test_validation_is_deterministic() {
    let doc = with_column(
        blog(),
        1,
        json!({"name": "category_id", "type": "ForeignKey", "target": "categories.id"}),
    );
    let doc = SchemaLoader::from_value(doc).unwrap();

    let first = validate(&doc);
    for _ in 0..50 {
        assert_eq!(validate(&doc), first);
    }
}

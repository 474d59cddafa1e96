//! Schema subsystem for backbone
//!
//! A schema document declares tables, columns, foreign keys and
//! relationships. This module loads documents and validates them before
//! anything is planned or generated.
//!
//! # Design Principles
//!
//! - Validation accumulates every finding instead of stopping early
//! - Findings carry stable codes and precise locations
//! - Documents are never mutated by validation
//! - Deterministic validation

mod errors;
mod loader;
mod report;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use loader::SchemaLoader;
pub use report::{ErrorCategory, Finding, FindingCode, Location, Severity, ValidationReport};
pub use types::{
    parse_reference, ColumnSpec, ColumnType, DatabaseKind, OnDeleteAction, RelationshipKind,
    RelationshipSpec, SchemaDocument, TableOptions, TableSpec,
};
pub use validator::{validate, PrimaryKeyPolicy, Validator, ValidatorConfig};

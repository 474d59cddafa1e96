//! Planner error types
//!
//! Error codes:
//! - PLAN_UNKNOWN_TABLE: build order names a table absent from the document
//! - PLAN_DUPLICATE_TABLE: build order lists a table twice
//! - PLAN_MISSING_TABLE: build order omits a document table
//! - PLAN_UNRESOLVED_FOREIGN_KEY: a foreign key target cannot be resolved
//!
//! All planner errors mean the document and order are inconsistent; the
//! validator and graph normally rule them out before planning.

use std::fmt;

use crate::schema::{ErrorCategory, Finding, FindingCode, Location};

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Order names a table the document does not declare
    PlanUnknownTable,
    /// Order lists a table more than once
    PlanDuplicateTable,
    /// Order leaves out a declared table
    PlanMissingTable,
    /// Foreign key target is malformed or dangling
    PlanUnresolvedForeignKey,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::PlanUnknownTable => "PLAN_UNKNOWN_TABLE",
            PlannerErrorCode::PlanDuplicateTable => "PLAN_DUPLICATE_TABLE",
            PlannerErrorCode::PlanMissingTable => "PLAN_MISSING_TABLE",
            PlannerErrorCode::PlanUnresolvedForeignKey => "PLAN_UNRESOLVED_FOREIGN_KEY",
        }
    }

    /// Returns the taxonomy category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            PlannerErrorCode::PlanUnresolvedForeignKey => ErrorCategory::Referential,
            _ => ErrorCategory::Structural,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Table the error concerns
    table: String,
    /// Column if applicable
    column: Option<String>,
}

impl PlannerError {
    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: PlannerErrorCode::PlanUnknownTable,
            message: format!("Build order names unknown table '{}'", table),
            table,
            column: None,
        }
    }

    /// Create a duplicate table error
    pub fn duplicate_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: PlannerErrorCode::PlanDuplicateTable,
            message: format!("Build order lists table '{}' more than once", table),
            table,
            column: None,
        }
    }

    /// Create a missing table error
    pub fn missing_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: PlannerErrorCode::PlanMissingTable,
            message: format!("Build order omits table '{}'", table),
            table,
            column: None,
        }
    }

    /// Create an unresolved foreign key error
    pub fn unresolved_foreign_key(
        table: impl Into<String>,
        column: impl Into<String>,
        target: &str,
    ) -> Self {
        let table = table.into();
        let column = column.into();
        Self {
            code: PlannerErrorCode::PlanUnresolvedForeignKey,
            message: format!(
                "Foreign key '{}.{}' target '{}' cannot be resolved",
                table, column, target
            ),
            table,
            column: Some(column),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column name if applicable
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Converts into a finding for a rejection report
    pub fn to_finding(&self) -> Finding {
        let location = match &self.column {
            Some(column) => Location::column(&self.table, column),
            None => Location::Document,
        };
        Finding::error(FindingCode::PlanResolutionFailed, location, self.message.clone())
            .with_rule(self.code.code())
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.category(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

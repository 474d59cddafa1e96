//! Validation findings and reports
//!
//! Every finding carries a stable code, a category from the error taxonomy,
//! a severity, and a location precise enough to point at the offending
//! table, column, relationship, or generated artifact.
//!
//! Categories:
//! - STRUCTURAL (terminal)
//! - REFERENTIAL (terminal)
//! - CYCLE (terminal)
//! - GENERATION (retryable)
//! - OUTPUT_QUALITY (retryable)

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Finding severity. Only errors block a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error taxonomy category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed schema shape
    Structural,
    /// Dangling reference or missing junction
    Referential,
    /// Hard dependency cycle among tables
    Cycle,
    /// Collaborator failed to produce artifacts
    Generation,
    /// Generated artifacts failed post-generation checks
    OutputQuality,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Structural => "STRUCTURAL",
            ErrorCategory::Referential => "REFERENTIAL",
            ErrorCategory::Cycle => "CYCLE",
            ErrorCategory::Generation => "GENERATION",
            ErrorCategory::OutputQuality => "OUTPUT_QUALITY",
        }
    }

    /// Whether a failure in this category can be recovered by regenerating
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Generation | ErrorCategory::OutputQuality)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable finding codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    // Structural
    MalformedDocument,
    EmptySchema,
    InvalidProjectName,
    TooManyTables,
    DuplicateTable,
    DuplicateClassName,
    InvalidTableName,
    InvalidClassName,
    NoColumns,
    TooManyColumns,
    TooManyRelationships,
    DuplicateColumn,
    MissingPrimaryKey,
    MultiplePrimaryKeys,
    NullablePrimaryKey,
    EmptyEnumValues,
    DuplicateEnumValue,
    InvalidStringLength,
    InvalidNumericPrecision,
    InvalidForeignKeyFormat,
    /// Build order and document disagree
    PlanResolutionFailed,

    // Referential
    FkTableNotFound,
    FkColumnNotFound,
    FkTargetNotUnique,
    RelTableNotFound,
    RelForeignKeyNotFound,
    RelBackPopulatesMismatch,
    RelKindAsymmetric,
    JunctionNotFound,
    JunctionMissingForeignKey,

    // Cycle
    CircularDependency,

    // Generation
    GenerationFailed,
    GenerationTimeout,

    // Output quality
    OutputCheckFailed,
}

impl FindingCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            FindingCode::MalformedDocument => "MALFORMED_DOCUMENT",
            FindingCode::EmptySchema => "EMPTY_SCHEMA",
            FindingCode::InvalidProjectName => "INVALID_PROJECT_NAME",
            FindingCode::TooManyTables => "TOO_MANY_TABLES",
            FindingCode::DuplicateTable => "DUPLICATE_TABLE",
            FindingCode::DuplicateClassName => "DUPLICATE_CLASS_NAME",
            FindingCode::InvalidTableName => "INVALID_TABLE_NAME",
            FindingCode::InvalidClassName => "INVALID_CLASS_NAME",
            FindingCode::NoColumns => "NO_COLUMNS",
            FindingCode::TooManyColumns => "TOO_MANY_COLUMNS",
            FindingCode::TooManyRelationships => "TOO_MANY_RELATIONSHIPS",
            FindingCode::DuplicateColumn => "DUPLICATE_COLUMN",
            FindingCode::MissingPrimaryKey => "MISSING_PRIMARY_KEY",
            FindingCode::MultiplePrimaryKeys => "MULTIPLE_PRIMARY_KEYS",
            FindingCode::NullablePrimaryKey => "NULLABLE_PRIMARY_KEY",
            FindingCode::EmptyEnumValues => "EMPTY_ENUM_VALUES",
            FindingCode::DuplicateEnumValue => "DUPLICATE_ENUM_VALUE",
            FindingCode::InvalidStringLength => "INVALID_STRING_LENGTH",
            FindingCode::InvalidNumericPrecision => "INVALID_NUMERIC_PRECISION",
            FindingCode::InvalidForeignKeyFormat => "INVALID_FOREIGN_KEY_FORMAT",
            FindingCode::PlanResolutionFailed => "PLAN_RESOLUTION_FAILED",
            FindingCode::FkTableNotFound => "FK_TABLE_NOT_FOUND",
            FindingCode::FkColumnNotFound => "FK_COLUMN_NOT_FOUND",
            FindingCode::FkTargetNotUnique => "FK_TARGET_NOT_UNIQUE",
            FindingCode::RelTableNotFound => "REL_TABLE_NOT_FOUND",
            FindingCode::RelForeignKeyNotFound => "REL_FOREIGN_KEY_NOT_FOUND",
            FindingCode::RelBackPopulatesMismatch => "REL_BACK_POPULATES_MISMATCH",
            FindingCode::RelKindAsymmetric => "REL_KIND_ASYMMETRIC",
            FindingCode::JunctionNotFound => "JUNCTION_NOT_FOUND",
            FindingCode::JunctionMissingForeignKey => "JUNCTION_MISSING_FOREIGN_KEY",
            FindingCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            FindingCode::GenerationFailed => "GENERATION_FAILED",
            FindingCode::GenerationTimeout => "GENERATION_TIMEOUT",
            FindingCode::OutputCheckFailed => "OUTPUT_CHECK_FAILED",
        }
    }

    /// Returns the taxonomy category for this code
    pub fn category(&self) -> ErrorCategory {
        match self {
            FindingCode::MalformedDocument
            | FindingCode::EmptySchema
            | FindingCode::InvalidProjectName
            | FindingCode::TooManyTables
            | FindingCode::DuplicateTable
            | FindingCode::DuplicateClassName
            | FindingCode::InvalidTableName
            | FindingCode::InvalidClassName
            | FindingCode::NoColumns
            | FindingCode::TooManyColumns
            | FindingCode::TooManyRelationships
            | FindingCode::DuplicateColumn
            | FindingCode::MissingPrimaryKey
            | FindingCode::MultiplePrimaryKeys
            | FindingCode::NullablePrimaryKey
            | FindingCode::EmptyEnumValues
            | FindingCode::DuplicateEnumValue
            | FindingCode::InvalidStringLength
            | FindingCode::InvalidNumericPrecision
            | FindingCode::InvalidForeignKeyFormat
            | FindingCode::PlanResolutionFailed => ErrorCategory::Structural,
            FindingCode::FkTableNotFound
            | FindingCode::FkColumnNotFound
            | FindingCode::FkTargetNotUnique
            | FindingCode::RelTableNotFound
            | FindingCode::RelForeignKeyNotFound
            | FindingCode::RelBackPopulatesMismatch
            | FindingCode::RelKindAsymmetric
            | FindingCode::JunctionNotFound
            | FindingCode::JunctionMissingForeignKey => ErrorCategory::Referential,
            FindingCode::CircularDependency => ErrorCategory::Cycle,
            FindingCode::GenerationFailed | FindingCode::GenerationTimeout => {
                ErrorCategory::Generation
            }
            FindingCode::OutputCheckFailed => ErrorCategory::OutputQuality,
        }
    }

    /// Returns the severity this code is reported with
    pub fn default_severity(&self) -> Severity {
        match self {
            FindingCode::DuplicateEnumValue
            | FindingCode::RelBackPopulatesMismatch
            | FindingCode::RelKindAsymmetric
            | FindingCode::JunctionMissingForeignKey => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where a finding applies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Document,
    Table {
        table: String,
        /// Position of the table in the document
        index: usize,
    },
    Column {
        table: String,
        column: String,
    },
    Relationship {
        table: String,
        target: String,
        /// Position of the relationship within its table
        index: usize,
    },
    Artifact {
        artifact: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
    },
}

impl Location {
    pub fn table(table: impl Into<String>, index: usize) -> Self {
        Location::Table {
            table: table.into(),
            index,
        }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Location::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn relationship(table: impl Into<String>, target: impl Into<String>, index: usize) -> Self {
        Location::Relationship {
            table: table.into(),
            target: target.into(),
            index,
        }
    }

    pub fn artifact(artifact: impl Into<String>) -> Self {
        Location::Artifact {
            artifact: artifact.into(),
            line: None,
        }
    }

    /// Table this location points into, if any
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Location::Table { table, .. }
            | Location::Column { table, .. }
            | Location::Relationship { table, .. } => Some(table),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Document => write!(f, "$document"),
            Location::Table { table, index } => write!(f, "{} (table #{})", table, index),
            Location::Column { table, column } => write!(f, "{}.{}", table, column),
            Location::Relationship {
                table,
                target,
                index,
            } => write!(f, "{} -> {} (relationship #{})", table, target, index),
            Location::Artifact {
                artifact,
                line: Some(line),
            } => write!(f, "{}:{}", artifact, line),
            Location::Artifact { artifact, line: None } => write!(f, "{}", artifact),
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    pub location: Location,
    pub message: String,
    /// Other locations involved (e.g. the first declaration of a duplicate)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Location>,
    /// External rule identifier reported by an output checker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Finding {
    /// Create a finding with the code's default severity
    pub fn new(code: FindingCode, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            location,
            message: message.into(),
            related: Vec::new(),
            rule: None,
        }
    }

    pub fn error(code: FindingCode, location: Location, message: impl Into<String>) -> Self {
        Self::new(code, location, message).with_severity(Severity::Error)
    }

    pub fn warning(code: FindingCode, location: Location, message: impl Into<String>) -> Self {
        Self::new(code, location, message).with_severity(Severity::Warning)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_related(mut self, location: Location) -> Self {
        self.related.push(location);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.code, self.location, self.message
        )?;
        if let Some(rule) = &self.rule {
            write!(f, " (rule {})", rule)?;
        }
        Ok(())
    }
}

/// Ordered set of findings from one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_findings(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub(crate) fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(Finding::is_error)
    }

    /// Zero errors means the schema may proceed; warnings do not block
    pub fn is_accepted(&self) -> bool {
        !self.has_errors()
    }

    /// Tables with at least one error, ascending
    pub fn error_tables(&self) -> Vec<&str> {
        self.errors()
            .filter_map(|f| f.location.table_name())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the findings carrying the given code
    pub fn with_code(&self, code: FindingCode) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.code == code)
    }

    pub fn summary(&self) -> String {
        if self.is_accepted() {
            format!("accepted with {} warning(s)", self.warning_count())
        } else {
            format!(
                "rejected: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            )
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation report: {}", self.summary())?;
        for finding in &self.findings {
            writeln!(f, "  - {}", finding)?;
        }
        Ok(())
    }
}

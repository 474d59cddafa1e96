//! Schema loading error types
//!
//! Error codes:
//! - SCHEMA_IO_FAILED: schema file could not be read
//! - SCHEMA_INVALID_JSON: input is not well-formed JSON
//! - SCHEMA_INVALID_SHAPE: JSON is well-formed but does not describe a schema
//!   document (missing required fields, wrong types, unknown tags)
//!
//! All loader errors are structural: regenerating output never fixes them.

use std::fmt;

use super::report::{ErrorCategory, Finding, FindingCode, Location};

/// Schema loader error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema file could not be read
    SchemaIoFailed,
    /// Input is not valid JSON
    SchemaInvalidJson,
    /// JSON does not match the schema document shape
    SchemaInvalidShape,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::SchemaIoFailed => "SCHEMA_IO_FAILED",
            SchemaErrorCode::SchemaInvalidJson => "SCHEMA_INVALID_JSON",
            SchemaErrorCode::SchemaInvalidShape => "SCHEMA_INVALID_SHAPE",
        }
    }

    /// Returns the taxonomy category for this error
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema loading error with full context
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Source path if loaded from disk
    path: Option<String>,
    /// 1-based line and column reported by the JSON parser
    position: Option<(usize, usize)>,
}

impl SchemaError {
    /// Create an I/O error for a schema file
    pub fn io_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::SchemaIoFailed,
            message: format!("Failed to read schema file '{}': {}", path, reason.into()),
            path: Some(path),
            position: None,
        }
    }

    /// Create an error from a serde_json parse failure
    pub fn from_json(err: &serde_json::Error) -> Self {
        let code = match err.classify() {
            serde_json::error::Category::Data => SchemaErrorCode::SchemaInvalidShape,
            _ => SchemaErrorCode::SchemaInvalidJson,
        };
        let position = if err.line() > 0 {
            Some((err.line(), err.column()))
        } else {
            None
        };
        Self {
            code,
            message: err.to_string(),
            path: None,
            position,
        }
    }

    /// Attach the source path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source path if applicable
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the parser position (line, column) if known
    pub fn position(&self) -> Option<(usize, usize)> {
        self.position
    }

    /// Converts into a document-level structural finding
    pub fn to_finding(&self) -> Finding {
        Finding::error(FindingCode::MalformedDocument, Location::Document, self.to_string())
            .with_rule(self.code.code())
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.category(), self.code.code(), self.message)?;
        if let Some(path) = &self.path {
            write!(f, " [in {}]", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema loading
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::SchemaIoFailed.code(), "SCHEMA_IO_FAILED");
        assert_eq!(SchemaErrorCode::SchemaInvalidJson.code(), "SCHEMA_INVALID_JSON");
        assert_eq!(SchemaErrorCode::SchemaInvalidShape.code(), "SCHEMA_INVALID_SHAPE");
    }

    #[test]
    fn test_syntax_vs_shape_classification() {
        let syntax = serde_json::from_str::<serde_json::Value>("{\"a\": [}").unwrap_err();
        assert_eq!(SchemaError::from_json(&syntax).code(), SchemaErrorCode::SchemaInvalidJson);

        let shape = serde_json::from_str::<Vec<u32>>("{\"a\": 1}").unwrap_err();
        assert_eq!(SchemaError::from_json(&shape).code(), SchemaErrorCode::SchemaInvalidShape);
    }

    #[test]
    fn test_display_includes_category_and_path() {
        let err = SchemaError::io_failed("/tmp/missing.json", "not found");
        let display = format!("{}", err);
        assert!(display.contains("STRUCTURAL"));
        assert!(display.contains("SCHEMA_IO_FAILED"));
        assert!(display.contains("/tmp/missing.json"));
    }

    #[test]
    fn test_finding_is_structural_error() {
        let err = SchemaError::io_failed("x.json", "denied");
        let finding = err.to_finding();
        assert!(finding.is_error());
        assert_eq!(finding.category(), ErrorCategory::Structural);
        assert_eq!(finding.rule.as_deref(), Some("SCHEMA_IO_FAILED"));
    }
}

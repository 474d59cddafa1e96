//! CLI-specific error types
//!
//! Every CLI error ends the process with exit code 1.

use std::fmt;
use std::io;

use crate::schema::SchemaError;
use crate::workflow::WorkflowError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Schema document could not be loaded
    SchemaLoadFailed,
    /// Schema has error findings
    SchemaRejected,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "BACKBONE_CLI_CONFIG_ERROR",
            Self::IoError => "BACKBONE_CLI_IO_ERROR",
            Self::SchemaLoadFailed => "BACKBONE_CLI_SCHEMA_LOAD_FAILED",
            Self::SchemaRejected => "BACKBONE_CLI_SCHEMA_REJECTED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Schema rejected with `errors` error findings
    pub fn schema_rejected(errors: usize) -> Self {
        Self::new(
            CliErrorCode::SchemaRejected,
            format!("Schema rejected with {} error(s)", errors),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::SchemaLoadFailed, e.to_string())
    }
}

impl From<WorkflowError> for CliError {
    fn from(e: WorkflowError) -> Self {
        Self::config_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::schema_rejected(2);
        assert_eq!(
            err.to_string(),
            "BACKBONE_CLI_SCHEMA_REJECTED: Schema rejected with 2 error(s)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: CliError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), &CliErrorCode::IoError);
        assert!(err.message().contains("gone"));
    }
}

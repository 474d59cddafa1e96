//! # Workflow Errors

use thiserror::Error;

use crate::schema::{Finding, FindingCode, Location};

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// State machine and configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("forbidden transition: {from} → {to}")]
    ForbiddenTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Failed to read config: {0}")]
    ConfigRead(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl WorkflowError {
    /// Create a forbidden transition error.
    pub fn forbidden_transition(from: &'static str, to: &'static str) -> Self {
        WorkflowError::ForbiddenTransition { from, to }
    }
}

/// Collaborator failure. Always retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl GenerationError {
    /// Converts into a generation-category finding
    pub fn to_finding(&self) -> Finding {
        let code = match self {
            GenerationError::Failed(_) => FindingCode::GenerationFailed,
            GenerationError::Timeout(_) => FindingCode::GenerationTimeout,
        };
        Finding::error(code, Location::Document, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ErrorCategory;

    #[test]
    fn test_forbidden_transition_message() {
        let err = WorkflowError::forbidden_transition("Idle", "Succeeded");
        assert_eq!(err.to_string(), "forbidden transition: Idle → Succeeded");
    }

    #[test]
    fn test_generation_errors_are_retryable_findings() {
        let failed = GenerationError::Failed("provider returned 500".into()).to_finding();
        assert_eq!(failed.code, FindingCode::GenerationFailed);
        assert!(failed.category().is_retryable());

        let timeout = GenerationError::Timeout(300_000).to_finding();
        assert_eq!(timeout.code, FindingCode::GenerationTimeout);
        assert_eq!(timeout.category(), ErrorCategory::Generation);
        assert!(timeout.message.contains("300000ms"));
    }
}

//! Pipeline configuration
//!
//! Loaded from JSON. Every field is optional; an empty object yields the
//! defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{WorkflowError, WorkflowResult};
use crate::observability::{log_event_with_fields, Event, Severity};
use crate::schema::ValidatorConfig;

/// Tie-break rule for tables with no ordering constraint between them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Ascending table name. The only supported rule.
    #[default]
    ByName,
}

/// Pipeline run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Max routes back to generation per run (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub tie_break: TieBreak,

    /// Generator call timeout (default: 300000)
    #[serde(default = "default_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Output validator call timeout (default: 300000)
    #[serde(default = "default_timeout_ms")]
    pub output_validation_timeout_ms: u64,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub validator: ValidatorConfig,
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            tie_break: TieBreak::default(),
            generation_timeout_ms: default_timeout_ms(),
            output_validation_timeout_ms: default_timeout_ms(),
            log_level: default_log_level(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> WorkflowResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| WorkflowError::ConfigRead(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;

        let path = path.display().to_string();
        let retries = config.max_retries.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.as_str()), ("max_retries", retries.as_str())],
        );

        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn parse(json: &str) -> WorkflowResult<Self> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| WorkflowError::InvalidConfig(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.generation_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "generation_timeout_ms must be > 0".into(),
            ));
        }

        if self.output_validation_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "output_validation_timeout_ms must be > 0".into(),
            ));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(WorkflowError::InvalidConfig(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            )));
        }

        if self.validator.max_tables == 0
            || self.validator.max_columns_per_table == 0
            || self.validator.max_relationships_per_table == 0
        {
            return Err(WorkflowError::InvalidConfig(
                "validator limits must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn output_validation_timeout(&self) -> Duration {
        Duration::from_millis(self.output_validation_timeout_ms)
    }

    /// Parsed log level; falls back to INFO for unvalidated configs
    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimaryKeyPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = PipelineConfig::parse("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.generation_timeout(), Duration::from_secs(300));
        assert_eq!(config.tie_break, TieBreak::ByName);
    }

    #[test]
    fn test_nested_validator_section() {
        let config = PipelineConfig::parse(
            r#"{
                "max_retries": 0,
                "validator": {"primary_key_policy": "at_least_one", "max_tables": 10}
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.validator.primary_key_policy, PrimaryKeyPolicy::AtLeastOne);
        assert_eq!(config.validator.max_tables, 10);
        assert_eq!(config.validator.max_columns_per_table, 100);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = PipelineConfig::parse(r#"{"generation_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = PipelineConfig::parse(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_rejects_unknown_tie_break() {
        assert!(PipelineConfig::parse(r#"{"tie_break": "random"}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"max_retries": 5, "log_level": "warn"}"#)
            .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.log_severity(), Severity::Warn);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, WorkflowError::ConfigRead(_)));
    }
}

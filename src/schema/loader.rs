//! Schema loader
//!
//! Parses JSON schema documents from strings or files. The loader only checks
//! shape; every semantic rule is left to the validator so that a caller sees
//! all problems at once.

use std::fs;
use std::path::Path;

use crate::observability::{log_event_with_fields, Event};

use super::errors::{SchemaError, SchemaResult};
use super::types::SchemaDocument;

/// Reads schema documents
pub struct SchemaLoader;

impl SchemaLoader {
    /// Parses a schema document from JSON text.
    pub fn parse(json: &str) -> SchemaResult<SchemaDocument> {
        serde_json::from_str(json).map_err(|e| SchemaError::from_json(&e))
    }

    /// Parses a schema document from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> SchemaResult<SchemaDocument> {
        serde_json::from_value(value).map_err(|e| SchemaError::from_json(&e))
    }

    /// Loads a schema document from a file.
    ///
    /// # Errors
    ///
    /// - SCHEMA_IO_FAILED if the file cannot be read
    /// - SCHEMA_INVALID_JSON / SCHEMA_INVALID_SHAPE if parsing fails
    pub fn load(path: &Path) -> SchemaResult<SchemaDocument> {
        let display = path.display().to_string();

        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::io_failed(display.clone(), e.to_string()))?;

        let doc = Self::parse(&content).map_err(|e| e.with_path(display.clone()))?;

        let tables = doc.tables.len().to_string();
        log_event_with_fields(
            Event::SchemaLoaded,
            &[
                ("path", display.as_str()),
                ("project", doc.project_name.as_str()),
                ("tables", tables.as_str()),
            ],
        );

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::SchemaErrorCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BLOG: &str = r#"{
        "project_name": "Blog",
        "db_type": "sqlite",
        "schema": [
            {
                "table_name": "users",
                "class_name": "User",
                "options": {"use_timestamps": true},
                "columns": [
                    {"name": "id", "type": "Integer", "primary_key": true},
                    {"name": "email", "type": "String", "length": 120, "unique": true}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_load_from_str() {
        let doc = SchemaLoader::parse(BLOG).unwrap();
        assert_eq!(doc.project_name, "Blog");
        assert_eq!(doc.tables.len(), 1);
        assert!(doc.tables[0].options.use_timestamps);
        assert!(!doc.tables[0].options.use_soft_delete);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BLOG.as_bytes()).unwrap();

        let doc = SchemaLoader::load(file.path()).unwrap();
        assert_eq!(doc.tables[0].table_name, "users");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaLoader::load(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SchemaIoFailed);
        assert!(err.path().unwrap().ends_with("nope.json"));
    }

    #[test]
    fn test_broken_json_is_rejected() {
        let err = SchemaLoader::parse(r#"{"project_name": "Test", "schema": [}"#).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SchemaInvalidJson);
        assert!(err.position().is_some());
    }

    #[test]
    fn test_missing_required_field_is_shape_error() {
        // ForeignKey without target
        let err = SchemaLoader::parse(
            r#"{
                "project_name": "Test",
                "db_type": "postgresql",
                "schema": [{
                    "table_name": "posts",
                    "class_name": "Post",
                    "columns": [{"name": "author_id", "type": "ForeignKey"}]
                }]
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SchemaInvalidShape);
    }

    #[test]
    fn test_unknown_column_type_is_shape_error() {
        let err = SchemaLoader::parse(
            r#"{
                "project_name": "Test",
                "db_type": "postgresql",
                "schema": [{
                    "table_name": "t",
                    "class_name": "T",
                    "columns": [{"name": "id", "type": "Uuid"}]
                }]
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SchemaInvalidShape);
    }
}

//! Architecture plan types
//!
//! A plan is immutable once resolved. Its canonical JSON form is stable, so
//! two resolutions of the same inputs share a fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schema::{ColumnType, DatabaseKind, OnDeleteAction, RelationshipKind};

/// A capability (mixin) composed into a generated model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    /// Always first in every stack
    Base,
    /// Provides created_at and updated_at
    Timestamps,
    /// Provides is_deleted and deleted_at
    SoftDelete,
    Custom(String),
}

impl Capability {
    /// Maps a declared capability name; the built-in names are reserved
    pub fn from_name(name: &str) -> Self {
        match name {
            "base" => Capability::Base,
            "timestamps" => Capability::Timestamps,
            "soft_delete" => Capability::SoftDelete,
            other => Capability::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Capability::Base => "base",
            Capability::Timestamps => "timestamps",
            Capability::SoftDelete => "soft_delete",
            Capability::Custom(name) => name,
        }
    }

    /// Columns this capability adds to a model
    pub fn provided_columns(&self) -> &'static [&'static str] {
        match self {
            Capability::Timestamps => &["created_at", "updated_at"],
            Capability::SoftDelete => &["is_deleted", "deleted_at"],
            _ => &[],
        }
    }
}

impl From<String> for Capability {
    fn from(name: String) -> Self {
        Capability::from_name(&name)
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.name().to_string()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolved foreign key target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub on_delete: OnDeleteAction,
    pub self_referencing: bool,
}

/// Build instruction for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInstruction {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub unique: bool,
    /// Resolved nullability
    pub nullable: bool,
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    /// Capability that already supplies a column of this name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<Capability>,
}

/// Build instruction for one relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInstruction {
    /// Attribute name on the owning class
    pub attribute_name: String,
    pub target_table: String,
    pub target_class: String,
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_populates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction_table: Option<String>,
    pub target_verified: bool,
    pub self_referencing: bool,
}

/// Everything needed to generate one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub table_name: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered, deduplicated, always starting with base
    pub capabilities: Vec<Capability>,
    pub columns: Vec<ColumnInstruction>,
    pub relationships: Vec<RelationshipInstruction>,
    /// Tables that must be built first, ascending, self excluded
    pub depends_on: Vec<String>,
}

impl BuildSpec {
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInstruction> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Advisory note kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    CompositePrimaryKey,
    SelfReferential,
    ManyToManyJunction,
}

/// Advisory note attached to a plan; never blocks generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanNote {
    pub kind: NoteKind,
    pub table: String,
    pub message: String,
}

/// Ordered build plan for a whole schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitecturePlan {
    pub project_name: String,
    pub database: DatabaseKind,
    pub build_order: Vec<String>,
    /// One spec per table, in build order
    pub specs: Vec<BuildSpec>,
    pub notes: Vec<PlanNote>,
}

impl ArchitecturePlan {
    pub fn spec(&self, table: &str) -> Option<&BuildSpec> {
        self.specs.iter().find(|s| s.table_name == table)
    }

    pub fn total_tables(&self) -> usize {
        self.specs.len()
    }

    pub fn total_columns(&self) -> usize {
        self.specs.iter().map(|s| s.columns.len()).sum()
    }

    pub fn total_relationships(&self) -> usize {
        self.specs.iter().map(|s| s.relationships.len()).sum()
    }

    /// Canonical JSON form. Field order is fixed by the struct definitions.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Hex SHA-256 of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_json().unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names_round_trip_through_strings() {
        assert_eq!(Capability::from_name("timestamps"), Capability::Timestamps);
        assert_eq!(Capability::from_name("soft_delete"), Capability::SoftDelete);
        assert_eq!(
            Capability::from_name("auditable"),
            Capability::Custom("auditable".into())
        );
        assert_eq!(
            serde_json::to_value(Capability::SoftDelete).unwrap(),
            serde_json::json!("soft_delete")
        );
    }

    #[test]
    fn test_capability_columns() {
        assert_eq!(
            Capability::Timestamps.provided_columns(),
            &["created_at", "updated_at"]
        );
        assert!(Capability::Base.provided_columns().is_empty());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let plan = ArchitecturePlan {
            project_name: "Blog".into(),
            database: DatabaseKind::Sqlite,
            build_order: vec![],
            specs: vec![],
            notes: vec![],
        };
        let mut other = plan.clone();
        assert_eq!(plan.fingerprint(), other.fingerprint());
        assert_eq!(plan.fingerprint().len(), 64);

        other.project_name = "Shop".into();
        assert_ne!(plan.fingerprint(), other.fingerprint());
    }
}

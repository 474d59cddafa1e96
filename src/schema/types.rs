//! Schema document type definitions
//!
//! Supported column types:
//! - Integer, Float, Boolean, Text
//! - String: requires a positive `length`
//! - Numeric: requires `precision`, optional `scale`
//! - Enum: requires a non-empty `values` list
//! - DateTime, Date, Time
//! - ForeignKey: requires a `target` of the form `table.column`
//!
//! The JSON shape keeps the column type tag and its parameters flat on the
//! column object, e.g. `{"name": "title", "type": "String", "length": 200}`.

use serde::{Deserialize, Serialize};

/// Target database kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgresql,
    Mysql,
    Sqlite,
    Mssql,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Postgresql => "postgresql",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Sqlite => "sqlite",
            DatabaseKind::Mssql => "mssql",
        }
    }
}

/// Referential action applied when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OnDeleteAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
}

/// Declared column type, tagged by the JSON `type` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    /// Variable-length string. Length is checked by the validator, not here,
    /// so that a missing or non-positive length is reported as a finding.
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<i64>,
    },
    /// Fixed-point number with `precision` total digits and `scale` fractional digits
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<i64>,
    },
    Enum {
        #[serde(default)]
        values: Vec<String>,
    },
    DateTime,
    Date,
    Time,
    /// Reference to another table's column, `target` = "table.column"
    ForeignKey {
        target: String,
        #[serde(default)]
        on_delete: OnDeleteAction,
    },
}

impl ColumnType {
    /// Returns the raw foreign key target if this is a ForeignKey column
    pub fn foreign_key_target(&self) -> Option<&str> {
        match self {
            ColumnType::ForeignKey { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Splits a `table.column` reference. Exactly one dot, both parts non-empty.
pub fn parse_reference(target: &str) -> Option<(&str, &str)> {
    let (table, column) = target.split_once('.')?;
    if table.is_empty() || column.is_empty() || column.contains('.') {
        return None;
    }
    Some((table, column))
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub autoincrement: bool,
    #[serde(default)]
    pub unique: bool,
    /// Absent means "not nullable" for primary keys and "nullable" otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, rename = "index")]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnSpec {
    /// Create a column with the given type and default flags
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            autoincrement: false,
            unique: false,
            nullable: None,
            indexed: false,
            default: None,
            description: None,
        }
    }

    /// Create an autoincrementing integer primary key
    pub fn primary_key(name: impl Into<String>) -> Self {
        let mut column = Self::new(name, ColumnType::Integer);
        column.primary_key = true;
        column.autoincrement = true;
        column
    }

    /// Create a foreign key column referencing `target`
    pub fn foreign_key(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            ColumnType::ForeignKey {
                target: target.into(),
                on_delete: OnDeleteAction::NoAction,
            },
        )
    }

    /// Resolved nullability
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(!self.primary_key)
    }

    /// Whether the column may be referenced by a foreign key
    pub fn is_referenceable(&self) -> bool {
        self.primary_key || self.unique
    }
}

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToMany,
    ManyToOne,
    OneToOne,
    ManyToMany,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::OneToMany => "one_to_many",
            RelationshipKind::ManyToOne => "many_to_one",
            RelationshipKind::OneToOne => "one_to_one",
            RelationshipKind::ManyToMany => "many_to_many",
        }
    }

    /// The kind the other side of the relationship must declare
    pub fn inverse(&self) -> Self {
        match self {
            RelationshipKind::OneToMany => RelationshipKind::ManyToOne,
            RelationshipKind::ManyToOne => RelationshipKind::OneToMany,
            RelationshipKind::OneToOne => RelationshipKind::OneToOne,
            RelationshipKind::ManyToMany => RelationshipKind::ManyToMany,
        }
    }
}

/// Relationship declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub target_table: String,
    pub target_class: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    /// Attribute name on the owning class; inferred when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_populates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Explicit junction table for many_to_many
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RelationshipSpec {
    pub fn new(
        target_table: impl Into<String>,
        target_class: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            target_table: target_table.into(),
            target_class: target_class.into(),
            kind,
            name: None,
            back_populates: None,
            foreign_key: None,
            secondary: None,
            description: None,
        }
    }

    pub fn with_back_populates(mut self, back_populates: impl Into<String>) -> Self {
        self.back_populates = Some(back_populates.into());
        self
    }
}

/// Per-table capability flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default)]
    pub use_timestamps: bool,
    #[serde(default)]
    pub use_soft_delete: bool,
    /// Additional named capabilities, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table_name: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: TableOptions,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
}

impl TableSpec {
    pub fn new(table_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            class_name: class_name.into(),
            description: None,
            options: TableOptions::default(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipSpec) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Looks up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Foreign key columns that target `table`
    pub fn foreign_keys_to<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ColumnSpec> {
        self.columns.iter().filter(move |c| {
            c.column_type
                .foreign_key_target()
                .and_then(parse_reference)
                .map_or(false, |(t, _)| t == table)
        })
    }
}

/// Root schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub project_name: String,
    pub db_type: DatabaseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "schema")]
    pub tables: Vec<TableSpec>,
}

impl SchemaDocument {
    pub fn new(project_name: impl Into<String>, db_type: DatabaseKind) -> Self {
        Self {
            project_name: project_name.into(),
            db_type,
            description: None,
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableSpec) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks up a table by exact (case-sensitive) name. First declaration wins.
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.table_name.as_str())
    }

    /// Resolves the junction table of a many_to_many relationship declared on
    /// `owner`: the explicit `secondary` table if given, otherwise
    /// `<owner>_<target>` or `<target>_<owner>`, in that order.
    pub fn junction_for(&self, owner: &str, relationship: &RelationshipSpec) -> Option<&TableSpec> {
        if let Some(secondary) = &relationship.secondary {
            return self.table(secondary);
        }
        let target = relationship.target_table.as_str();
        self.table(&format!("{}_{}", owner, target))
            .or_else(|| self.table(&format!("{}_{}", target, owner)))
    }
}

//! Schema validator
//!
//! Checks run in a fixed order and accumulate findings instead of stopping at
//! the first problem:
//!
//! 0. Document: non-empty, project name, table count
//! 1. Duplicate table and class names
//! 2. Per table: naming, limits, duplicate columns, primary keys, column types
//! 3. Foreign keys: target format, target table, target column, uniqueness
//! 4. Relationships: target table, foreign key column, back-reference symmetry
//! 5. many_to_many junction tables
//!
//! The validator never mutates the document and is deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::report::{Finding, FindingCode, Location, ValidationReport};
use super::types::{
    parse_reference, ColumnType, RelationshipKind, RelationshipSpec, SchemaDocument, TableSpec,
};

/// How many primary-key columns a table may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyPolicy {
    /// Exactly one primary-key column
    #[default]
    ExactlyOne,
    /// One or more; composite keys allowed
    AtLeastOne,
}

/// Validator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub primary_key_policy: PrimaryKeyPolicy,

    /// Max tables per document (default: 50)
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    /// Max columns per table (default: 100)
    #[serde(default = "default_max_columns")]
    pub max_columns_per_table: usize,

    /// Max relationships per table (default: 50)
    #[serde(default = "default_max_relationships")]
    pub max_relationships_per_table: usize,
}

fn default_max_tables() -> usize {
    50
}

fn default_max_columns() -> usize {
    100
}

fn default_max_relationships() -> usize {
    50
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            primary_key_policy: PrimaryKeyPolicy::default(),
            max_tables: default_max_tables(),
            max_columns_per_table: default_max_columns(),
            max_relationships_per_table: default_max_relationships(),
        }
    }
}

static PROJECT_NAME: OnceLock<Option<Regex>> = OnceLock::new();
static TABLE_NAME: OnceLock<Option<Regex>> = OnceLock::new();
static CLASS_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// Validates a schema document with the default configuration.
pub fn validate(doc: &SchemaDocument) -> ValidationReport {
    Validator::new().validate(doc)
}

/// Structural and referential schema validator
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates a schema document and returns every finding.
    ///
    /// A report with zero errors means the document may be planned.
    pub fn validate(&self, doc: &SchemaDocument) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.check_document(doc, &mut report);
        check_duplicate_names(doc, &mut report);

        for (index, table) in doc.tables.iter().enumerate() {
            self.check_table(index, table, &mut report);
        }

        for table in &doc.tables {
            check_foreign_keys(doc, table, &mut report);
        }

        for table in &doc.tables {
            check_relationships(doc, table, &mut report);
        }

        for table in &doc.tables {
            check_junctions(doc, table, &mut report);
        }

        report
    }

    fn check_document(&self, doc: &SchemaDocument, report: &mut ValidationReport) {
        if doc.tables.is_empty() {
            report.push(Finding::new(
                FindingCode::EmptySchema,
                Location::Document,
                "Schema must declare at least one table",
            ));
        }

        if !matches(&PROJECT_NAME, r"^[A-Za-z0-9_-]+$", &doc.project_name) {
            report.push(Finding::new(
                FindingCode::InvalidProjectName,
                Location::Document,
                format!(
                    "Project name '{}' must contain only letters, digits, hyphens and underscores",
                    doc.project_name
                ),
            ));
        }

        if doc.tables.len() > self.config.max_tables {
            report.push(Finding::new(
                FindingCode::TooManyTables,
                Location::Document,
                format!(
                    "Schema declares {} tables, limit is {}",
                    doc.tables.len(),
                    self.config.max_tables
                ),
            ));
        }
    }

    fn check_table(&self, index: usize, table: &TableSpec, report: &mut ValidationReport) {
        let name = table.table_name.as_str();

        if !matches(&TABLE_NAME, r"^[a-z][a-z0-9_]*$", name) {
            report.push(Finding::new(
                FindingCode::InvalidTableName,
                Location::table(name, index),
                format!(
                    "Table name '{}' must be lowercase snake_case starting with a letter",
                    name
                ),
            ));
        }

        if !matches(&CLASS_NAME, r"^[A-Z][A-Za-z0-9_]*$", &table.class_name) {
            report.push(Finding::new(
                FindingCode::InvalidClassName,
                Location::table(name, index),
                format!(
                    "Class name '{}' must start with an uppercase letter and be alphanumeric",
                    table.class_name
                ),
            ));
        }

        if table.columns.is_empty() {
            report.push(Finding::new(
                FindingCode::NoColumns,
                Location::table(name, index),
                format!("Table '{}' declares no columns", name),
            ));
        } else if table.columns.len() > self.config.max_columns_per_table {
            report.push(Finding::new(
                FindingCode::TooManyColumns,
                Location::table(name, index),
                format!(
                    "Table '{}' declares {} columns, limit is {}",
                    name,
                    table.columns.len(),
                    self.config.max_columns_per_table
                ),
            ));
        }

        if table.relationships.len() > self.config.max_relationships_per_table {
            report.push(Finding::new(
                FindingCode::TooManyRelationships,
                Location::table(name, index),
                format!(
                    "Table '{}' declares {} relationships, limit is {}",
                    name,
                    table.relationships.len(),
                    self.config.max_relationships_per_table
                ),
            ));
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (position, column) in table.columns.iter().enumerate() {
            if let Some(first) = seen.insert(column.name.as_str(), position) {
                // Keep the first declaration as the reference point
                seen.insert(column.name.as_str(), first);
                report.push(Finding::new(
                    FindingCode::DuplicateColumn,
                    Location::column(name, &column.name),
                    format!(
                        "Column '{}' is declared at positions {} and {} of table '{}'",
                        column.name, first, position, name
                    ),
                ));
            }
        }

        if !table.columns.is_empty() {
            self.check_primary_keys(index, table, report);
        }

        for column in &table.columns {
            check_column_type(name, &column.name, &column.column_type, report);
        }
    }

    fn check_primary_keys(&self, index: usize, table: &TableSpec, report: &mut ValidationReport) {
        let name = table.table_name.as_str();
        let keys: Vec<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();

        if keys.is_empty() {
            report.push(Finding::new(
                FindingCode::MissingPrimaryKey,
                Location::table(name, index),
                format!("Table '{}' must have a primary key column", name),
            ));
        } else if keys.len() > 1 && self.config.primary_key_policy == PrimaryKeyPolicy::ExactlyOne {
            report.push(Finding::new(
                FindingCode::MultiplePrimaryKeys,
                Location::table(name, index),
                format!(
                    "Table '{}' declares {} primary keys ({}), exactly one is allowed",
                    name,
                    keys.len(),
                    keys.join(", ")
                ),
            ));
        }

        for column in table.primary_keys() {
            if column.nullable == Some(true) {
                report.push(Finding::new(
                    FindingCode::NullablePrimaryKey,
                    Location::column(name, &column.name),
                    format!("Primary key '{}.{}' cannot be nullable", name, column.name),
                ));
            }
        }
    }
}

fn check_duplicate_names(doc: &SchemaDocument, report: &mut ValidationReport) {
    let mut tables: HashMap<&str, usize> = HashMap::new();
    let mut classes: HashMap<&str, usize> = HashMap::new();

    for (index, table) in doc.tables.iter().enumerate() {
        match tables.get(table.table_name.as_str()) {
            Some(&first) => report.push(
                Finding::new(
                    FindingCode::DuplicateTable,
                    Location::table(&table.table_name, index),
                    format!(
                        "Table '{}' is declared at positions {} and {}",
                        table.table_name, first, index
                    ),
                )
                .with_related(Location::table(&table.table_name, first)),
            ),
            None => {
                tables.insert(&table.table_name, index);
            }
        }

        match classes.get(table.class_name.as_str()) {
            Some(&first) => report.push(
                Finding::new(
                    FindingCode::DuplicateClassName,
                    Location::table(&table.table_name, index),
                    format!(
                        "Class '{}' is used by tables '{}' and '{}'",
                        table.class_name, doc.tables[first].table_name, table.table_name
                    ),
                )
                .with_related(Location::table(&doc.tables[first].table_name, first)),
            ),
            None => {
                classes.insert(&table.class_name, index);
            }
        }
    }
}

fn check_column_type(
    table: &str,
    column: &str,
    column_type: &ColumnType,
    report: &mut ValidationReport,
) {
    match column_type {
        ColumnType::Enum { values } => {
            if values.is_empty() {
                report.push(Finding::new(
                    FindingCode::EmptyEnumValues,
                    Location::column(table, column),
                    format!("Enum column '{}.{}' must declare at least one value", table, column),
                ));
            }
            let mut seen = HashSet::new();
            for value in values {
                if !seen.insert(value.as_str()) {
                    report.push(Finding::new(
                        FindingCode::DuplicateEnumValue,
                        Location::column(table, column),
                        format!("Enum column '{}.{}' repeats value '{}'", table, column, value),
                    ));
                }
            }
        }
        ColumnType::String { length } => {
            if !matches!(length, Some(n) if *n > 0) {
                let actual = length.map_or("none".to_string(), |n| n.to_string());
                report.push(Finding::new(
                    FindingCode::InvalidStringLength,
                    Location::column(table, column),
                    format!(
                        "String column '{}.{}' must declare a positive length, got {}",
                        table, column, actual
                    ),
                ));
            }
        }
        ColumnType::Numeric { precision, scale } => {
            let scale = scale.unwrap_or(0);
            let valid = matches!(precision, Some(p) if *p > 0 && *p >= scale) && scale >= 0;
            if !valid {
                let precision = precision.map_or("none".to_string(), |p| p.to_string());
                report.push(Finding::new(
                    FindingCode::InvalidNumericPrecision,
                    Location::column(table, column),
                    format!(
                        "Numeric column '{}.{}' requires precision >= scale >= 0, \
                         got precision {} and scale {}",
                        table, column, precision, scale
                    ),
                ));
            }
        }
        _ => {}
    }
}

fn check_foreign_keys(doc: &SchemaDocument, table: &TableSpec, report: &mut ValidationReport) {
    let name = table.table_name.as_str();

    for column in &table.columns {
        let Some(target) = column.column_type.foreign_key_target() else {
            continue;
        };
        let location = Location::column(name, &column.name);

        let Some((target_table, target_column)) = parse_reference(target) else {
            report.push(Finding::new(
                FindingCode::InvalidForeignKeyFormat,
                location,
                format!(
                    "Foreign key target '{}' on '{}.{}' must have the form 'table.column'",
                    target, name, column.name
                ),
            ));
            continue;
        };

        let Some(referenced) = doc.table(target_table) else {
            report.push(Finding::new(
                FindingCode::FkTableNotFound,
                location,
                format!(
                    "Foreign key '{}.{}' references missing table '{}'",
                    name, column.name, target_table
                ),
            ));
            continue;
        };

        let Some(referenced_column) = referenced.column(target_column) else {
            report.push(Finding::new(
                FindingCode::FkColumnNotFound,
                location,
                format!(
                    "Foreign key '{}.{}' references missing column '{}.{}'",
                    name, column.name, target_table, target_column
                ),
            ));
            continue;
        };

        if !referenced_column.is_referenceable() {
            report.push(Finding::new(
                FindingCode::FkTargetNotUnique,
                location,
                format!(
                    "Foreign key '{}.{}' references '{}.{}', \
                     which is neither primary key nor unique",
                    name, column.name, target_table, target_column
                ),
            ));
        }
    }
}

fn check_relationships(doc: &SchemaDocument, table: &TableSpec, report: &mut ValidationReport) {
    let name = table.table_name.as_str();

    for (index, relationship) in table.relationships.iter().enumerate() {
        let location = Location::relationship(name, &relationship.target_table, index);

        let Some(target) = doc.table(&relationship.target_table) else {
            report.push(Finding::new(
                FindingCode::RelTableNotFound,
                location,
                format!(
                    "Relationship on '{}' references missing table '{}'",
                    name, relationship.target_table
                ),
            ));
            continue;
        };

        if let Some(foreign_key) = &relationship.foreign_key {
            // one_to_one keeps the key on either side
            let holders: Vec<&TableSpec> = match relationship.kind {
                RelationshipKind::OneToMany => vec![target],
                RelationshipKind::ManyToOne => vec![table],
                RelationshipKind::OneToOne => vec![table, target],
                RelationshipKind::ManyToMany => Vec::new(),
            };
            if !holders.is_empty() && holders.iter().all(|h| h.column(foreign_key).is_none()) {
                let names: Vec<&str> = holders.iter().map(|h| h.table_name.as_str()).collect();
                report.push(Finding::new(
                    FindingCode::RelForeignKeyNotFound,
                    location.clone(),
                    format!(
                        "Relationship '{}' -> '{}' names foreign key '{}', \
                         which is not a column of '{}'",
                        name,
                        relationship.target_table,
                        foreign_key,
                        names.join("' or '")
                    ),
                ));
            }
        }

        check_back_reference(table, index, relationship, target, location, report);
    }
}

/// Back-reference symmetry. Only reported when the target declares at least
/// one relationship back to the owner; one-sided declarations are allowed.
fn check_back_reference(
    owner: &TableSpec,
    index: usize,
    relationship: &RelationshipSpec,
    target: &TableSpec,
    location: Location,
    report: &mut ValidationReport,
) {
    let Some(back_populates) = relationship.back_populates.as_deref() else {
        return;
    };

    let self_referencing = owner.table_name == target.table_name;
    let reciprocals: Vec<&RelationshipSpec> = target
        .relationships
        .iter()
        .enumerate()
        .filter(|(j, s)| s.target_table == owner.table_name && !(self_referencing && *j == index))
        .map(|(_, s)| s)
        .collect();

    if reciprocals.is_empty() {
        return;
    }

    let partner = reciprocals
        .iter()
        .find(|s| s.name.as_deref() == Some(back_populates))
        .or_else(|| reciprocals.iter().find(|s| s.name.is_none()));

    match partner {
        None => report.push(Finding::new(
            FindingCode::RelBackPopulatesMismatch,
            location,
            format!(
                "back_populates '{}' on '{}' -> '{}' matches no relationship on '{}' pointing back",
                back_populates, owner.table_name, target.table_name, target.table_name
            ),
        )),
        Some(partner) if partner.kind != relationship.kind.inverse() => {
            report.push(Finding::new(
                FindingCode::RelKindAsymmetric,
                location,
                format!(
                    "'{}' declares {} to '{}' but '{}' declares {} back, expected {}",
                    owner.table_name,
                    relationship.kind.as_str(),
                    target.table_name,
                    target.table_name,
                    partner.kind.as_str(),
                    relationship.kind.inverse().as_str()
                ),
            ))
        }
        Some(_) => {}
    }
}

fn check_junctions(doc: &SchemaDocument, table: &TableSpec, report: &mut ValidationReport) {
    let name = table.table_name.as_str();

    for (index, relationship) in table.relationships.iter().enumerate() {
        if relationship.kind != RelationshipKind::ManyToMany {
            continue;
        }
        if doc.table(&relationship.target_table).is_none() {
            // Already reported as REL_TABLE_NOT_FOUND
            continue;
        }
        let location = Location::relationship(name, &relationship.target_table, index);

        let Some(junction) = doc.junction_for(name, relationship) else {
            let expected = match &relationship.secondary {
                Some(secondary) => format!("explicit junction '{}'", secondary),
                None => format!(
                    "'{}_{}' or '{}_{}'",
                    name, relationship.target_table, relationship.target_table, name
                ),
            };
            report.push(Finding::new(
                FindingCode::JunctionNotFound,
                location,
                format!(
                    "many_to_many '{}' -> '{}' needs a junction table: {} is not declared",
                    name, relationship.target_table, expected
                ),
            ));
            continue;
        };

        for side in [name, relationship.target_table.as_str()] {
            if junction.foreign_keys_to(side).next().is_none() {
                report.push(Finding::new(
                    FindingCode::JunctionMissingForeignKey,
                    location.clone(),
                    format!(
                        "Junction table '{}' has no foreign key to '{}'",
                        junction.table_name, side
                    ),
                ));
            }
        }
    }
}

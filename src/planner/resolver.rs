//! Plan resolver
//!
//! Turns a validated schema document and a build order into an
//! ArchitecturePlan.
//!
//! Capability stack order (deduplicated, first occurrence wins):
//! 1. base
//! 2. timestamps, if flagged
//! 3. soft_delete, if flagged
//! 4. declared capabilities, in declaration order
//!
//! Relationship attribute names: the explicit `name`, else the
//! back_populates of the first relationship on the target pointing back,
//! else the target table name.
//!
//! Resolution is pure: same document and order, same plan.

use std::collections::HashSet;

use super::errors::{PlannerError, PlannerResult};
use super::plan::{
    ArchitecturePlan, BuildSpec, Capability, ColumnInstruction, ForeignKeyRef, NoteKind,
    PlanNote, RelationshipInstruction,
};
use crate::graph::DependencyGraph;
use crate::schema::{
    parse_reference, ColumnSpec, ColumnType, Finding, RelationshipKind, RelationshipSpec,
    SchemaDocument, TableSpec,
};

/// Resolves build plans
pub struct PlanResolver;

impl PlanResolver {
    /// Resolves a plan for `doc` following `order`.
    ///
    /// # Errors
    ///
    /// - PLAN_UNKNOWN_TABLE / PLAN_DUPLICATE_TABLE / PLAN_MISSING_TABLE if
    ///   `order` is not a permutation of the document's tables
    /// - PLAN_UNRESOLVED_FOREIGN_KEY if a foreign key target does not exist
    pub fn resolve(doc: &SchemaDocument, order: &[String]) -> PlannerResult<ArchitecturePlan> {
        check_order(doc, order)?;

        let graph = DependencyGraph::build(doc);
        let mut specs = Vec::with_capacity(order.len());
        let mut notes = Vec::new();

        for name in order {
            let table = doc
                .table(name)
                .ok_or_else(|| PlannerError::unknown_table(name.as_str()))?;
            let spec = resolve_table(doc, &graph, table)?;
            notes.extend(table_notes(&graph, table, &spec));
            specs.push(spec);
        }

        Ok(ArchitecturePlan {
            project_name: doc.project_name.clone(),
            database: doc.db_type,
            build_order: order.to_vec(),
            specs,
            notes,
        })
    }

    /// Orders the document's tables and resolves a plan.
    ///
    /// Returns the blocking findings (cycles or planner errors) on failure.
    pub fn plan(doc: &SchemaDocument) -> Result<ArchitecturePlan, Vec<Finding>> {
        let order = DependencyGraph::build(doc)
            .topological_order()
            .map_err(|e| e.into_findings())?;
        Self::resolve(doc, &order).map_err(|e| vec![e.to_finding()])
    }
}

fn check_order(doc: &SchemaDocument, order: &[String]) -> PlannerResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for name in order {
        if doc.table(name).is_none() {
            return Err(PlannerError::unknown_table(name.as_str()));
        }
        if !seen.insert(name) {
            return Err(PlannerError::duplicate_table(name.as_str()));
        }
    }
    for table in &doc.tables {
        if !seen.contains(table.table_name.as_str()) {
            return Err(PlannerError::missing_table(table.table_name.as_str()));
        }
    }
    Ok(())
}

fn resolve_table(
    doc: &SchemaDocument,
    graph: &DependencyGraph,
    table: &TableSpec,
) -> PlannerResult<BuildSpec> {
    let capabilities = capability_stack(table);

    let columns = table
        .columns
        .iter()
        .map(|column| resolve_column(doc, table, column, &capabilities))
        .collect::<PlannerResult<Vec<_>>>()?;

    let relationships = table
        .relationships
        .iter()
        .enumerate()
        .map(|(index, relationship)| resolve_relationship(doc, table, index, relationship))
        .collect();

    Ok(BuildSpec {
        table_name: table.table_name.clone(),
        class_name: table.class_name.clone(),
        description: table.description.clone(),
        capabilities,
        columns,
        relationships,
        depends_on: graph
            .dependencies_of(&table.table_name)
            .map(str::to_string)
            .collect(),
    })
}

fn capability_stack(table: &TableSpec) -> Vec<Capability> {
    let mut declared = vec![Capability::Base];
    if table.options.use_timestamps {
        declared.push(Capability::Timestamps);
    }
    if table.options.use_soft_delete {
        declared.push(Capability::SoftDelete);
    }
    declared.extend(
        table
            .options
            .capabilities
            .iter()
            .map(|name| Capability::from_name(name)),
    );

    let mut stack: Vec<Capability> = Vec::with_capacity(declared.len());
    for capability in declared {
        if !stack.contains(&capability) {
            stack.push(capability);
        }
    }
    stack
}

fn resolve_column(
    doc: &SchemaDocument,
    table: &TableSpec,
    column: &ColumnSpec,
    capabilities: &[Capability],
) -> PlannerResult<ColumnInstruction> {
    let foreign_key = match &column.column_type {
        ColumnType::ForeignKey { target, on_delete } => {
            let unresolved =
                || PlannerError::unresolved_foreign_key(&table.table_name, &column.name, target);
            let (target_table, target_column) = parse_reference(target).ok_or_else(unresolved)?;
            doc.table(target_table)
                .and_then(|t| t.column(target_column))
                .ok_or_else(unresolved)?;
            Some(ForeignKeyRef {
                table: target_table.to_string(),
                column: target_column.to_string(),
                on_delete: *on_delete,
                self_referencing: target_table == table.table_name,
            })
        }
        _ => None,
    };

    let provided_by = capabilities
        .iter()
        .find(|c| c.provided_columns().contains(&column.name.as_str()))
        .cloned();

    Ok(ColumnInstruction {
        name: column.name.clone(),
        column_type: column.column_type.clone(),
        primary_key: column.primary_key,
        autoincrement: column.autoincrement,
        unique: column.unique,
        nullable: column.is_nullable(),
        indexed: column.indexed,
        default: column.default.clone(),
        description: column.description.clone(),
        foreign_key,
        provided_by,
    })
}

/// Relationships on `target` pointing back at `owner`, excluding the
/// relationship itself when it is self-referencing
fn reciprocals<'a>(
    target: &'a TableSpec,
    owner: &'a str,
    index: usize,
) -> impl Iterator<Item = (usize, &'a RelationshipSpec)> + 'a {
    let self_referencing = target.table_name == owner;
    target
        .relationships
        .iter()
        .enumerate()
        .filter(move |(j, r)| r.target_table == owner && !(self_referencing && *j == index))
}

fn attribute_name(
    doc: &SchemaDocument,
    owner: &TableSpec,
    index: usize,
    relationship: &RelationshipSpec,
) -> String {
    if let Some(name) = &relationship.name {
        return name.clone();
    }
    doc.table(&relationship.target_table)
        .and_then(|target| {
            reciprocals(target, &owner.table_name, index)
                .find_map(|(_, r)| r.back_populates.clone())
        })
        .unwrap_or_else(|| relationship.target_table.clone())
}

fn resolve_relationship(
    doc: &SchemaDocument,
    owner: &TableSpec,
    index: usize,
    relationship: &RelationshipSpec,
) -> RelationshipInstruction {
    let attribute = attribute_name(doc, owner, index, relationship);
    let target = doc.table(&relationship.target_table);

    let back_populates = relationship.back_populates.clone().or_else(|| {
        let target = target?;
        reciprocals(target, &owner.table_name, index)
            .find(|(_, r)| r.back_populates.as_deref() == Some(attribute.as_str()))
            .map(|(j, r)| attribute_name(doc, target, j, r))
    });

    let junction_table = match relationship.kind {
        RelationshipKind::ManyToMany => doc
            .junction_for(&owner.table_name, relationship)
            .map(|j| j.table_name.clone()),
        _ => None,
    };

    RelationshipInstruction {
        attribute_name: attribute,
        target_table: relationship.target_table.clone(),
        target_class: relationship.target_class.clone(),
        kind: relationship.kind,
        back_populates,
        foreign_key: relationship.foreign_key.clone(),
        junction_table,
        target_verified: target.is_some(),
        self_referencing: relationship.target_table == owner.table_name,
    }
}

fn table_notes(
    graph: &DependencyGraph,
    table: &TableSpec,
    spec: &BuildSpec,
) -> Vec<PlanNote> {
    let mut notes = Vec::new();
    let name = table.table_name.as_str();

    let keys: Vec<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();
    if keys.len() > 1 {
        notes.push(PlanNote {
            kind: NoteKind::CompositePrimaryKey,
            table: name.to_string(),
            message: format!("Table '{}' uses a composite primary key ({})", name, keys.join(", ")),
        });
    }

    if graph.is_self_referencing(name) || spec.relationships.iter().any(|r| r.self_referencing) {
        notes.push(PlanNote {
            kind: NoteKind::SelfReferential,
            table: name.to_string(),
            message: format!(
                "Table '{}' references itself; the model must refer to its own class lazily",
                name
            ),
        });
    }

    for relationship in &spec.relationships {
        if relationship.kind != RelationshipKind::ManyToMany {
            continue;
        }
        let message = match &relationship.junction_table {
            Some(junction) => format!(
                "'{}' and '{}' are linked many-to-many through '{}'",
                name, relationship.target_table, junction
            ),
            None => format!(
                "'{}' and '{}' are linked many-to-many without a declared junction",
                name, relationship.target_table
            ),
        };
        notes.push(PlanNote {
            kind: NoteKind::ManyToManyJunction,
            table: name.to_string(),
            message,
        });
    }

    notes
}

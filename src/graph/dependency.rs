//! Table dependency graph
//!
//! An edge `A -> B` means table B must be built before table A. Edges come
//! from A's ForeignKey columns and A's many_to_one relationships. A table
//! referencing itself is recorded separately and never takes part in
//! ordering or cycle detection.
//!
//! All traversals visit nodes and neighbours in ascending name order, so
//! results are identical across runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{format_cycle, GraphError, GraphResult};
use crate::schema::{
    parse_reference, Finding, FindingCode, Location, RelationshipKind, SchemaDocument,
};

/// What declared a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeSource {
    /// ForeignKey column on the dependent table
    ForeignKey { column: String },
    /// many_to_one relationship at `index` on the dependent table
    ManyToOne { index: usize },
}

/// Directed edge: `to` must exist before `from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub source: EdgeSource,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            EdgeSource::ForeignKey { column } => {
                write!(f, "{}.{} -> {}", self.from, column, self.to)
            }
            EdgeSource::ManyToOne { index } => {
                write!(f, "{} (many_to_one #{}) -> {}", self.from, index, self.to)
            }
        }
    }
}

/// Directed "must exist before" graph over table names
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    /// Position of each table's first declaration in the document
    positions: HashMap<String, usize>,
    edges: Vec<DependencyEdge>,
    /// from -> tables it depends on
    adjacency: BTreeMap<String, BTreeSet<String>>,
    self_references: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Builds the graph from a schema document.
    ///
    /// References to tables absent from the document are skipped; the
    /// validator reports them.
    pub fn build(doc: &SchemaDocument) -> Self {
        let mut graph = Self::default();

        for (index, table) in doc.tables.iter().enumerate() {
            graph.nodes.insert(table.table_name.clone());
            graph
                .positions
                .entry(table.table_name.clone())
                .or_insert(index);
        }

        for table in &doc.tables {
            for column in &table.columns {
                let target = column
                    .column_type
                    .foreign_key_target()
                    .and_then(parse_reference)
                    .map(|(t, _)| t);
                if let Some(target) = target {
                    graph.add_edge(
                        &table.table_name,
                        target,
                        EdgeSource::ForeignKey {
                            column: column.name.clone(),
                        },
                    );
                }
            }

            for (index, relationship) in table.relationships.iter().enumerate() {
                if relationship.kind == RelationshipKind::ManyToOne {
                    graph.add_edge(
                        &table.table_name,
                        &relationship.target_table,
                        EdgeSource::ManyToOne { index },
                    );
                }
            }
        }

        graph
    }

    fn add_edge(&mut self, from: &str, to: &str, source: EdgeSource) {
        if !self.nodes.contains(to) {
            return;
        }
        let edge = DependencyEdge {
            from: from.to_string(),
            to: to.to_string(),
            source,
        };
        if from == to {
            self.self_references.push(edge);
            return;
        }
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .insert(edge.to.clone());
        self.edges.push(edge);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Non-self edges in discovery order
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn self_references(&self) -> &[DependencyEdge] {
        &self.self_references
    }

    pub fn is_self_referencing(&self, table: &str) -> bool {
        self.self_references.iter().any(|e| e.from == table)
    }

    /// Tables `table` depends on, ascending, self excluded
    pub fn dependencies_of(&self, table: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(table)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// First edge declared from `from` to `to`
    pub fn edge_between(&self, from: &str, to: &str) -> Option<&DependencyEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    /// Finds dependency cycles.
    ///
    /// Depth-first search with a recursion stack; every back edge yields the
    /// path from its target to the current node. Each cycle is rotated to
    /// start at its smallest table name and duplicates are dropped.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        for node in &self.nodes {
            if !state.contains_key(node.as_str()) {
                self.visit(node, &mut state, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        state.insert(node, Visit::OnStack);
        path.push(node);

        for next in self.dependencies_of(node) {
            match state.get(next) {
                Some(Visit::OnStack) => {
                    if let Some(start) = path.iter().position(|n| *n == next) {
                        let cycle = canonical_cycle(&path[start..]);
                        if !cycles.contains(&cycle) {
                            cycles.push(cycle);
                        }
                    }
                }
                Some(Visit::Done) => {}
                None => self.visit(next, state, path, cycles),
            }
        }

        path.pop();
        state.insert(node, Visit::Done);
    }

    /// Returns the build order: every table after all tables it depends on,
    /// ties broken by ascending name.
    ///
    /// # Errors
    ///
    /// `GraphError::Cycle` naming every table of every cycle.
    pub fn topological_order(&self) -> GraphResult<Vec<String>> {
        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            let findings = cycles.iter().map(|c| self.cycle_finding(c)).collect();
            return Err(GraphError::Cycle { cycles, findings });
        }

        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), self.adjacency.get(n).map_or(0, BTreeSet::len)))
            .collect();

        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, deps) in &self.adjacency {
            for to in deps {
                dependents.entry(to.as_str()).or_default().push(from.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.to_string());
            for dependent in dependents.get(node).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        Ok(order)
    }

    fn cycle_finding(&self, cycle: &[String]) -> Finding {
        let first = cycle.first().map(String::as_str).unwrap_or_default();
        let location = Location::table(first, self.position(first));

        let via: Vec<String> = cycle
            .iter()
            .zip(cycle.iter().cycle().skip(1))
            .filter_map(|(from, to)| self.edge_between(from, to))
            .map(ToString::to_string)
            .collect();

        let mut finding = Finding::new(
            FindingCode::CircularDependency,
            location,
            format!(
                "Circular dependency: {} (via {})",
                format_cycle(cycle),
                via.join(", ")
            ),
        );
        for table in cycle.iter().skip(1) {
            finding = finding.with_related(Location::table(table, self.position(table)));
        }
        finding
    }

    fn position(&self, table: &str) -> usize {
        self.positions.get(table).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnStack,
    Done,
}

fn canonical_cycle(path: &[&str]) -> Vec<String> {
    let start = path
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| **name)
        .map_or(0, |(i, _)| i);
    path[start..]
        .iter()
        .chain(path[..start].iter())
        .map(|s| s.to_string())
        .collect()
}

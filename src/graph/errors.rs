//! # Graph Errors

use thiserror::Error;

use crate::schema::Finding;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Dependency graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// One or more hard dependency cycles. Terminal.
    #[error("{} dependency cycle(s): {}", .cycles.len(), format_cycles(.cycles))]
    Cycle {
        /// Each cycle starts at its smallest table name
        cycles: Vec<Vec<String>>,
        /// One CIRCULAR_DEPENDENCY finding per cycle
        findings: Vec<Finding>,
    },
}

impl GraphError {
    pub fn cycles(&self) -> &[Vec<String>] {
        match self {
            GraphError::Cycle { cycles, .. } => cycles,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            GraphError::Cycle { findings, .. } => findings,
        }
    }

    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            GraphError::Cycle { findings, .. } => findings,
        }
    }
}

/// Renders a cycle as `a -> b -> a`
pub fn format_cycle(cycle: &[String]) -> String {
    let mut path: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        path.push(first);
    }
    path.join(" -> ")
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|c| format_cycle(c))
        .collect::<Vec<_>>()
        .join("; ")
}

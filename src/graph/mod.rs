//! Dependency graph for backbone
//!
//! Derives the "must exist before" relation between tables, detects hard
//! cycles and produces a deterministic build order. Built once per planning
//! pass and dropped afterwards.

mod dependency;
mod errors;

pub use dependency::{DependencyEdge, DependencyGraph, EdgeSource};
pub use errors::{format_cycle, GraphError, GraphResult};

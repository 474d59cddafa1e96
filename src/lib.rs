//! backbone - schema validation and build planning for generated persistence code
//!
//! Turns a declarative table schema into an ordered, conflict-free
//! architecture plan and drives plan-to-code generation through an explicit
//! pipeline state machine with bounded, feedback-driven retries.
//!
//! - `schema`: document model, loader and validator
//! - `graph`: table dependency graph, cycle detection and build order
//! - `planner`: capability resolution into per-table build specs
//! - `workflow`: pipeline state machine and collaborator traits
//! - `observability`: structured lifecycle logging
//! - `cli`: `validate` and `plan` commands

pub mod cli;
pub mod graph;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod workflow;

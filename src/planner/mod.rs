//! Build planner for backbone
//!
//! Resolves a validated schema document into an ArchitecturePlan: one
//! BuildSpec per table, in dependency order, with capability stacks and
//! fully resolved column and relationship instructions.
//!
//! # Design Principles
//!
//! - Deterministic: same inputs, bit-identical plan
//! - Explicit: every reference in a plan is resolved and verified
//! - Immutable: plans are never modified after resolution

mod errors;
mod plan;
mod resolver;

pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use plan::{
    ArchitecturePlan, BuildSpec, Capability, ColumnInstruction, ForeignKeyRef, NoteKind,
    PlanNote, RelationshipInstruction,
};
pub use resolver::PlanResolver;

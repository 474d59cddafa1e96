//! Pipeline workflow for backbone
//!
//! An explicit state machine over a single schema document:
//!
//! ```text
//! Idle -> Validating -> Planning -> Generating -> OutputValidating -> Succeeded
//!            |             |           ^   |            |
//!            v             v           |   v            |
//!     RejectedAtValidation         (retry) Failed <-----+
//! ```
//!
//! Generation and output checking are delegated to the `Generator` and
//! `OutputValidator` collaborators. The retry counter is shared by both
//! failure routes and never exceeds `max_retries`.

mod cancel;
mod collaborators;
mod config;
mod errors;
mod machine;
mod state;

pub use cancel::{cancellation, CancelHandle, CancelToken};
pub use collaborators::{Artifacts, BoxFuture, Generator, OutputValidator};
pub use config::{PipelineConfig, TieBreak};
pub use errors::{GenerationError, WorkflowError, WorkflowResult};
pub use machine::{PipelineStateMachine, RunResult};
pub use state::{AttemptOutcome, AttemptRecord, Stage, TransitionRecord, WorkflowState};

//! External collaborators
//!
//! The pipeline does not generate or lint code itself. It drives two
//! collaborators through these traits and only sees their results.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use super::errors::GenerationError;
use crate::planner::ArchitecturePlan;
use crate::schema::{Finding, ValidationReport};

/// Generated artifacts keyed by name (e.g. file path)
pub type Artifacts = BTreeMap<String, String>;

/// Boxed future returned by collaborators
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Produces artifacts for a whole plan
pub trait Generator: Send + Sync {
    /// Generate artifacts for `plan`.
    ///
    /// `feedback` holds the error findings of every earlier failed attempt
    /// in this run; it is empty on the first attempt.
    fn generate<'a>(
        &'a self,
        plan: &'a ArchitecturePlan,
        feedback: &'a [Finding],
    ) -> BoxFuture<'a, Result<Artifacts, GenerationError>>;
}

/// Checks generated artifacts
pub trait OutputValidator: Send + Sync {
    /// Any error-severity finding in the report sends the run back to
    /// generation.
    fn check<'a>(
        &'a self,
        artifacts: &'a Artifacts,
    ) -> BoxFuture<'a, Result<ValidationReport, GenerationError>>;
}

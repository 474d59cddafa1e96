//! Pipeline State Machine
//!
//! - Stages are explicit and enumerable
//! - Every transition is a consuming method that either yields the next
//!   stage or a forbidden-transition error
//! - No stage is skipped
//! - Succeeded, RejectedAtValidation and Failed are sinks
//!
//! ```text
//! Idle → Validating → Planning → Generating ⇄ OutputValidating → Succeeded
//!             ↓           ↓          ↓ ↺              ↓
//!      RejectedAtValidation       Failed ←────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collaborators::Artifacts;
use super::errors::{WorkflowError, WorkflowResult};
use crate::observability::{log_event_with_fields, Event};
use crate::planner::ArchitecturePlan;
use crate::schema::Finding;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Validating,
    Planning,
    Generating,
    OutputValidating,
    Succeeded,
    RejectedAtValidation,
    Failed,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::Idle
    }

    /// Get the stage name for observability.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating",
            Self::Planning => "Planning",
            Self::Generating => "Generating",
            Self::OutputValidating => "OutputValidating",
            Self::Succeeded => "Succeeded",
            Self::RejectedAtValidation => "RejectedAtValidation",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::RejectedAtValidation | Self::Failed
        )
    }

    // =========================================================================
    // ALLOWED TRANSITIONS
    // =========================================================================

    /// Idle → Validating
    pub fn start(self) -> WorkflowResult<Self> {
        match self {
            Self::Idle => Ok(Self::Validating),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Validating")),
        }
    }

    /// Validating → Planning
    ///
    /// Validation found zero errors.
    pub fn validation_passed(self) -> WorkflowResult<Self> {
        match self {
            Self::Validating => Ok(Self::Planning),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Planning")),
        }
    }

    /// Validating | Planning → RejectedAtValidation
    ///
    /// Terminal findings: validation errors, cycles or planner errors.
    pub fn reject(self) -> WorkflowResult<Self> {
        match self {
            Self::Validating | Self::Planning => Ok(Self::RejectedAtValidation),
            _ => Err(WorkflowError::forbidden_transition(
                self.name(),
                "RejectedAtValidation",
            )),
        }
    }

    /// Planning → Generating
    pub fn plan_resolved(self) -> WorkflowResult<Self> {
        match self {
            Self::Planning => Ok(Self::Generating),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Generating")),
        }
    }

    /// Generating → OutputValidating
    ///
    /// Generator returned artifacts for the whole plan.
    pub fn artifacts_produced(self) -> WorkflowResult<Self> {
        match self {
            Self::Generating => Ok(Self::OutputValidating),
            _ => Err(WorkflowError::forbidden_transition(
                self.name(),
                "OutputValidating",
            )),
        }
    }

    /// OutputValidating → Succeeded
    pub fn output_accepted(self) -> WorkflowResult<Self> {
        match self {
            Self::OutputValidating => Ok(Self::Succeeded),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Succeeded")),
        }
    }

    /// Generating | OutputValidating → Generating
    ///
    /// Retryable failure with budget left.
    pub fn retry(self) -> WorkflowResult<Self> {
        match self {
            Self::Generating | Self::OutputValidating => Ok(Self::Generating),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Generating")),
        }
    }

    /// Generating | OutputValidating → Failed
    ///
    /// Retryable failure with the budget exhausted.
    pub fn fail(self) -> WorkflowResult<Self> {
        match self {
            Self::Generating | Self::OutputValidating => Ok(Self::Failed),
            _ => Err(WorkflowError::forbidden_transition(self.name(), "Failed")),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One applied transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Stage,
    pub to: Stage,
    /// Retry counter after the transition
    pub retries: u32,
    pub at: DateTime<Utc>,
}

/// How a generation attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    /// Output validator reported errors
    OutputRejected,
    /// Generator failed or timed out
    GeneratorFailed,
    /// Output validator failed or timed out
    ValidatorFailed,
}

/// One Generator → OutputValidator round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub findings: Vec<Finding>,
}

/// Per-run state, owned and mutated only by the state machine
#[derive(Debug, Clone)]
pub struct WorkflowState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    stage: Stage,
    retries: u32,
    /// Accumulated error findings, fed back to the generator
    findings: Vec<Finding>,
    history: Vec<TransitionRecord>,
    attempts: Vec<AttemptRecord>,
    plan: Option<ArchitecturePlan>,
    artifacts: Option<Artifacts>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            stage: Stage::Idle,
            retries: 0,
            findings: Vec::new(),
            history: Vec::new(),
            attempts: Vec::new(),
            plan: None,
            artifacts: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn plan(&self) -> Option<&ArchitecturePlan> {
        self.plan.as_ref()
    }

    pub fn artifacts(&self) -> Option<&Artifacts> {
        self.artifacts.as_ref()
    }

    /// Stage sequence from the first transition on, e.g.
    /// `[Idle, Validating, Planning, ...]`
    pub fn path(&self) -> Vec<Stage> {
        let mut path: Vec<Stage> = self.history.first().map(|t| t.from).into_iter().collect();
        path.extend(self.history.iter().map(|t| t.to));
        path
    }

    // =========================================================================
    // MUTATION (state machine only)
    // =========================================================================

    /// Applies a transition and records it. The stage is unchanged on error.
    pub(crate) fn transition(
        &mut self,
        apply: impl FnOnce(Stage) -> WorkflowResult<Stage>,
    ) -> WorkflowResult<()> {
        let from = self.stage;
        let to = apply(from)?;
        self.stage = to;
        self.history.push(TransitionRecord {
            from,
            to,
            retries: self.retries,
            at: Utc::now(),
        });

        let retries = self.retries.to_string();
        self.log(
            Event::StageTransition,
            &[
                ("from", from.name()),
                ("to", to.name()),
                ("retries", retries.as_str()),
            ],
        );
        Ok(())
    }

    pub(crate) fn increment_retries(&mut self) {
        self.retries += 1;
    }

    pub(crate) fn record_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub(crate) fn record_attempt(&mut self, outcome: AttemptOutcome, findings: Vec<Finding>) {
        let attempt = self.attempts.len() as u32 + 1;
        self.attempts.push(AttemptRecord {
            attempt,
            outcome,
            findings,
        });
    }

    pub(crate) fn set_plan(&mut self, plan: ArchitecturePlan) {
        self.plan = Some(plan);
    }

    pub(crate) fn set_artifacts(&mut self, artifacts: Artifacts) {
        self.artifacts = Some(artifacts);
    }

    /// Logs an event tagged with this run's id
    pub(crate) fn log(&self, event: Event, fields: &[(&str, &str)]) {
        let run_id = self.run_id.to_string();
        let mut tagged: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        tagged.push(("run_id", run_id.as_str()));
        tagged.extend_from_slice(fields);
        log_event_with_fields(event, &tagged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let stage = Stage::new()
            .start()
            .and_then(Stage::validation_passed)
            .and_then(Stage::plan_resolved)
            .and_then(Stage::artifacts_produced)
            .and_then(Stage::output_accepted)
            .unwrap();
        assert_eq!(stage, Stage::Succeeded);
        assert!(stage.is_terminal());
    }

    #[test]
    fn test_cannot_skip_stages() {
        let err = Stage::Idle.plan_resolved().unwrap_err();
        assert_eq!(err, WorkflowError::forbidden_transition("Idle", "Generating"));

        assert!(Stage::Validating.artifacts_produced().is_err());
        assert!(Stage::Planning.output_accepted().is_err());
    }

    #[test]
    fn test_rejection_only_before_generation() {
        assert_eq!(Stage::Validating.reject().unwrap(), Stage::RejectedAtValidation);
        assert_eq!(Stage::Planning.reject().unwrap(), Stage::RejectedAtValidation);
        assert!(Stage::Generating.reject().is_err());
        assert!(Stage::OutputValidating.reject().is_err());
    }

    #[test]
    fn test_retry_and_fail_sources() {
        assert_eq!(Stage::OutputValidating.retry().unwrap(), Stage::Generating);
        assert_eq!(Stage::Generating.retry().unwrap(), Stage::Generating);
        assert_eq!(Stage::OutputValidating.fail().unwrap(), Stage::Failed);
        assert!(Stage::Planning.retry().is_err());
        assert!(Stage::Validating.fail().is_err());
    }

    #[test]
    fn test_sinks_have_no_exits() {
        for sink in [Stage::Succeeded, Stage::RejectedAtValidation, Stage::Failed] {
            assert!(sink.start().is_err());
            assert!(sink.retry().is_err());
            assert!(sink.fail().is_err());
            assert!(sink.reject().is_err());
        }
    }

    #[test]
    fn test_state_records_history() {
        let mut state = WorkflowState::new();
        state.transition(Stage::start).unwrap();
        state.transition(Stage::validation_passed).unwrap();

        assert_eq!(state.stage(), Stage::Planning);
        assert_eq!(
            state.path(),
            vec![Stage::Idle, Stage::Validating, Stage::Planning]
        );
    }

    #[test]
    fn test_forbidden_transition_leaves_state_untouched() {
        let mut state = WorkflowState::new();
        let err = state.transition(Stage::output_accepted).unwrap_err();
        assert_eq!(err.to_string(), "forbidden transition: Idle → Succeeded");
        assert_eq!(state.stage(), Stage::Idle);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(WorkflowState::new().run_id(), WorkflowState::new().run_id());
    }
}

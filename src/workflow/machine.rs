//! Pipeline runner
//!
//! Drives one schema document through validation, planning, generation and
//! output validation.
//!
//! - One sequential flow per run; each run owns its WorkflowState
//! - Terminal findings (structural, referential, cycle) end the run with
//!   the full report
//! - Generation and output-quality failures route back to generation while
//!   the shared retry counter is below `max_retries`
//! - Collaborator timeouts count as ordinary failures
//! - Cancellation is observed only while suspended on a collaborator

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::cancel::CancelToken;
use super::collaborators::{Artifacts, Generator, OutputValidator};
use super::config::PipelineConfig;
use super::errors::{GenerationError, WorkflowResult};
use super::state::{AttemptOutcome, AttemptRecord, Stage, WorkflowState};
use crate::observability::Event;
use crate::planner::{ArchitecturePlan, PlanResolver};
use crate::schema::{Finding, FindingCode, SchemaDocument, ValidationReport, Validator};

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Succeeded {
        plan: ArchitecturePlan,
        artifacts: Artifacts,
        retries: u32,
        /// Non-blocking findings from schema and output validation
        warnings: Vec<Finding>,
    },
    /// Terminal findings before any generation
    RejectedAtValidation { report: ValidationReport },
    /// Retry budget exhausted
    Failed {
        attempts: Vec<AttemptRecord>,
        last_findings: Vec<Finding>,
    },
    /// Cancelled while waiting on a collaborator
    Cancelled { stage: Stage, retries: u32 },
}

impl RunResult {
    pub fn name(&self) -> &'static str {
        match self {
            RunResult::Succeeded { .. } => "succeeded",
            RunResult::RejectedAtValidation { .. } => "rejected_at_validation",
            RunResult::Failed { .. } => "failed",
            RunResult::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Succeeded { .. })
    }
}

/// Pipeline state machine
///
/// Holds only configuration and collaborators, so one instance can serve
/// concurrent runs.
#[derive(Clone)]
pub struct PipelineStateMachine {
    config: PipelineConfig,
    generator: Arc<dyn Generator>,
    output_validator: Arc<dyn OutputValidator>,
}

impl PipelineStateMachine {
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn Generator>,
        output_validator: Arc<dyn OutputValidator>,
    ) -> Self {
        Self {
            config,
            generator,
            output_validator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, doc: &SchemaDocument) -> WorkflowResult<RunResult> {
        self.run_cancellable(doc, CancelToken::never()).await
    }

    /// Runs the pipeline until it finishes or `cancel` fires.
    pub async fn run_cancellable(
        &self,
        doc: &SchemaDocument,
        cancel: CancelToken,
    ) -> WorkflowResult<RunResult> {
        self.run_traced(doc, cancel).await.map(|(result, _)| result)
    }

    /// Runs the pipeline and also returns the final state, including the
    /// transition and attempt history.
    ///
    /// # Errors
    ///
    /// A forbidden transition. Never expected from a correct driver.
    pub async fn run_traced(
        &self,
        doc: &SchemaDocument,
        mut cancel: CancelToken,
    ) -> WorkflowResult<(RunResult, WorkflowState)> {
        let mut state = WorkflowState::new();

        let tables = doc.tables.len().to_string();
        let max_retries = self.config.max_retries.to_string();
        state.log(
            Event::RunStart,
            &[
                ("project", doc.project_name.as_str()),
                ("tables", tables.as_str()),
                ("max_retries", max_retries.as_str()),
            ],
        );

        let result = self.drive(doc, &mut cancel, &mut state).await?;
        Ok((result, state))
    }

    async fn drive(
        &self,
        doc: &SchemaDocument,
        cancel: &mut CancelToken,
        state: &mut WorkflowState,
    ) -> WorkflowResult<RunResult> {
        // Validating
        state.transition(Stage::start)?;
        let report = Validator::with_config(self.config.validator.clone()).validate(doc);

        if report.has_errors() {
            state.record_findings(report.errors().cloned());
            state.transition(Stage::reject)?;
            log_rejection(state, &report);
            return Ok(RunResult::RejectedAtValidation { report });
        }
        state.transition(Stage::validation_passed)?;

        // Planning
        let plan = match PlanResolver::plan(doc) {
            Ok(plan) => plan,
            Err(findings) => return self.reject_plan(state, report, findings),
        };

        let tables = plan.total_tables().to_string();
        let columns = plan.total_columns().to_string();
        let relationships = plan.total_relationships().to_string();
        let fingerprint = plan.fingerprint();
        state.log(
            Event::PlanResolved,
            &[
                ("columns", columns.as_str()),
                ("fingerprint", fingerprint.as_str()),
                ("relationships", relationships.as_str()),
                ("tables", tables.as_str()),
            ],
        );
        state.set_plan(plan.clone());
        state.transition(Stage::plan_resolved)?;

        let mut warnings: Vec<Finding> = report.into_findings();

        loop {
            // Generating
            let attempt = (state.attempts().len() + 1).to_string();
            let feedback = state.findings().len().to_string();
            state.log(
                Event::GenerationAttempt,
                &[("attempt", attempt.as_str()), ("feedback", feedback.as_str())],
            );

            let generated = {
                let feedback = state.findings().to_vec();
                let call = self.generator.generate(&plan, &feedback);
                let timeout = self.config.generation_timeout();
                match suspend(cancel, timeout, call).await {
                    Some(generated) => generated,
                    None => return Ok(cancelled(state)),
                }
            };

            let artifacts = match generated {
                Ok(artifacts) => artifacts,
                Err(err) => {
                    let finding = err.to_finding();
                    state.log(
                        Event::GenerationFailed,
                        &[("error", finding.message.as_str())],
                    );
                    if !self.after_failure(state, AttemptOutcome::GeneratorFailed, vec![finding])? {
                        return Ok(failed(state));
                    }
                    continue;
                }
            };

            state.set_artifacts(artifacts.clone());
            state.transition(Stage::artifacts_produced)?;

            // OutputValidating
            let checked = {
                let call = self.output_validator.check(&artifacts);
                let timeout = self.config.output_validation_timeout();
                match suspend(cancel, timeout, call).await {
                    Some(checked) => checked,
                    None => return Ok(cancelled(state)),
                }
            };

            let output = match checked {
                Ok(output) => output,
                Err(err) => {
                    let finding = err.to_finding();
                    state.log(
                        Event::GenerationFailed,
                        &[("error", finding.message.as_str()), ("stage", "OutputValidating")],
                    );
                    if !self.after_failure(state, AttemptOutcome::ValidatorFailed, vec![finding])? {
                        return Ok(failed(state));
                    }
                    continue;
                }
            };

            if output.is_accepted() {
                state.record_attempt(AttemptOutcome::Accepted, output.findings().to_vec());
                state.transition(Stage::output_accepted)?;

                let retries = state.retries().to_string();
                state.log(Event::RunSucceeded, &[("retries", retries.as_str())]);

                warnings.extend(output.into_findings());
                return Ok(RunResult::Succeeded {
                    plan,
                    artifacts,
                    retries: state.retries(),
                    warnings,
                });
            }

            let errors: Vec<Finding> = output.errors().cloned().collect();
            let count = errors.len().to_string();
            state.log(Event::OutputRejected, &[("errors", count.as_str())]);

            if !self.after_failure(state, AttemptOutcome::OutputRejected, errors)? {
                return Ok(failed(state));
            }
        }
    }

    fn reject_plan(
        &self,
        state: &mut WorkflowState,
        report: ValidationReport,
        findings: Vec<Finding>,
    ) -> WorkflowResult<RunResult> {
        let cycles: Vec<&str> = findings
            .iter()
            .filter(|f| f.code == FindingCode::CircularDependency)
            .map(|f| f.message.as_str())
            .collect();
        if !cycles.is_empty() {
            let count = cycles.len().to_string();
            let detail = cycles.join("; ");
            state.log(
                Event::CycleDetected,
                &[("cycles", count.as_str()), ("detail", detail.as_str())],
            );
        }

        state.record_findings(findings.iter().cloned());
        state.transition(Stage::reject)?;

        let mut all = report.into_findings();
        all.extend(findings);
        let report = ValidationReport::from_findings(all);

        log_rejection(state, &report);
        Ok(RunResult::RejectedAtValidation { report })
    }

    /// Records a failed attempt and routes to Generating or Failed.
    ///
    /// Returns true when another attempt is scheduled.
    fn after_failure(
        &self,
        state: &mut WorkflowState,
        outcome: AttemptOutcome,
        findings: Vec<Finding>,
    ) -> WorkflowResult<bool> {
        state.record_attempt(outcome, findings.clone());
        state.record_findings(findings);

        if state.retries() < self.config.max_retries {
            state.increment_retries();
            state.transition(Stage::retry)?;
            let retries = state.retries().to_string();
            let max = self.config.max_retries.to_string();
            state.log(
                Event::RetryScheduled,
                &[("max_retries", max.as_str()), ("retries", retries.as_str())],
            );
            Ok(true)
        } else {
            state.transition(Stage::fail)?;
            let attempts = state.attempts().len().to_string();
            state.log(Event::RunFailed, &[("attempts", attempts.as_str())]);
            Ok(false)
        }
    }
}

/// Awaits a collaborator call under a timeout, unless cancelled first.
async fn suspend<T, F>(
    cancel: &mut CancelToken,
    timeout: Duration,
    call: F,
) -> Option<Result<T, GenerationError>>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    let limit = timeout.as_millis() as u64;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        outcome = tokio::time::timeout(timeout, call) => {
            Some(outcome.unwrap_or(Err(GenerationError::Timeout(limit))))
        }
    }
}

fn log_rejection(state: &WorkflowState, report: &ValidationReport) {
    let errors = report.error_count().to_string();
    let tables = report.error_tables().join(",");
    state.log(
        Event::ValidationRejected,
        &[
            ("errors", errors.as_str()),
            ("summary", report.summary().as_str()),
            ("tables", tables.as_str()),
        ],
    );
}

fn cancelled(state: &WorkflowState) -> RunResult {
    let retries = state.retries().to_string();
    state.log(
        Event::RunCancelled,
        &[("retries", retries.as_str()), ("stage", state.stage().name())],
    );
    RunResult::Cancelled {
        stage: state.stage(),
        retries: state.retries(),
    }
}

fn failed(state: &WorkflowState) -> RunResult {
    let last_findings = state
        .attempts()
        .last()
        .map(|a| a.findings.clone())
        .unwrap_or_default();
    RunResult::Failed {
        attempts: state.attempts().to_vec(),
        last_findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, ColumnType, DatabaseKind, Location, TableSpec};
    use crate::workflow::collaborators::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoGenerator {
        calls: AtomicUsize,
    }

    impl Generator for EchoGenerator {
        fn generate<'a>(
            &'a self,
            plan: &'a ArchitecturePlan,
            _feedback: &'a [Finding],
        ) -> BoxFuture<'a, Result<Artifacts, GenerationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(plan
                    .specs
                    .iter()
                    .map(|s| (format!("models/{}.py", s.table_name), s.class_name.clone()))
                    .collect())
            })
        }
    }

    struct RejectAll;

    impl OutputValidator for RejectAll {
        fn check<'a>(
            &'a self,
            _artifacts: &'a Artifacts,
        ) -> BoxFuture<'a, Result<ValidationReport, GenerationError>> {
            Box::pin(async {
                Ok(ValidationReport::from_findings(vec![Finding::new(
                    FindingCode::OutputCheckFailed,
                    Location::artifact("models/users.py"),
                    "line too long",
                )
                .with_rule("E501")]))
            })
        }
    }

    fn blog() -> SchemaDocument {
        SchemaDocument::new("Blog", DatabaseKind::Sqlite).with_table(
            TableSpec::new("users", "User")
                .with_column(ColumnSpec::primary_key("id"))
                .with_column(ColumnSpec::new("bio", ColumnType::Text)),
        )
    }

    fn machine(max_retries: u32, validator: Arc<dyn OutputValidator>) -> PipelineStateMachine {
        let config = PipelineConfig {
            max_retries,
            ..PipelineConfig::default()
        };
        let generator = Arc::new(EchoGenerator {
            calls: AtomicUsize::new(0),
        });
        PipelineStateMachine::new(config, generator, validator)
    }

    #[tokio::test]
    async fn test_zero_retries_fails_after_one_attempt() {
        let (result, state) = machine(0, Arc::new(RejectAll))
            .run_traced(&blog(), CancelToken::never())
            .await
            .unwrap();

        match result {
            RunResult::Failed {
                attempts,
                last_findings,
            } => {
                assert_eq!(attempts.len(), 1);
                assert_eq!(last_findings[0].rule.as_deref(), Some("E501"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(state.retries(), 0);
        assert_eq!(state.stage(), Stage::Failed);
    }

    #[tokio::test]
    async fn test_retry_counter_never_exceeds_max() {
        let (result, state) = machine(2, Arc::new(RejectAll))
            .run_traced(&blog(), CancelToken::never())
            .await
            .unwrap();

        assert_eq!(result.name(), "failed");
        assert_eq!(state.retries(), 2);
        assert_eq!(state.attempts().len(), 3);
        assert!(state.history().iter().all(|t| t.retries <= 2));
        // Feedback accumulates one error per failed attempt
        assert_eq!(state.findings().len(), 3);
    }
}

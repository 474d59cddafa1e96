//! Observability events for backbone
//!
//! Every lifecycle event the pipeline can emit. Events are explicit and
//! typed; each carries the severity it is logged with.

use std::fmt;

use super::logger::Severity;

/// Observable events in backbone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Inputs
    /// Configuration loaded
    ConfigLoaded,
    /// Schema document loaded
    SchemaLoaded,

    // Run lifecycle
    /// Pipeline run begins
    RunStart,
    /// State machine moved between stages
    StageTransition,
    /// Schema rejected before generation
    ValidationRejected,
    /// Dependency cycle found while planning
    CycleDetected,
    /// Architecture plan resolved
    PlanResolved,

    // Generation
    /// Generator invoked
    GenerationAttempt,
    /// Generator failed or timed out
    GenerationFailed,
    /// Output validator reported errors
    OutputRejected,
    /// Control routed back to generation
    RetryScheduled,

    // Outcomes
    /// Run finished successfully
    RunSucceeded,
    /// Run exhausted its retries
    RunFailed,
    /// Run cancelled by its caller
    RunCancelled,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",

            Event::RunStart => "RUN_START",
            Event::StageTransition => "STAGE_TRANSITION",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::CycleDetected => "CYCLE_DETECTED",
            Event::PlanResolved => "PLAN_RESOLVED",

            Event::GenerationAttempt => "GENERATION_ATTEMPT",
            Event::GenerationFailed => "GENERATION_FAILED",
            Event::OutputRejected => "OUTPUT_REJECTED",
            Event::RetryScheduled => "RETRY_SCHEDULED",

            Event::RunSucceeded => "RUN_SUCCEEDED",
            Event::RunFailed => "RUN_FAILED",
            Event::RunCancelled => "RUN_CANCELLED",
        }
    }

    /// Severity this event is logged with
    pub fn severity(&self) -> Severity {
        match self {
            Event::StageTransition | Event::GenerationAttempt => Severity::Trace,
            Event::ValidationRejected
            | Event::CycleDetected
            | Event::GenerationFailed
            | Event::OutputRejected
            | Event::RunCancelled => Severity::Warn,
            Event::RunFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::RunStart.as_str(), "RUN_START");
        assert_eq!(Event::RetryScheduled.as_str(), "RETRY_SCHEDULED");
        assert_eq!(Event::SchemaLoaded.to_string(), "SCHEMA_LOADED");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::StageTransition.severity(), Severity::Trace);
        assert_eq!(Event::RunSucceeded.severity(), Severity::Info);
        assert_eq!(Event::OutputRejected.severity(), Severity::Warn);
        assert_eq!(Event::RunFailed.severity(), Severity::Error);
    }
}

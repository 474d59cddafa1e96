//! Observability subsystem for backbone
//!
//! Structured one-line JSON logging of typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use backbone::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Warn);
//! log_event_with_fields(Event::PlanResolved, &[("tables", "4")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_with_fields() {
        // Verifies no panic
        log_event_with_fields(Event::RunStart, &[]);
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/backbone.json")]);
    }

    #[test]
    fn test_event_severity_gates_output() {
        assert!(Event::RunFailed.severity() > Event::RunSucceeded.severity());
        assert_eq!(Event::StageTransition.severity(), Severity::Trace);
    }
}

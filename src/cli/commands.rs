//! CLI command implementations
//!
//! Both commands load the schema, apply the optional pipeline config and
//! write pretty JSON to stdout. A report with error findings is printed
//! first and then turned into a non-zero exit.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::observability::Logger;
use crate::planner::{ArchitecturePlan, PlanResolver};
use crate::schema::{SchemaLoader, ValidationReport, Validator};
use crate::workflow::PipelineConfig;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Validate { schema, config } => validate(&schema, config.as_deref()),
        Command::Plan { schema, config } => plan(&schema, config.as_deref()),
    }
}

/// Validate a schema document and print the report
pub fn validate(schema_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let report = validation_report(schema_path, config_path)?;
    write_pretty(&report)?;

    if report.has_errors() {
        return Err(CliError::schema_rejected(report.error_count()));
    }
    Ok(())
}

/// Validate a schema document and print its architecture plan
///
/// A rejected schema prints the report instead of a plan.
pub fn plan(schema_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    match resolve_plan(schema_path, config_path)? {
        Ok(plan) => write_pretty(&plan),
        Err(report) => {
            write_pretty(&report)?;
            Err(CliError::schema_rejected(report.error_count()))
        }
    }
}

/// Loads config and applies its log level
fn load_config(config_path: Option<&Path>) -> CliResult<PipelineConfig> {
    let config = match config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    Logger::set_min_severity(config.log_severity());
    Ok(config)
}

/// Loads and validates a schema document
pub fn validation_report(
    schema_path: &Path,
    config_path: Option<&Path>,
) -> CliResult<ValidationReport> {
    let config = load_config(config_path)?;
    let doc = SchemaLoader::load(schema_path)?;
    Ok(Validator::with_config(config.validator).validate(&doc))
}

/// Loads, validates and plans a schema document
///
/// The inner `Err` is the rejection report: validation errors, or the
/// validation warnings followed by cycle and planner findings.
pub fn resolve_plan(
    schema_path: &Path,
    config_path: Option<&Path>,
) -> CliResult<Result<ArchitecturePlan, ValidationReport>> {
    let config = load_config(config_path)?;
    let doc = SchemaLoader::load(schema_path)?;

    let report = Validator::with_config(config.validator).validate(&doc);
    if report.has_errors() {
        return Ok(Err(report));
    }

    Ok(PlanResolver::plan(&doc).map_err(|findings| {
        let mut all = report.into_findings();
        all.extend(findings);
        ValidationReport::from_findings(all)
    }))
}

fn write_pretty<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

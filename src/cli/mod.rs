//! CLI module for backbone
//!
//! Provides command-line interface for:
//! - validate: Print the validation report of a schema document
//! - plan: Print the architecture plan of a valid schema document

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{plan, resolve_plan, run, run_command, validate, validation_report};
pub use errors::{CliError, CliErrorCode, CliResult};

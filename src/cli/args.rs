//! CLI argument definitions using clap
//!
//! Commands:
//! - backbone validate --schema <path> [--config <path>]
//! - backbone plan --schema <path> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// backbone - schema validation and build planning
#[derive(Parser, Debug)]
#[command(name = "backbone")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a schema document and print the report
    Validate {
        /// Path to the schema document
        #[arg(long)]
        schema: PathBuf,

        /// Path to pipeline configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a schema document and print its architecture plan
    Plan {
        /// Path to the schema document
        #[arg(long)]
        schema: PathBuf,

        /// Path to pipeline configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_with_config() {
        let cli = Cli::try_parse_from([
            "backbone",
            "plan",
            "--schema",
            "blog.json",
            "--config",
            "backbone.json",
        ])
        .unwrap();

        match cli.command {
            Command::Plan { schema, config } => {
                assert_eq!(schema, PathBuf::from("blog.json"));
                assert_eq!(config, Some(PathBuf::from("backbone.json")));
            }
            other => panic!("expected plan, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_is_required() {
        assert!(Cli::try_parse_from(["backbone", "validate"]).is_err());
    }
}

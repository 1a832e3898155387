//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// apigw - Declarative API Gateway reconciliation.
#[derive(Parser, Debug)]
#[command(name = "apigw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short = 'f', long, global = true, env = "APIGW_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter manifest.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the manifest without contacting AWS.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show what applying the manifest would change.
    Plan,

    /// Apply the manifest.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Keep running the remaining tasks after a failure.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List the VPC links of the account.
    VpcLinks,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from(["apigw", "-f", "api.yaml", "apply", "--yes", "--continue-on-error"])
            .expect("parse");
        assert_eq!(cli.manifest, Some(PathBuf::from("api.yaml")));
        assert!(matches!(
            cli.command,
            Commands::Apply {
                yes: true,
                continue_on_error: true
            }
        ));
    }

    #[test]
    fn test_global_output_flag() {
        let cli = Cli::try_parse_from(["apigw", "vpc-links", "--output", "json"]).expect("parse");
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::VpcLinks));
    }
}

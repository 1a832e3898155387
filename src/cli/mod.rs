//! CLI module for the apigw tool.
//!
//! This module provides the command-line interface for planning and
//! applying API Gateway manifests.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;

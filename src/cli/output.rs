//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::gateway::VpcLink;
use crate::planner::{ExecutionResult, TaskReport};
use crate::reconciler::Action;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Task row for table display.
#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    identity: String,
    #[tabled(rename = "Changes")]
    changes: usize,
}

/// VPC link row for table display.
#[derive(Tabled)]
struct VpcLinkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Targets")]
    targets: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats a check-mode run for display.
    #[must_use]
    pub fn format_plan(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_result_text(result, "Plan"),
        }
    }

    /// Formats an apply run for display.
    #[must_use]
    pub fn format_apply(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_result_text(result, "Apply"),
        }
    }

    /// Formats an execution result as text.
    fn format_result_text(result: &ExecutionResult, title: &str) -> String {
        if result.failed == 0 && result.changed == 0 {
            return format!("{} No changes required - API Gateway is up to date.\n", "✓".green());
        }

        let mut output = String::new();
        let _ = write!(output, "\n{title}\n\n");

        let rows: Vec<TaskRow> = result
            .reports
            .iter()
            .map(|r| TaskRow {
                index: r.index + 1,
                action: Self::format_action(r),
                kind: r.kind.to_string(),
                identity: Self::truncate(&r.identity, 40),
                changes: r.changes.len(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        for report in result.reports.iter().filter(|r| !r.changes.is_empty()) {
            let _ = writeln!(output, "\n{} '{}':", report.kind, report.identity);
            for change in &report.changes {
                let _ = writeln!(output, "   {change}");
            }
        }

        let errors: Vec<&TaskReport> = result.reports.iter().filter(|r| r.error.is_some()).collect();
        if !errors.is_empty() {
            let _ = write!(output, "\n{} Errors:\n", "✗".red());
            for report in errors {
                let _ = writeln!(
                    output,
                    "   - task {}: {}",
                    report.index + 1,
                    report.error.as_deref().unwrap_or_default()
                );
            }
        }

        let counts = |action: Action| result.reports.iter().filter(|r| r.action == Some(action)).count();
        let _ = write!(
            output,
            "\n{title}: {} to create, {} to update, {} to delete",
            counts(Action::Create).to_string().green(),
            counts(Action::Update).to_string().yellow(),
            counts(Action::Delete).to_string().red()
        );
        if result.skipped > 0 {
            let _ = write!(output, ", {} skipped", result.skipped.to_string().dimmed());
        }
        output.push('\n');

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": if show_warnings { result.warnings.clone() } else { Vec::new() },
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Manifest is valid!\n", "✓".green())
                } else {
                    let mut output = format!("{} Manifest is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats the VPC link listing.
    #[must_use]
    pub fn format_vpc_links(&self, links: &[VpcLink]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(links).unwrap_or_default(),
            OutputFormat::Text => {
                if links.is_empty() {
                    return String::from("   No VPC links found.\n");
                }
                let rows: Vec<VpcLinkRow> = links
                    .iter()
                    .map(|l| VpcLinkRow {
                        id: l.id.clone(),
                        name: Self::truncate(&l.name, 30),
                        status: Self::format_link_status(l.status.as_deref()),
                        targets: l.target_arns.len(),
                    })
                    .collect();
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats the action of a task with color.
    fn format_action(report: &TaskReport) -> String {
        match report.action {
            Some(Action::Create) => "+create".green().to_string(),
            Some(Action::Update) => "~update".yellow().to_string(),
            Some(Action::Delete) => "-delete".red().to_string(),
            Some(Action::Noop) => "noop".dimmed().to_string(),
            None => "failed".red().bold().to_string(),
        }
    }

    /// Formats a VPC link status with color.
    fn format_link_status(status: Option<&str>) -> String {
        match status {
            Some("AVAILABLE") => "available".green().to_string(),
            Some("PENDING") => "pending".yellow().to_string(),
            Some("DELETING" | "FAILED") => status.unwrap_or_default().to_lowercase().red().to_string(),
            Some(other) => other.to_lowercase(),
            None => "unknown".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

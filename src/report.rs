//! Output formatting for command results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{ErrorWithLocation, Severity};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub project: String,
    pub command: String,
    pub error_count: usize,
    pub warning_count: usize,
    pub diagnostics: Vec<JsonDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based; 0 when the diagnostic has no location.
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// Build the JSON report for one command run.
pub fn build_json_report(
    project: &Path,
    command: &str,
    errors: &[ErrorWithLocation],
    generated_files: &[String],
) -> JsonReport {
    let (error_count, warning_count) = count_by_severity(errors);
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        project: project.to_string_lossy().to_string(),
        command: command.to_string(),
        error_count,
        warning_count,
        diagnostics: errors.iter().map(|e| diagnostic_to_json(e, project)).collect(),
        generated_files: generated_files
            .iter()
            .map(|f| make_relative_path(f, project))
            .collect(),
    }
}

/// Write results in JSON format.
pub fn write_json(
    project: &Path,
    command: &str,
    errors: &[ErrorWithLocation],
    generated_files: &[String],
) -> anyhow::Result<()> {
    let report = build_json_report(project, command, errors, generated_files);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn diagnostic_to_json(error: &ErrorWithLocation, project: &Path) -> JsonDiagnostic {
    let (file, (line, column), (end_line, end_column)) = match &error.location {
        Some(loc) => (
            Some(make_relative_path(&loc.file_name, project)),
            loc.line_column(),
            loc.end_line_column(),
        ),
        None => (None, (0, 0), (0, 0)),
    };
    JsonDiagnostic {
        severity: error.severity.to_string(),
        message: error.message.clone(),
        file,
        line,
        column,
        end_line,
        end_column,
    }
}

fn count_by_severity(errors: &[ErrorWithLocation]) -> (usize, usize) {
    let error_count = errors.iter().filter(|e| e.is_error()).count();
    (error_count, errors.len() - error_count)
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    if base_path.as_os_str().is_empty() {
        return file_path.to_string();
    }

    Path::new(file_path)
        .strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.to_string())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write diagnostics in pretty (human-readable) format.
pub fn write_pretty(project: &Path, command: &str, errors: &[ErrorWithLocation]) {
    // Header
    println!();
    print!("  ");
    print!("{}", "tsgql".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Project:  ".dimmed());
    println!("{}", project.display());
    print!("  {}", "Command:  ".dimmed());
    println!("{}", command);
    println!();

    if !errors.is_empty() {
        write_diagnostics(project, errors);
        println!();
    }

    write_final_status(errors);
    println!();
}

/// Print the list of generated files below the diagnostics.
pub fn write_generated_files(project: &Path, files: &[String], dry_run: bool) {
    if files.is_empty() {
        return;
    }
    let title = if dry_run { "Would generate" } else { "Generated" };
    println!("  {} ({}):", title.bold(), files.len());
    for file in files {
        println!("    {}", make_relative_path(file, project).blue());
    }
    println!();
}

fn write_diagnostics(project: &Path, errors: &[ErrorWithLocation]) {
    println!("  {} ({}):", "Diagnostics".bold(), errors.len());
    println!();

    for e in errors {
        write_severity_tag(&e.severity);
        match &e.location {
            Some(loc) => {
                let (line, column) = loc.line_column();
                print!("{}", make_relative_path(&loc.file_name, project).blue());
                print!("{}", format!(":{}:{}", line, column).dimmed());
                println!();
                println!("            {}", e.message);
                if let Some(source_line) = loc.content.lines().nth(line.saturating_sub(1)) {
                    println!("            {}", source_line.trim_end().dimmed());
                    let indent = column.saturating_sub(1);
                    let available = source_line.len().saturating_sub(indent).max(1);
                    let width = loc.end.saturating_sub(loc.start).clamp(1, available);
                    println!("            {}{}", " ".repeat(indent), "^".repeat(width).red());
                }
            }
            None => {
                println!();
                println!("            {}", e.message);
            }
        }
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
    }
}

fn write_final_status(errors: &[ErrorWithLocation]) {
    let (error_count, warning_count) = count_by_severity(errors);
    if error_count == 0 {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }
    let plural = |n: usize| if n != 1 { "s" } else { "" };
    println!(
        "  {} error{}, {} warning{}",
        error_count,
        plural(error_count),
        warning_count,
        plural(warning_count)
    );
}

//! Command-line interface for tsgql.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::analyzer::{write_output_files, Analyzer, AnalyzerFactory};
use crate::errors::ErrorWithLocation;
use crate::extract::ManifestOutput;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

const DEFAULT_REPORT_NAME: &str = "GRAPHQL_OPERATIONS.md";

/// GraphQL in TypeScript - validate embedded documents and generate types.
///
/// tsgql finds GraphQL documents in tagged template literals, resolves the
/// fragments they spread, checks them against the project schema and writes
/// TypeScript declarations for every operation and fragment.
#[derive(Parser)]
#[command(name = "tsgql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate embedded documents against the schema
    #[command(visible_alias = "check")]
    Validate(ValidateArgs),
    /// Generate TypeScript declarations for each document
    Typegen(TypegenArgs),
    /// Write a markdown report of the extracted documents
    Report(ReportArgs),
    /// Print the extraction manifest as JSON
    Extract(ExtractArgs),
}

/// Options shared by every command.
#[derive(Args)]
pub struct ProjectArgs {
    /// Project directory or configuration file
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

#[derive(Args)]
pub struct TypegenArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Report the files that would be generated without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Report file path (default: GRAPHQL_OPERATIONS.md in the project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Render from a manifest written by `extract` instead of extracting
    #[arg(long)]
    pub from_manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Manifest file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Load the project, printing the setup error on failure.
fn load_analyzer(project: &Path) -> Result<Analyzer, i32> {
    AnalyzerFactory::new()
        .create_from_project_path(project)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        })
}

fn check_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
        return false;
    }
    true
}

fn exit_code(errors: &[ErrorWithLocation]) -> i32 {
    if errors.iter().any(ErrorWithLocation::is_error) {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

/// Run the validate command.
pub async fn run_validate(args: &ValidateArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let analyzer = match load_analyzer(&args.project.project) {
        Ok(analyzer) => analyzer,
        Err(code) => return Ok(code),
    };

    let result = analyzer.validate().await;

    match args.format.as_str() {
        "json" => report::write_json(analyzer.root(), "validate", &result.errors, &[])?,
        _ => report::write_pretty(analyzer.root(), "validate", &result.errors),
    }
    Ok(exit_code(&result.errors))
}

/// Run the typegen command.
pub async fn run_typegen(args: &TypegenArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let analyzer = match load_analyzer(&args.project.project) {
        Ok(analyzer) => analyzer,
        Err(code) => return Ok(code),
    };

    let result = analyzer.typegen().await;
    if !args.dry_run {
        write_output_files(&result.output_source_files)?;
    }

    let generated: Vec<String> = result
        .output_source_files
        .iter()
        .map(|f| f.file_name.clone())
        .collect();
    match args.format.as_str() {
        "json" => report::write_json(analyzer.root(), "typegen", &result.errors, &generated)?,
        _ => {
            report::write_pretty(analyzer.root(), "typegen", &result.errors);
            report::write_generated_files(analyzer.root(), &generated, args.dry_run);
        }
    }
    Ok(exit_code(&result.errors))
}

/// Run the report command.
pub fn run_report(args: &ReportArgs) -> anyhow::Result<i32> {
    let analyzer = match load_analyzer(&args.project.project) {
        Ok(analyzer) => analyzer,
        Err(code) => return Ok(code),
    };

    let manifest = match &args.from_manifest {
        Some(path) => {
            let json = match std::fs::read_to_string(path) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error: cannot read manifest {}: {}", path.display(), e);
                    return Ok(EXIT_ERROR);
                }
            };
            match ManifestOutput::from_json(&json) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    eprintln!("Error: invalid manifest {}: {}", path.display(), e);
                    return Ok(EXIT_ERROR);
                }
            }
        }
        None => None,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| analyzer.root().join(DEFAULT_REPORT_NAME));
    let (errors, markdown) = analyzer.report(&output, manifest.as_ref());

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&output, markdown)?;

    report::write_pretty(analyzer.root(), "report", &errors);
    println!("  Wrote {}", output.display());
    Ok(exit_code(&errors))
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    let analyzer = match load_analyzer(&args.project.project) {
        Ok(analyzer) => analyzer,
        Err(code) => return Ok(code),
    };

    let (result, manifest) = analyzer.extract_to_manifest();
    let json = manifest.to_json()?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }

    // Diagnostics go to stderr so stdout stays valid JSON.
    let errors = result.pickup_errors();
    for error in &errors {
        eprintln!("{}", error);
    }
    Ok(exit_code(&errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_typegen_args() {
        let cli = Cli::try_parse_from(["tsgql", "typegen", "--project", "prj", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Typegen(args) => {
                assert_eq!(args.project.project, PathBuf::from("prj"));
                assert!(args.dry_run);
                assert_eq!(args.format, "pretty");
            }
            _ => panic!("expected typegen"),
        }
    }

    #[test]
    fn test_missing_project_is_setup_error() {
        let args = ExtractArgs {
            project: ProjectArgs {
                project: PathBuf::from("NOT_EXISTING_PRJ"),
            },
            output: None,
        };
        assert_eq!(run_extract(&args).unwrap(), EXIT_ERROR);
    }
}

//! tsgql CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsgql::cli::{self, Cli, Commands, EXIT_ERROR};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Validate(args) => cli::run_validate(args).await,
        Commands::Typegen(args) => cli::run_typegen(args).await,
        Commands::Report(args) => cli::run_report(args),
        Commands::Extract(args) => cli::run_extract(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

// Caselink CLI - headless inspection of export reconciliation configs

mod exit_codes;
mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "caselink")]
#[command(about = "Reconcile collection-tool export metadata with a review case (headless tools)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the configured export files and report what they contain
    #[command(after_help = "\
Examples:
  caselink inspect run.toml
  caselink inspect run.toml --json
  caselink inspect run.toml --output report.json")]
    Inspect {
        /// Path to the run config TOML file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a run config without reading any export file
    #[command(after_help = "\
Examples:
  caselink validate run.toml")]
    Validate {
        /// Path to the run config TOML file
        config: PathBuf,
    },
}

pub struct CliError {
    pub code: u8,
    pub message: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect {
            config,
            json,
            output,
        } => inspect::cmd_inspect(config, json, output),
        Commands::Validate { config } => inspect::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::from(err.code)
        }
    }
}

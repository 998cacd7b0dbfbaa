mod report;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use catalogue::Catalogue;
use clap::{Parser, Subcommand, ValueEnum};
use course_requirement_parser::{parse_requirement, render};
use tracing::info;
use tracing_subscriber::EnvFilter;

use report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Checks course prerequisite expressions against their grammar and a course catalogue.
#[derive(Parser)]
#[command(name = "prereq-lint", version, about)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse one prerequisite expression per line of a file
    Check {
        /// Text file with one expression per line
        file: PathBuf,
        /// Catalogue to verify course codes against (JSON file or directory of records)
        #[arg(long)]
        catalogue: Option<PathBuf>,
    },

    /// Parse and verify the prerequisites of every course in a catalogue
    Catalogue {
        /// JSON file keyed by course code, or a directory of per-course records
        path: PathBuf,
    },

    /// Print the tree for a single expression
    Show {
        /// The prerequisite expression
        expression: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Check { file, catalogue } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let catalogue = catalogue.as_deref().map(load_catalogue).transpose()?;
            let report = report::check_lines(&text, catalogue.as_ref())?;
            print_report(&report, cli.output)
        }
        Command::Catalogue { path } => {
            let catalogue = load_catalogue(&path)?;
            let report = report::check_catalogue(&catalogue)?;
            print_report(&report, cli.output)
        }
        Command::Show { expression } => match parse_requirement(&expression) {
            Ok(requirement) => {
                match cli.output {
                    OutputFormat::Text => println!("{}", render(&requirement)),
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&requirement)?)
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(error) => {
                println!("{error}");
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_catalogue(path: &Path) -> anyhow::Result<Catalogue> {
    let catalogue = Catalogue::load(path)
        .with_context(|| format!("failed to load catalogue from {}", path.display()))?;
    info!(courses = catalogue.len(), path = %path.display(), "loaded catalogue");
    Ok(catalogue)
}

fn print_report(report: &Report, output: OutputFormat) -> anyhow::Result<ExitCode> {
    match output {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

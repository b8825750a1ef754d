use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use hospaudit_lib::communication::{dispatch_all, ConsoleSink, Destination};
use hospaudit_lib::config::{AuditConfig, APP_NAME, APP_VERSION};
use hospaudit_lib::models::{AuditInput, AuditResult};
use hospaudit_lib::pipeline::AuditEngine;

#[derive(Parser)]
#[command(name = "hospaudit")]
#[command(about = "Audit hospitalization records before claims reach the payer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DocumentArgs {
    /// Text extracted from the hospitalization record
    file: PathBuf,
    /// Name reported in the result (defaults to the file name)
    #[arg(long)]
    filename: Option<String>,
    /// Audit date, YYYY-MM-DD (defaults to the local date)
    #[arg(long)]
    today: Option<NaiveDate>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the audit result as JSON
    Audit {
        #[command(flatten)]
        document: DocumentArgs,
        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the message for each responsible sector
    Communications {
        #[command(flatten)]
        document: DocumentArgs,
        /// Mobile number to address the messages to (e.g. +54 9 11 1234-5678)
        #[arg(long)]
        to: Option<String>,
    },
}

fn run_audit(args: &DocumentArgs) -> Result<AuditResult, Box<dyn std::error::Error>> {
    let config = AuditConfig::load(args.config.as_deref())?;
    let engine = AuditEngine::new(config)?;
    let text = std::fs::read_to_string(&args.file)?;
    let filename = args.filename.clone().unwrap_or_else(|| display_name(&args.file));
    let today = args.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    tracing::debug!(file = %args.file.display(), %today, "Auditing document");
    Ok(engine.audit(&AuditInput::new(text, filename), today)?)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Audit { document, pretty } => {
            let result = run_audit(&document)?;
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Commands::Communications { document, to } => {
            let destination = to.as_deref().map(Destination::parse).transpose()?;
            let result = run_audit(&document)?;
            match destination {
                Some(destination) => {
                    let report = dispatch_all(&ConsoleSink, &result.communications, &destination);
                    if let Some(first) = report.failures.into_iter().next() {
                        return Err(first.into());
                    }
                }
                None if result.communications.is_empty() => {
                    println!("Sin observaciones: historia clínica aprobada.");
                }
                None => {
                    for communication in &result.communications {
                        println!("{}\n", communication.body);
                    }
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    hospaudit_lib::init_tracing();
    tracing::info!("{} v{}", APP_NAME, APP_VERSION);

    match execute(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

//! efiscal CLI - invoice note triage in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{categorize, list, logs, status, upload};

/// efiscal - ingest and categorize invoice notes
#[derive(Parser)]
#[command(name = "efiscal", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an .xlsx export of invoice notes
    Upload {
        /// Path to the .xlsx file
        file: PathBuf,
        /// Report what would be stored without writing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Categorize every untreated note
    Categorize {
        /// Only report how many notes are pending
        #[arg(long)]
        check: bool,
        /// Show the categorization without saving it
        #[arg(long, conflicts_with = "check")]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored notes
    List {
        /// Category (padrao, qualidade, devolucao, nao-identificado)
        #[arg(long)]
        category: Option<String>,
        /// Latest supply date to include (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Case-insensitive text to search for
        #[arg(long)]
        text: Option<String>,
        /// Only treated (true) or untreated (false) notes
        #[arg(long)]
        treated: Option<bool>,
        /// Maximum number of notes (defaults to listLimit)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Notes to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show note counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EFISCAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upload { file, preview, json } => upload::run(&file, preview, json),
        Commands::Categorize { check, dry_run, json } => categorize::run(check, dry_run, json),
        Commands::List { category, until, text, treated, limit, offset, json } => {
            list::run(list::ListArgs { category, until, text, treated, limit, offset }, json)
        }
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}

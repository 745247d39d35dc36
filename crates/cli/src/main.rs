//! Apoyo CLI — the main entry point.
//!
//! Commands:
//! - `generate` — Run one support generation for a report
//! - `ingest`   — Add a playbook document to the retrieval corpus
//! - `config`   — Initialize or inspect configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "apoyo",
    about = "Apoyo — guardrailed educational-support generation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate support suggestions from an observation report
    Generate {
        /// The student's given name
        #[arg(long)]
        name: String,

        /// Age in years
        #[arg(long)]
        age: u8,

        /// Group label (e.g. "2B")
        #[arg(long)]
        group: String,

        /// Path to a file holding the observation report text
        #[arg(long)]
        report_file: std::path::PathBuf,

        /// Context tags to retrieve for (repeatable); defaults to aula+casa
        #[arg(long = "context")]
        contexts: Vec<String>,
    },

    /// Add a playbook document to the retrieval corpus
    Ingest {
        /// Unique id for the playbook
        #[arg(long)]
        id: String,

        /// Path to the playbook body text
        #[arg(long)]
        file: std::path::PathBuf,

        /// Youngest age the strategy applies to
        #[arg(long)]
        age_min: u8,

        /// Oldest age the strategy applies to
        #[arg(long)]
        age_max: u8,

        /// Comma-joined context tags, e.g. "aula,casa"
        #[arg(long)]
        contexts: String,
    },

    /// Initialize or inspect configuration
    Config {
        /// Write a default config file instead of showing the resolved one
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            name,
            age,
            group,
            report_file,
            contexts,
        } => commands::generate::run(name, age, group, report_file, contexts).await?,
        Commands::Ingest {
            id,
            file,
            age_min,
            age_max,
            contexts,
        } => commands::ingest::run(id, file, age_min, age_max, contexts).await?,
        Commands::Config { init } => commands::config_cmd::run(init)?,
    }

    Ok(())
}

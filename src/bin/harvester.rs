//! harvester - resumable profile harvesting
//!
//! Thin command-line front end over [`profile_harvester::Harvester`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use profile_harvester::{Harvester, run_with_shutdown};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// harvester - resumable profile harvesting
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the run configuration
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process the next batch of work items
    Run {
        /// Mark failed rows in the work file afterwards
        #[arg(long)]
        mark_failures: bool,
    },

    /// Check every session and enable or disable it
    Probe,

    /// Drop malformed rows from the work file
    Validate,

    /// Put the failure marker on work file rows
    MarkFailures {
        /// Source indices (0 = first row after the header)
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut harvester = Harvester::open(&cli.config)
        .with_context(|| format!("cannot open {}", cli.config.display()))?;

    match cli.command {
        Commands::Run { mark_failures } => {
            let fetcher = harvester.http_fetcher();
            let report = run_with_shutdown(&mut harvester, fetcher).await?;
            if mark_failures {
                harvester
                    .mark_failures(&report.failed_indices)
                    .context("failed to mark failed rows")?;
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Probe => {
            let fetcher = harvester.http_fetcher();
            let report = harvester.probe(fetcher).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Validate => {
            let summary = harvester.validate_input()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::MarkFailures { indices } => {
            let marked = harvester.mark_failures(&indices)?;
            println!("{marked} rows marked");
        }
    }

    Ok(())
}

//! Command-line driver for the psyche inference core
//!
//! Reads behavioral events from disk, runs them through the profile
//! pipeline and prints JSON to stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Profile a subject from a JSON array or JSON-lines event file
//! psyche-cli profile --events ./events.json --subject visitor-17
//!
//! # Fuse in an externally produced heuristic output and replay a deep output
//! psyche-cli profile --events ./events.jsonl --heuristic ./rules.json --deep ./deep.json
//!
//! # Credit estimate for an operation
//! psyche-cli estimate --op deep_inference --size 12000
//!
//! # Effective flags and rate limits after environment overrides
//! FEATURE_FLAG_SEQ_EMBEDDING=true psyche-cli flags
//! RATE_LIMIT_DEEP_INFERENCE_CAPACITY=5 psyche-cli limits
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline over an event file
    Profile {
        /// JSON array or JSON-lines file of events, oldest first
        #[arg(long)]
        events: PathBuf,

        /// Subject the admission budget is charged to
        #[arg(long, default_value = "anonymous")]
        subject: String,

        /// Layer output produced by the external heuristic layer
        #[arg(long)]
        heuristic: Option<PathBuf>,

        /// Layer output to replay as the deep layer's answer
        #[arg(long)]
        deep: Option<PathBuf>,
    },
    /// Estimate the credit cost of an operation
    Estimate {
        /// Operation identifier, e.g. `deep_inference`
        #[arg(long)]
        op: String,

        /// Input size hint in characters
        #[arg(long)]
        size: Option<u64>,
    },
    /// List priced operations and their base credits
    Costs,
    /// Show every known runtime flag and its effective state
    Flags,
    /// Show the effective rate-limit policy
    Limits,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(command = ?cli.command, "psyche-cli starting");

    let output = match cli.command {
        Command::Profile {
            events,
            subject,
            heuristic,
            deep,
        } => {
            commands::profile(&commands::ProfileArgs {
                events,
                subject,
                heuristic,
                deep,
            })
            .await?
        }
        Command::Estimate { op, size } => commands::estimate(&op, size)?,
        Command::Costs => commands::costs(),
        Command::Flags => commands::flags(),
        Command::Limits => commands::limits()?,
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}

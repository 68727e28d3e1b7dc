use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "worktime",
    about = "Work-hours activity segmentation and daily analytics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API server in the foreground.
    Serve,
    /// Show database and processing status.
    Status,
    /// Ingest sessions from a JSON file (one request or an array).
    Ingest {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        batch: bool,
    },
    /// Segment every stored session still waiting for processing.
    Reprocess {
        #[arg(long)]
        user: Option<String>,
    },
    /// Recompute the daily aggregation for one date.
    Recompute {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        date: String,
    },
    /// Recompute daily aggregations for a date range (inclusive).
    RecomputeRange {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

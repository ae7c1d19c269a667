//! Command-line interface.

pub mod bootstrap;
pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::fetch::FetchArgs;
use commands::partitions::PartitionsArgs;
use commands::records::RecordsArgs;

#[derive(Parser, Debug)]
#[command(name = "metric-cache")]
#[command(about = "Cached per-partition metrics over a ledger snapshot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .metric-cache/config.yaml and local.yaml)
    #[arg(short, long, global = true, env = "METRIC_CACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch metrics through the cache, computing them on a miss
    Fetch(FetchArgs),
    /// List the partitions the snapshot knows about
    Partitions(PartitionsArgs),
    /// List persisted metric records
    Records(RecordsArgs),
}

/// Report a failed command and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}

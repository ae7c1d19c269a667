//! `partitions`: list known partitions.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::bootstrap;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, PartitionId};

#[derive(Args, Debug)]
pub struct PartitionsArgs {
    /// Ledger snapshot file (YAML or JSON)
    #[arg(short, long)]
    pub snapshot: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PartitionsOutput {
    pub partitions: Vec<PartitionId>,
}

impl CommandOutput for PartitionsOutput {
    fn to_human(&self) -> String {
        if self.partitions.is_empty() {
            return "No partitions found.".to_string();
        }
        let ids: Vec<String> = self.partitions.iter().map(ToString::to_string).collect();
        format!("{} partition(s): {}", ids.len(), ids.join(", "))
    }
}

pub async fn execute(args: PartitionsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let service = bootstrap::metric_service(config, &args.snapshot).await?;
    let mut partitions = service.partitions().await?;
    partitions.sort_unstable();

    output(&PartitionsOutput { partitions }, json_mode);
    Ok(())
}

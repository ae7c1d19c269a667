//! `records`: list persisted metric records.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::adapters::sqlite::SqliteMetricRepository;
use crate::cli::bootstrap;
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::{Config, PartitionId, PersistedRecord};
use crate::domain::ports::MetricRepository;

#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Only show records for this partition
    #[arg(short, long)]
    pub partition: Option<PartitionId>,

    /// Maximum number of records to show
    #[arg(short, long, default_value = "50")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct RecordsOutput {
    pub total: u64,
    pub records: Vec<PersistedRecord>,
}

impl CommandOutput for RecordsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "partition", "secondary key", "value", "created"]);
        for record in &self.records {
            table.add_row(vec![
                record.id.to_string(),
                record.partition_id.to_string(),
                record.secondary_key.clone(),
                record.value.to_string(),
                record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        format!(
            "{}\n\n{} record(s) stored in total",
            render_list("record", &table, self.records.len()),
            self.total
        )
    }
}

pub async fn execute(args: RecordsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let repository = SqliteMetricRepository::new(bootstrap::open_database(config).await?);

    let records = repository.list_records(args.partition, args.limit).await?;
    let total = repository.count().await?;

    output(&RecordsOutput { total, records }, json_mode);
    Ok(())
}

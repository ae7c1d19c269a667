//! `fetch`: run the cached read path against a ledger snapshot.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::adapters::sqlite::SqliteMetricRepository;
use crate::cli::bootstrap;
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::{AggregationRequest, Config, PartitionId, ResultRecord};
use crate::services::{AsyncPersister, PersistenceReport};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Ledger snapshot file (YAML or JSON)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Partitions to query (comma-separated); all when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub partition: Vec<PartitionId>,

    /// Only keep records for this secondary key
    #[arg(short = 'k', long)]
    pub secondary: Option<String>,

    /// Skip writing freshly computed records to the database
    #[arg(long)]
    pub no_persist: bool,
}

#[derive(Debug, Serialize)]
pub struct FetchOutput {
    pub key: String,
    pub cached: bool,
    pub records: Vec<ResultRecord>,
    pub persistence: Option<PersistenceSummary>,
}

#[derive(Debug, Serialize)]
pub struct PersistenceSummary {
    pub batch_id: String,
    pub written: usize,
    pub failed: usize,
}

impl From<PersistenceReport> for PersistenceSummary {
    fn from(report: PersistenceReport) -> Self {
        Self {
            batch_id: report.batch_id.to_string(),
            written: report.written,
            failed: report.failed,
        }
    }
}

impl CommandOutput for FetchOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["partition", "secondary key", "value"]);
        for record in &self.records {
            table.add_row(vec![
                record.partition_id.to_string(),
                record.secondary_key.clone(),
                record.value.to_string(),
            ]);
        }

        let mut lines = vec![render_list("record", &table, self.records.len())];
        lines.push(format!(
            "\n{} ({})",
            if self.cached { "Served from cache" } else { "Computed" },
            self.key
        ));
        if let Some(ref persisted) = self.persistence {
            lines.push(format!(
                "Persisted {} record(s), {} failed (batch {})",
                persisted.written, persisted.failed, persisted.batch_id
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: FetchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut service = bootstrap::metric_service(config, &args.snapshot).await?;

    let mut reports = None;
    if !args.no_persist {
        let pool = bootstrap::open_database(config).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let persister =
            AsyncPersister::new(Arc::new(SqliteMetricRepository::new(pool))).with_report_channel(tx);
        service = service.with_persister(persister);
        reports = Some(rx);
    }

    let mut request = AggregationRequest::partitions(args.partition);
    if let Some(secondary) = args.secondary {
        request = request.with_secondary(secondary);
    }

    let key = service.key_for(&request);
    let fetched = service.fetch_request(&request).await?;
    // Release the service's report sender so the channel closes once the
    // background batch finishes.
    drop(service);

    let persistence = match reports {
        Some(mut rx) if !fetched.cached => rx.recv().await.map(PersistenceSummary::from),
        _ => None,
    };

    let mut records = fetched.value;
    records.sort();

    output(
        &FetchOutput {
            key,
            cached: fetched.cached,
            records,
            persistence,
        },
        json_mode,
    );
    Ok(())
}

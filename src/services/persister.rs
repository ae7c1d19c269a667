//! Fire-and-forget persistence of freshly computed records.
//!
//! Writes happen on a spawned task so the read path never waits on the
//! database. Each record is inserted independently: one failed insert is
//! logged and counted, and the rest of the batch still lands. Completion is
//! observable through the returned handle or an optional report channel.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::memoizing_fetcher::MissHook;
use crate::domain::errors::{MetricError, MetricResult};
use crate::domain::models::ResultRecord;
use crate::domain::ports::MetricRepository;

/// Outcome of one persistence batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceReport {
    pub batch_id: Uuid,
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
}

impl PersistenceReport {
    pub const fn is_complete(&self) -> bool {
        self.failed == 0 && self.written == self.attempted
    }
}

/// Handle to a scheduled batch.
///
/// Dropping it detaches the task; the batch still runs to completion.
#[derive(Debug)]
pub struct PersistenceHandle {
    pub batch_id: Uuid,
    handle: JoinHandle<PersistenceReport>,
}

impl PersistenceHandle {
    /// Wait for the batch to finish.
    pub async fn wait(self) -> MetricResult<PersistenceReport> {
        self.handle
            .await
            .map_err(|e| MetricError::TaskFailed(format!("persistence batch {}: {e}", self.batch_id)))
    }
}

/// Schedules background writes of result records.
#[derive(Clone)]
pub struct AsyncPersister {
    repository: Arc<dyn MetricRepository>,
    reports: Option<mpsc::UnboundedSender<PersistenceReport>>,
}

impl AsyncPersister {
    pub fn new(repository: Arc<dyn MetricRepository>) -> Self {
        Self {
            repository,
            reports: None,
        }
    }

    /// Publish a [`PersistenceReport`] for every finished batch.
    #[must_use]
    pub fn with_report_channel(mut self, reports: mpsc::UnboundedSender<PersistenceReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Spawn a task that writes `records` and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, records: Vec<ResultRecord>) -> PersistenceHandle {
        let batch_id = Uuid::new_v4();
        let repository = Arc::clone(&self.repository);
        let reports = self.reports.clone();

        tracing::debug!(%batch_id, records = records.len(), "scheduling persistence batch");

        let handle = tokio::spawn(async move {
            let report = persist_batch(repository.as_ref(), batch_id, &records).await;
            if let Some(reports) = reports {
                // Receiver gone means nobody is listening; the batch is still done.
                let _ = reports.send(report);
            }
            report
        });

        PersistenceHandle { batch_id, handle }
    }
}

impl MissHook<Vec<ResultRecord>> for AsyncPersister {
    fn on_miss(&self, key: &str, value: &Vec<ResultRecord>) {
        let handle = self.schedule(value.clone());
        tracing::debug!(%key, batch_id = %handle.batch_id, "persistence scheduled for fresh result");
    }
}

async fn persist_batch(
    repository: &dyn MetricRepository,
    batch_id: Uuid,
    records: &[ResultRecord],
) -> PersistenceReport {
    let mut written = 0;
    let mut failed = 0;

    for record in records {
        match repository.create_record(record).await {
            Ok(_) => written += 1,
            Err(err) => {
                failed += 1;
                let err = MetricError::PersistenceFailed {
                    partition: record.partition_id,
                    secondary_key: record.secondary_key.clone(),
                    message: err.to_string(),
                };
                tracing::warn!(%batch_id, error = %err, "record not persisted");
            }
        }
    }

    if failed > 0 {
        tracing::warn!(%batch_id, written, failed, "persistence batch finished with failures");
    } else {
        tracing::info!(%batch_id, written, "persistence batch finished");
    }

    PersistenceReport {
        batch_id,
        attempted: records.len(),
        written,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PartitionId, PersistedRecord};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Repository that rejects one secondary key and stores everything else.
    #[derive(Default)]
    struct FlakyRepository {
        reject: Option<String>,
        stored: Mutex<Vec<ResultRecord>>,
    }

    #[async_trait]
    impl MetricRepository for FlakyRepository {
        async fn create_record(&self, record: &ResultRecord) -> MetricResult<PersistedRecord> {
            if self.reject.as_deref() == Some(record.secondary_key.as_str()) {
                return Err(MetricError::DatabaseError("constraint violated".to_string()));
            }
            let mut stored = self.stored.lock().unwrap();
            stored.push(record.clone());
            let now = Utc::now();
            Ok(PersistedRecord {
                id: stored.len() as i64,
                partition_id: record.partition_id,
                secondary_key: record.secondary_key.clone(),
                value: record.value,
                created_at: now,
                updated_at: now,
            })
        }

        async fn list_records(
            &self,
            _partition: Option<PartitionId>,
            _limit: u32,
        ) -> MetricResult<Vec<PersistedRecord>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> MetricResult<u64> {
            Ok(self.stored.lock().unwrap().len() as u64)
        }
    }

    fn records() -> Vec<ResultRecord> {
        vec![
            ResultRecord::new(1, "A", 1),
            ResultRecord::new(1, "B", 2),
            ResultRecord::new(2, "C", 3),
        ]
    }

    #[tokio::test]
    async fn test_all_records_written() {
        let repo = Arc::new(FlakyRepository::default());
        let persister = AsyncPersister::new(repo.clone());

        let report = persister.schedule(records()).wait().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.written, 3);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let repo = Arc::new(FlakyRepository {
            reject: Some("B".to_string()),
            ..Default::default()
        });
        let persister = AsyncPersister::new(repo.clone());

        let report = persister.schedule(records()).wait().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.is_complete());
        let keys: Vec<String> = repo
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.secondary_key.clone())
            .collect();
        assert_eq!(keys, vec!["A".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn test_report_channel_receives_batch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let persister =
            AsyncPersister::new(Arc::new(FlakyRepository::default())).with_report_channel(tx);

        let handle = persister.schedule(records());
        let batch_id = handle.batch_id;

        let report = rx.recv().await.unwrap();
        assert_eq!(report.batch_id, batch_id);
        assert_eq!(report.written, 3);
    }

    #[tokio::test]
    async fn test_empty_batch_reports_nothing_written() {
        let persister = AsyncPersister::new(Arc::new(FlakyRepository::default()));
        let report = persister.schedule(Vec::new()).wait().await.unwrap();
        assert_eq!(report.attempted, 0);
        assert!(report.is_complete());
    }
}

//! SQLite implementation of the MetricRepository port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::parse_datetime;
use crate::domain::errors::{MetricError, MetricResult};
use crate::domain::models::{PartitionId, PersistedRecord, ResultRecord};
use crate::domain::ports::MetricRepository;

#[derive(Clone)]
pub struct SqliteMetricRepository {
    pool: SqlitePool,
}

impl SqliteMetricRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricRepository for SqliteMetricRepository {
    async fn create_record(&self, record: &ResultRecord) -> MetricResult<PersistedRecord> {
        let now = Utc::now();
        let timestamp = now.to_rfc3339();

        let result = sqlx::query(
            r#"INSERT INTO partition_metrics (partition_id, secondary_key, value, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(i64::from(record.partition_id))
        .bind(&record.secondary_key)
        .bind(record.value)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        Ok(PersistedRecord {
            id: result.last_insert_rowid(),
            partition_id: record.partition_id,
            secondary_key: record.secondary_key.clone(),
            value: record.value,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_records(
        &self,
        partition: Option<PartitionId>,
        limit: u32,
    ) -> MetricResult<Vec<PersistedRecord>> {
        let rows: Vec<MetricRow> = match partition {
            Some(partition) => {
                sqlx::query_as(
                    r#"SELECT id, partition_id, secondary_key, value, created_at, updated_at
                       FROM partition_metrics WHERE partition_id = ?
                       ORDER BY id DESC LIMIT ?"#,
                )
                .bind(i64::from(partition))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"SELECT id, partition_id, secondary_key, value, created_at, updated_at
                       FROM partition_metrics ORDER BY id DESC LIMIT ?"#,
                )
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(PersistedRecord::try_from).collect()
    }

    async fn count(&self) -> MetricResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM partition_metrics")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|e| MetricError::DatabaseError(e.to_string()))
    }
}

#[derive(sqlx::FromRow)]
struct MetricRow {
    id: i64,
    partition_id: i64,
    secondary_key: String,
    value: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MetricRow> for PersistedRecord {
    type Error = MetricError;

    fn try_from(row: MetricRow) -> Result<Self, Self::Error> {
        let partition_id = PartitionId::try_from(row.partition_id)
            .map_err(|e| MetricError::SerializationError(format!("partition_id {}: {e}", row.partition_id)))?;

        Ok(Self {
            id: row.id,
            partition_id,
            secondary_key: row.secondary_key,
            value: row.value,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn repository() -> SqliteMetricRepository {
        SqliteMetricRepository::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let repo = repository().await;

        let first = repo.create_record(&ResultRecord::new(1, "A", 10)).await.unwrap();
        let second = repo.create_record(&ResultRecord::new(1, "A", 10)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_partition_newest_first() {
        let repo = repository().await;
        repo.create_record(&ResultRecord::new(1, "A", 10)).await.unwrap();
        repo.create_record(&ResultRecord::new(2, "B", 20)).await.unwrap();
        repo.create_record(&ResultRecord::new(1, "C", 30)).await.unwrap();

        let records = repo.list_records(Some(1), 10).await.unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.secondary_key.as_str()).collect();
        assert_eq!(keys, vec!["C", "A"]);

        let limited = repo.list_records(None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].secondary_key, "C");
    }

    #[tokio::test]
    async fn test_round_trips_negative_values() {
        let repo = repository().await;
        repo.create_record(&ResultRecord::new(4, "hk", -7)).await.unwrap();

        let records = repo.list_records(Some(4), 1).await.unwrap();
        assert_eq!(records[0].value, -7);
        assert_eq!(records[0].partition_id, 4);
    }
}

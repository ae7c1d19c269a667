//! Partition source backed by a ledger snapshot file.
//!
//! The file is YAML (JSON is accepted as a subset):
//!
//! ```yaml
//! partitions:
//!   1:
//!     - secondary_key: 5FFA
//!       value: 120
//!   2: []
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::errors::SourceError;
use crate::domain::models::{PartitionEntry, PartitionId};
use crate::domain::ports::PartitionSource;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    partitions: BTreeMap<String, Vec<PartitionEntry>>,
}

/// Immutable, fully loaded snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPartitionSource {
    partitions: BTreeMap<PartitionId, Vec<PartitionEntry>>,
}

impl SnapshotPartitionSource {
    pub fn new(partitions: BTreeMap<PartitionId, Vec<PartitionEntry>>) -> Self {
        Self { partitions }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Unreachable(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, SourceError> {
        let file: SnapshotFile =
            serde_yaml::from_str(contents).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let partitions = file
            .partitions
            .into_iter()
            .map(|(id, entries)| {
                id.trim()
                    .parse::<PartitionId>()
                    .map(|id| (id, entries))
                    .map_err(|_| SourceError::Malformed(format!("invalid partition id `{id}`")))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { partitions })
    }
}

#[async_trait]
impl PartitionSource for SnapshotPartitionSource {
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, SourceError> {
        Ok(self.partitions.keys().copied().collect())
    }

    async fn query_partition(
        &self,
        partition: PartitionId,
        secondary: Option<&str>,
    ) -> Result<Vec<PartitionEntry>, SourceError> {
        let entries = self
            .partitions
            .get(&partition)
            .ok_or(SourceError::UnknownPartition(partition))?;

        Ok(entries
            .iter()
            .filter(|entry| secondary.map_or(true, |key| entry.secondary_key == key))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"
partitions:
  1:
    - secondary_key: A
      value: 10
    - secondary_key: B
      value: 11
  "2":
    - secondary_key: A
      value: 20
  3: []
"#;

    #[tokio::test]
    async fn test_loads_yaml_snapshot() {
        let source = SnapshotPartitionSource::from_yaml(SNAPSHOT).unwrap();

        assert_eq!(source.list_partitions().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(source.query_partition(1, None).await.unwrap().len(), 2);
        assert_eq!(
            source.query_partition(1, Some("B")).await.unwrap(),
            vec![PartitionEntry::new("B", 11)]
        );
        assert!(source.query_partition(3, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_partition_is_error() {
        let source = SnapshotPartitionSource::from_yaml(SNAPSHOT).unwrap();
        assert!(matches!(
            source.query_partition(9, None).await,
            Err(SourceError::UnknownPartition(9))
        ));
    }

    #[tokio::test]
    async fn test_loads_json_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"partitions": {{"7": [{{"secondary_key": "X", "value": -1}}]}}}}"#
        )
        .unwrap();

        let source = SnapshotPartitionSource::from_path(file.path()).await.unwrap();
        assert_eq!(source.partitions[&7], vec![PartitionEntry::new("X", -1)]);
    }

    #[test]
    fn test_rejects_bad_partition_id() {
        let err = SnapshotPartitionSource::from_yaml("partitions:\n  abc: []\n").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let err = SnapshotPartitionSource::from_path("/nonexistent/snapshot.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(_)));
    }
}

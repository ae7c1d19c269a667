pub mod config;
pub mod metric;
pub mod shape;

pub use config::{
    AggregatorSettings, CacheBackendKind, CacheConfig, Config, DatabaseConfig, LoggingConfig,
    MAX_TTL_SECS,
};
pub use metric::{
    AggregationRequest, PartitionEntry, PartitionId, PersistedRecord, ResultRecord,
};
pub use shape::{FieldShape, RecordShape, Shape, Shaped};

//! Typed cache over a byte-level backend.
//!
//! Values are written as JSON, whatever their Rust type: a single record
//! becomes an object, a sequence of records an array, a keyed mapping an
//! object of objects. On read the payload is walked against a caller-supplied
//! [`Shape`] and rebuilt into that shape before being handed to serde, so one
//! cache serves every call site without a cache type per result shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::CacheError;
use crate::domain::models::{RecordShape, Shape, Shaped, MAX_TTL_SECS};
use crate::domain::ports::CacheBackend;

/// Shortest TTL any entry may have.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Longest TTL any entry may have.
pub const MAX_TTL: Duration = Duration::from_secs(MAX_TTL_SECS);

/// Shape-aware cache used by every fetcher in the process.
pub struct TypedCache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl TypedCache {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl: default_ttl.clamp(MIN_TTL, MAX_TTL),
        }
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Read `key` using the shape `T` describes for itself.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: Shaped + DeserializeOwned,
    {
        self.get_with_shape(key, &T::shape()).await
    }

    /// Read `key` and rebuild it through an explicit shape.
    ///
    /// Backend failures are returned as [`CacheError::BackendUnavailable`],
    /// never folded into `Ok(None)`.
    pub async fn get_with_shape<T>(&self, key: &str, shape: &Shape) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.backend.get(key).await? {
            Some(bytes) => decode(&bytes, shape).map(Some),
            None => Ok(None),
        }
    }

    /// Store `value` under `key` for `ttl`, or the default TTL when `None`.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = encode(value)?;
        let ttl = ttl.unwrap_or(self.default_ttl).clamp(MIN_TTL, MAX_TTL);
        tracing::trace!(key, bytes = bytes.len(), ttl_secs = ttl.as_secs(), "cache set");
        self.backend.set(key, bytes, ttl).await
    }
}

/// Serialize any value into the cache's JSON payload.
pub fn encode<T>(value: &T) -> Result<Vec<u8>, CacheError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value).map_err(|e| CacheError::Encoding(e.to_string()))
}

/// Parse a payload and rebuild it into `shape` before deserializing.
pub fn decode<T>(bytes: &[u8], shape: &Shape) -> Result<T, CacheError>
where
    T: DeserializeOwned,
{
    let raw: Value = serde_json::from_slice(bytes).map_err(|e| CacheError::SerializationMismatch {
        path: ROOT.to_string(),
        expected: shape.to_string(),
        found: format!("undecodable payload ({e})"),
    })?;
    let rebuilt = reconstruct(shape, raw, ROOT)?;
    serde_json::from_value(rebuilt).map_err(|e| CacheError::SerializationMismatch {
        path: ROOT.to_string(),
        expected: shape.to_string(),
        found: e.to_string(),
    })
}

const ROOT: &str = "$";

/// Walk `value` against `shape`, returning it in the shape's canonical form.
///
/// Records stored positionally (as arrays) are rebuilt into field-named
/// objects; fields absent from the payload are accepted only for optional
/// field shapes; unknown fields are dropped.
fn reconstruct(shape: &Shape, value: Value, path: &str) -> Result<Value, CacheError> {
    match (shape, value) {
        (Shape::Any, value) => Ok(value),
        (Shape::Optional(_), Value::Null) => Ok(Value::Null),
        (Shape::Optional(inner), value) => reconstruct(inner, value, path),
        (Shape::Bool, value @ Value::Bool(_)) | (Shape::Str, value @ Value::String(_)) => Ok(value),
        (Shape::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
        (Shape::Float, Value::Number(n)) => Ok(Value::Number(n)),
        (Shape::Sequence(inner), Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| reconstruct(inner, item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Shape::Mapping(inner), Value::Object(entries)) => entries
            .into_iter()
            .map(|(k, v)| {
                let child = format!("{path}.{k}");
                reconstruct(inner, v, &child).map(|v| (k, v))
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        (Shape::Record(record), Value::Object(fields)) => rebuild_named(record, fields, path),
        (Shape::Record(record), Value::Array(items)) if items.len() == record.fields.len() => {
            rebuild_positional(record, items, path)
        }
        (shape, value) => Err(mismatch(path, shape, describe(&value))),
    }
}

fn rebuild_named(
    record: &RecordShape,
    mut fields: Map<String, Value>,
    path: &str,
) -> Result<Value, CacheError> {
    let mut rebuilt = Map::with_capacity(record.fields.len());
    for field in &record.fields {
        let child = format!("{path}.{}", field.name);
        let value = match fields.remove(&field.name) {
            Some(value) => reconstruct(&field.shape, value, &child)?,
            None if matches!(field.shape, Shape::Optional(_) | Shape::Any) => Value::Null,
            None => return Err(mismatch(&child, &field.shape, "missing field".to_string())),
        };
        rebuilt.insert(field.name.clone(), value);
    }
    Ok(Value::Object(rebuilt))
}

fn rebuild_positional(
    record: &RecordShape,
    items: Vec<Value>,
    path: &str,
) -> Result<Value, CacheError> {
    let mut rebuilt = Map::with_capacity(record.fields.len());
    for (field, value) in record.fields.iter().zip(items) {
        let child = format!("{path}.{}", field.name);
        rebuilt.insert(field.name.clone(), reconstruct(&field.shape, value, &child)?);
    }
    Ok(Value::Object(rebuilt))
}

fn mismatch(path: &str, expected: &Shape, found: String) -> CacheError {
    CacheError::SerializationMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(n) if n.is_f64() => "float".to_string(),
        Value::Number(_) => "integer".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("sequence of {} element(s)", items.len()),
        Value::Object(_) => "mapping".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MemoryCacheBackend;
    use crate::domain::models::ResultRecord;
    use serde_json::json;
    use std::collections::HashMap;

    fn cache() -> TypedCache {
        TypedCache::new(Arc::new(MemoryCacheBackend::new()), Duration::from_secs(120))
    }

    #[tokio::test]
    async fn test_sequence_of_records_round_trips() {
        let cache = cache();
        let records = vec![ResultRecord::new(1, "A", 10), ResultRecord::new(2, "B", 20)];

        cache.set("k", &records, None).await.unwrap();
        let loaded: Option<Vec<ResultRecord>> = cache.get("k").await.unwrap();

        assert_eq!(loaded, Some(records));
    }

    #[tokio::test]
    async fn test_mapping_of_records_round_trips() {
        let cache = cache();
        let mut by_key = HashMap::new();
        by_key.insert("A".to_string(), ResultRecord::new(1, "A", 10));
        by_key.insert("B".to_string(), ResultRecord::new(2, "B", 20));

        cache.set("k", &by_key, None).await.unwrap();
        let loaded: Option<HashMap<String, ResultRecord>> = cache.get("k").await.unwrap();

        assert_eq!(loaded, Some(by_key));
    }

    #[tokio::test]
    async fn test_single_record_round_trips() {
        let cache = cache();
        let record = ResultRecord::new(7, "hk", -3);

        cache.set("k", &record, Some(Duration::from_secs(5))).await.unwrap();
        let loaded: Option<ResultRecord> = cache.get("k").await.unwrap();

        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let loaded: Option<Vec<ResultRecord>> = cache().get("absent").await.unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_positional_record_is_rebuilt_by_field_order() {
        let payload = serde_json::to_vec(&json!([[1, "A", 10], [2, "B", 20]])).unwrap();
        let records: Vec<ResultRecord> =
            decode(&payload, &<Vec<ResultRecord>>::shape()).unwrap();
        assert_eq!(
            records,
            vec![ResultRecord::new(1, "A", 10), ResultRecord::new(2, "B", 20)]
        );
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let payload = serde_json::to_vec(&json!({
            "partition_id": 1,
            "secondary_key": "A",
            "value": 10,
            "cached": true
        }))
        .unwrap();
        let record: ResultRecord = decode(&payload, &ResultRecord::shape()).unwrap();
        assert_eq!(record, ResultRecord::new(1, "A", 10));
    }

    #[test]
    fn test_mismatch_reports_path() {
        let payload = serde_json::to_vec(&json!([
            {"partition_id": 1, "secondary_key": "A", "value": 10},
            {"partition_id": 2, "secondary_key": "B", "value": "twenty"}
        ]))
        .unwrap();
        let err = decode::<Vec<ResultRecord>>(&payload, &<Vec<ResultRecord>>::shape()).unwrap_err();
        match err {
            CacheError::SerializationMismatch {
                path,
                expected,
                found,
            } => {
                assert_eq!(path, "$[1].value");
                assert_eq!(expected, "integer");
                assert_eq!(found, "string");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_field_is_mismatch() {
        let payload = serde_json::to_vec(&json!({"partition_id": 1, "value": 10})).unwrap();
        let err = decode::<ResultRecord>(&payload, &ResultRecord::shape()).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationMismatch { ref path, ref found, .. }
                if path == "$.secondary_key" && found == "missing field"
        ));
    }

    #[test]
    fn test_container_mismatch() {
        let payload = serde_json::to_vec(&json!({"A": 1})).unwrap();
        let err = decode::<Vec<i64>>(&payload, &<Vec<i64>>::shape()).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationMismatch { ref expected, ref found, .. }
                if expected == "sequence of integer" && found == "mapping"
        ));
    }

    #[test]
    fn test_shape_read_need_not_match_write_type() {
        // Written as a mapping of sequences, read back through the generic `Any` leaf.
        let mut grouped: HashMap<String, Vec<u32>> = HashMap::new();
        grouped.insert("even".to_string(), vec![2, 4]);
        let payload = encode(&grouped).unwrap();

        let loose: HashMap<String, Value> =
            decode(&payload, &Shape::mapping_of(Shape::Any)).unwrap();
        assert_eq!(loose["even"], json!([2, 4]));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_clamped() {
        let cache = TypedCache::new(Arc::new(MemoryCacheBackend::new()), Duration::ZERO);
        assert_eq!(cache.default_ttl(), MIN_TTL);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped() {
        let cache = TypedCache::new(Arc::new(MemoryCacheBackend::new()), Duration::MAX);
        assert_eq!(cache.default_ttl(), MAX_TTL);

        cache.set("k", &vec![1u32], None).await.unwrap();
        cache.set("j", &vec![2u32], Some(Duration::MAX)).await.unwrap();
        let loaded: Option<Vec<u32>> = cache.get("k").await.unwrap();
        assert_eq!(loaded, Some(vec![1]));
    }
}

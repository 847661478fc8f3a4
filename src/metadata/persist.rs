use crate::metadata::error::CurationError;
use crate::metadata::model::{MetadataRecord, GEOMETRY_COLUMN};
use crate::storage::keys::metadata_key;
use crate::storage::BlobStore;
use bytes::Bytes;
use log::{error, info};
use serde::Serialize;

/// 序列化为持久化格式：UTF-8、4 空格缩进、保留非 ASCII 字符。
/// 几何列只追加在副本上，调用方的记录不变。
pub fn to_persisted_json(record: &MetadataRecord) -> Result<Vec<u8>, serde_json::Error> {
    let mut copy = record.clone();
    if !copy.data_columns.iter().any(|c| c == GEOMETRY_COLUMN) {
        copy.data_columns.push(GEOMETRY_COLUMN.to_string());
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    copy.serialize(&mut ser)?;
    Ok(buf)
}

/// 写入 `metadata/<id>_metadata.json`，覆盖已有对象，返回写入的 key
pub async fn persist(
    store: &dyn BlobStore,
    record: &MetadataRecord,
    dataset_id: &str,
) -> Result<String, CurationError> {
    let key = metadata_key(dataset_id);
    let body = to_persisted_json(record)
        .map_err(|e| CurationError::PersistFailure(format!("serialize {}: {}", key, e)))?;
    let size = body.len();
    if let Err(e) = store.put(&key, Bytes::from(body)).await {
        error!("写入元数据失败 {}: {}", key, e);
        return Err(CurationError::PersistFailure(format!("{}: {}", key, e)));
    }
    info!("元数据已保存: {} ({} bytes)", key, size);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::model::ColumnDetail;
    use crate::metadata::reconcile::reconcile;
    use crate::metadata::schema::normalize;
    use crate::storage::{ByteStream, ObjectBlobStore, StoreError};
    use async_trait::async_trait;

    /// put 永远失败的存储
    struct ReadOnlyStore(ObjectBlobStore);

    #[async_trait]
    impl BlobStore for ReadOnlyStore {
        async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            self.0.list(prefix).await
        }
        async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
            self.0.get(key).await
        }
        async fn get_stream(&self, key: &str) -> Result<ByteStream, StoreError> {
            self.0.get_stream(key).await
        }
        async fn put(&self, key: &str, _body: Bytes) -> Result<(), StoreError> {
            Err(StoreError::InvalidLocation(format!("read only: {}", key)))
        }
    }

    fn sample_record() -> MetadataRecord {
        MetadataRecord {
            name: "Résidus agricoles".into(),
            obj_details_column: "id".into(),
            value_columns: vec!["pop".into()],
            data_columns: vec!["pop".into(), "area".into()],
            columns: vec![
                ColumnDetail::synthesize("pop"),
                ColumnDetail::synthesize("area"),
            ],
            layer_access_level: 1,
            ..Default::default()
        }
    }

    #[test]
    fn serialization_appends_geometry_on_copy() {
        let record = sample_record();
        let body = to_persisted_json(&record).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("{\n    \"name\": \"Résidus agricoles\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["data_columns"], serde_json::json!(["pop", "area", "geom"]));
        assert_eq!(record.data_columns, vec!["pop", "area"]);
    }

    #[test]
    fn geometry_is_not_appended_twice() {
        let mut record = sample_record();
        record.data_columns.push("geom".into());
        let value: serde_json::Value =
            serde_json::from_slice(&to_persisted_json(&record).unwrap()).unwrap();
        assert_eq!(value["data_columns"], serde_json::json!(["pop", "area", "geom"]));
    }

    #[tokio::test]
    async fn persist_writes_deterministic_key() {
        let store = ObjectBlobStore::in_memory();
        let key = persist(&store, &sample_record(), "county_pop").await.unwrap();
        assert_eq!(key, "metadata/county_pop_metadata.json");
        assert!(store.get(&key).await.is_ok());

        // 覆盖写
        let mut second = sample_record();
        second.name = "v2".into();
        persist(&store, &second, "county_pop").await.unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&store.get(&key).await.unwrap()).unwrap();
        assert_eq!(value["name"], "v2");
    }

    #[tokio::test]
    async fn write_failure_is_surfaced() {
        let store = ReadOnlyStore(ObjectBlobStore::in_memory());
        let record = sample_record();
        let before = record.clone();
        let err = persist(&store, &record, "county_pop").await.unwrap_err();
        assert!(matches!(err, CurationError::PersistFailure(_)));
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn round_trip_reproduces_record() {
        let store = ObjectBlobStore::in_memory();
        let discovered: Vec<String> = vec!["pop".into(), "area".into(), "geometry".into()];
        let original = reconcile(sample_record(), &discovered).record;
        persist(&store, &original, "county_pop").await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(
            &store.get("metadata/county_pop_metadata.json").await.unwrap(),
        )
        .unwrap();
        let reloaded = reconcile(normalize(&raw), &discovered);
        assert!(reloaded.dropped.is_empty());

        let mut expected = original.clone();
        expected.updated_at = reloaded.record.updated_at.clone();
        assert_eq!(reloaded.record, expected);
    }
}

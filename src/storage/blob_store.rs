use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use log::info;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::prefix::PrefixStore;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use url::Url;

pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object store error: {0}")]
    ObjectStore(object_store::Error),
    #[error("invalid store location: {0}")]
    InvalidLocation(String),
}

impl From<object_store::Error> for StoreError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            other => StoreError::ObjectStore(other),
        }
    }
}

/// 对象存储的最小接口：一个扁平命名空间上的 list / get / put
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 列出前缀下的全部 key（字典序）
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;
    /// 以分块流的方式读取对象，调用方可以提前丢弃流
    async fn get_stream(&self, key: &str) -> Result<ByteStream, StoreError>;
    /// 覆盖写入
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError>;
}

/// 基于 `object_store` 的实现，支持 S3、本地目录和内存三种后端。
#[derive(Clone)]
pub struct ObjectBlobStore {
    url: String,
    inner: Arc<dyn ObjectStore>,
}

impl ObjectBlobStore {
    /// 根据位置字符串构建存储：
    /// - `s3://bucket/` 或 `s3://bucket/sub/dir/`（凭证来自 AWS_* 环境变量）
    /// - `memory://`
    /// - 本地目录路径（必须已存在）
    pub fn from_location(location: &str) -> Result<Self, StoreError> {
        let location = location.trim();
        if location.starts_with("memory://") {
            return Ok(Self::in_memory());
        }

        if location.starts_with("s3://") {
            let url = Url::parse(location)
                .map_err(|e| StoreError::InvalidLocation(format!("{}: {}", location, e)))?;
            let bucket = url
                .host_str()
                .filter(|b| !b.is_empty())
                .ok_or_else(|| StoreError::InvalidLocation(location.to_string()))?;
            let s3 = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()?;
            let prefix = url.path().trim_matches('/').to_string();
            let inner: Arc<dyn ObjectStore> = if prefix.is_empty() {
                Arc::new(s3)
            } else {
                Arc::new(PrefixStore::new(s3, prefix.as_str()))
            };
            info!("对象存储: S3 bucket={} prefix={:?}", bucket, prefix);
            return Ok(Self {
                url: location.to_string(),
                inner,
            });
        }

        let path = std::fs::canonicalize(location)
            .map_err(|e| StoreError::InvalidLocation(format!("{}: {}", location, e)))?;
        let fs = LocalFileSystem::new_with_prefix(&path)?;
        info!("对象存储: 本地目录 {}", path.display());
        Ok(Self {
            url: format!("file://{}", path.display()),
            inner: Arc::new(fs),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            url: "memory://".to_string(),
            inner: Arc::new(InMemory::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = Path::from(prefix);
        let mut keys: Vec<String> = self
            .inner
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let result = self.inner.get(&Path::from(key)).await?;
        Ok(result.bytes().await?)
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, StoreError> {
        let result = self.inner.get(&Path::from(key)).await?;
        Ok(result.into_stream().map_err(StoreError::from).boxed())
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.inner
            .put(&Path::from(key), PutPayload::from(body))
            .await?;
        Ok(())
    }
}

impl std::fmt::Display for ObjectBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ObjectBlobStore [{}]>", self.url)
    }
}

impl std::fmt::Debug for ObjectBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ObjectBlobStore [{}]>", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_and_list_sorted() {
        let store = ObjectBlobStore::in_memory();
        store
            .put("metadata/b_metadata.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        store
            .put("metadata/a_metadata.json", Bytes::from_static(b"[]"))
            .await
            .unwrap();
        store
            .put("datasets/a.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let keys = store.list("metadata").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "metadata/a_metadata.json".to_string(),
                "metadata/b_metadata.json".to_string()
            ]
        );
        let body = store.get("metadata/a_metadata.json").await.unwrap();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = ObjectBlobStore::in_memory();
        let err = store.get("datasets/nope.json").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.get_stream("datasets/nope.json").await.is_err());
    }

    #[tokio::test]
    async fn stream_yields_full_body() {
        let store = ObjectBlobStore::in_memory();
        store
            .put("datasets/x.json", Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        let chunks: Vec<Bytes> = store
            .get_stream("datasets/x.json")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, b"hello world");
    }

    #[test]
    fn memory_location_is_accepted() {
        let store = ObjectBlobStore::from_location("memory://").unwrap();
        assert_eq!(store.url(), "memory://");
        assert!(ObjectBlobStore::from_location("/definitely/not/here/xyz").is_err());
    }
}

use crate::{error::ConnectorError, storage::error::StorageError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use object_store::{
    ObjectStore, PutPayload, WriteMultipart, aws::AmazonS3Builder, path::Path,
};
use std::sync::Arc;
use tracing::debug;

/// Objects at or below this size are uploaded with a single PUT.
const SINGLE_PUT_LIMIT: u64 = 8 * 1024 * 1024;
/// Parts in flight per multipart upload.
const UPLOAD_CONCURRENCY: usize = 4;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Pass back to fetch the following page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// Streaming body of a stored object.
pub struct ObjectBody {
    pub size: u64,
    pub stream: BoxStream<'static, Result<Bytes, StorageError>>,
}

/// An object-storage bucket as seen by the asset mirror. Objects are compared by key only.
#[async_trait]
pub trait AssetBucket: Send + Sync {
    fn name(&self) -> &str;

    async fn list_page(&self, token: Option<&str>, page_size: usize) -> Result<ListPage, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    async fn open(&self, key: &str) -> Result<ObjectBody, StorageError>;

    /// Writes `body` under `key`, returning the number of bytes stored.
    ///
    /// Source and destination buckets live behind separate endpoints and credentials,
    /// so there is no server-side copy between them: bodies stream through this process,
    /// in parts once they exceed a single PUT.
    async fn upload(&self, key: &str, body: ObjectBody) -> Result<u64, StorageError>;
}

/// [`AssetBucket`] over any `object_store` backend.
#[derive(Clone)]
pub struct ObjectStoreBucket {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBucket {
    pub fn new(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// S3-compatible bucket (R2, MinIO, AWS) addressed with path-style requests.
    pub fn s3(
        endpoint: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: &str,
    ) -> Result<Self, ConnectorError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"))
            .with_region(region)
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key)
            .with_bucket_name(bucket)
            .with_virtual_hosted_style_request(false)
            .build()?;

        Ok(Self::new(bucket, Arc::new(store)))
    }
}

fn parse_key(key: &str) -> Result<Path, StorageError> {
    Path::parse(key).map_err(|err| StorageError::InvalidKey {
        key: key.to_string(),
        message: err.to_string(),
    })
}

#[async_trait]
impl AssetBucket for ObjectStoreBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_page(&self, token: Option<&str>, page_size: usize) -> Result<ListPage, StorageError> {
        let page_size = page_size.max(1);
        let listing = match token {
            Some(token) => self.store.list_with_offset(None, &parse_key(token)?),
            None => self.store.list(None),
        };

        let keys: Vec<String> = listing
            .take(page_size)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;

        // Listings are lexicographic, so the last key doubles as the continuation token.
        let next_token = if keys.len() == page_size {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.store.head(&parse_key(key)?).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn open(&self, key: &str) -> Result<ObjectBody, StorageError> {
        let result = self.store.get(&parse_key(key)?).await?;
        let size = result.meta.size as u64;
        let stream = result.into_stream().map_err(StorageError::from).boxed();
        Ok(ObjectBody { size, stream })
    }

    async fn upload(&self, key: &str, body: ObjectBody) -> Result<u64, StorageError> {
        let path = parse_key(key)?;
        let ObjectBody { size, mut stream } = body;

        if size <= SINGLE_PUT_LIMIT {
            let mut buf = BytesMut::with_capacity(size as usize);
            while let Some(chunk) = stream.try_next().await? {
                buf.extend_from_slice(&chunk);
            }
            let written = buf.len() as u64;
            self.store.put(&path, PutPayload::from(buf.freeze())).await?;
            return Ok(written);
        }

        debug!(key, size, "Uploading in parts");
        let mut writer = WriteMultipart::new(self.store.put_multipart(&path).await?);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = writer.abort().await;
                    return Err(err);
                }
            };
            if let Err(err) = writer.wait_for_capacity(UPLOAD_CONCURRENCY).await {
                let _ = writer.abort().await;
                return Err(err.into());
            }
            written += chunk.len() as u64;
            writer.write(&chunk);
        }

        writer.finish().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    async fn bucket_with(keys: &[&str]) -> ObjectStoreBucket {
        let store = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(&Path::from(*key), PutPayload::from(Bytes::from(key.to_string())))
                .await
                .unwrap();
        }
        ObjectStoreBucket::new("test", store)
    }

    #[tokio::test]
    async fn pages_through_every_key() {
        let bucket = bucket_with(&["a/1.png", "a/2.png", "b/3.png", "c/4.png", "d/5.png"]).await;

        let mut token: Option<String> = None;
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let page = bucket.list_page(token.as_deref(), 2).await.unwrap();
            pages += 1;
            seen.extend(page.keys);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec!["a/1.png", "a/2.png", "b/3.png", "c/4.png", "d/5.png"]);
    }

    #[tokio::test]
    async fn copies_object_between_buckets() {
        let source = bucket_with(&["docs/readme.txt"]).await;
        let destination = bucket_with(&[]).await;

        assert!(!destination.exists("docs/readme.txt").await.unwrap());
        let body = source.open("docs/readme.txt").await.unwrap();
        let written = destination.upload("docs/readme.txt", body).await.unwrap();

        assert_eq!(written, "docs/readme.txt".len() as u64);
        assert!(destination.exists("docs/readme.txt").await.unwrap());
    }

    #[tokio::test]
    async fn large_objects_stream_in_parts() {
        let size = SINGLE_PUT_LIMIT as usize + 1024 * 1024;
        let chunks: Vec<Result<Bytes, StorageError>> = (0..size / 65536)
            .map(|i| Ok(Bytes::from(vec![(i % 251) as u8; 65536])))
            .collect();
        let body = ObjectBody {
            size: size as u64,
            stream: futures_util::stream::iter(chunks).boxed(),
        };

        let store = Arc::new(InMemory::new());
        let destination = ObjectStoreBucket::new("qa", store.clone());
        let written = destination.upload("video/big.mp4", body).await.unwrap();

        assert_eq!(written, size as u64);
        let stored = store.head(&Path::from("video/big.mp4")).await.unwrap();
        assert_eq!(stored.size as usize, size);
    }

    #[tokio::test]
    async fn open_missing_object_is_not_found() {
        let bucket = bucket_with(&[]).await;
        let err = bucket.open("nope").await.err().unwrap();
        assert!(err.is_not_found());
    }
}

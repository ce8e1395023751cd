use crate::{error::LoadError, load::EntityLoader};
use async_trait::async_trait;
use chrono::Utc;
use connectors::{
    document::{Document, adapter::MongoAdapter, convert::json_to_document},
    error::{ConnectorError, DbError},
    file::{error::FileError, json::read_json_file},
};
use engine_core::observer::Observer;
use model::{
    events::{Phase, ProgressEvent},
    records::{
        kind::SourceKind,
        results::{LoadOperation, LoadResult},
        stats::EntityStats,
    },
};
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

/// Loads transformed JSON arrays into the destination document store, replacing
/// documents by `_id`.
pub struct DocumentLoader {
    uri: String,
    batch_size: usize,
    adapter: RwLock<Option<MongoAdapter>>,
}

impl DocumentLoader {
    pub fn new(uri: impl Into<String>, batch_size: usize) -> Self {
        Self {
            uri: uri.into(),
            batch_size: batch_size.max(1),
            adapter: RwLock::new(None),
        }
    }

    async fn adapter(&self) -> Result<MongoAdapter, DbError> {
        self.adapter
            .read()
            .await
            .clone()
            .ok_or_else(|| DbError::NotConnected("document destination".to_string()))
    }
}

/// Parses `path` on the calling (blocking) thread and hands fixed-size batches to `tx`.
pub(crate) fn stream_documents(
    path: &Path,
    batch_size: usize,
    tx: mpsc::Sender<Vec<Document>>,
) -> Result<u64, LoadError> {
    let mut batch = Vec::with_capacity(batch_size);
    let read = read_json_file(path, |record| {
        let document =
            json_to_document(record).map_err(|err| FileError::Rejected(err.to_string()))?;
        batch.push(document);
        if batch.len() >= batch_size {
            tx.blocking_send(std::mem::take(&mut batch))
                .map_err(|_| FileError::Rejected("writer stopped".to_string()))?;
        }
        Ok(())
    })?;

    if !batch.is_empty() {
        tx.blocking_send(batch)
            .map_err(|_| LoadError::Task("writer stopped".to_string()))?;
    }
    Ok(read)
}

#[async_trait]
impl EntityLoader for DocumentLoader {
    fn kind(&self) -> SourceKind {
        SourceKind::Document
    }

    async fn connect(&self) -> Result<(), ConnectorError> {
        let adapter = MongoAdapter::connect(&self.uri, "document destination").await?;
        *self.adapter.write().await = Some(adapter);
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<String>, LoadError> {
        Ok(self.adapter().await?.list_collections().await?)
    }

    async fn load_file(
        &self,
        entity: &str,
        path: &Path,
        observer: &dyn Observer,
    ) -> Result<LoadResult, LoadError> {
        let adapter = self.adapter().await?;
        let (tx, mut rx) = mpsc::channel::<Vec<Document>>(2);
        let (input, batch_size): (PathBuf, usize) = (path.to_path_buf(), self.batch_size);
        let reader = tokio::task::spawn_blocking(move || stream_documents(&input, batch_size, tx));

        let mut written = 0u64;
        let mut write_error = None;
        while let Some(batch) = rx.recv().await {
            match adapter.upsert_documents(entity, batch).await {
                Ok(count) => {
                    written += count;
                    debug!(collection = entity, written, "Upserted batch");
                    observer.on_event(&ProgressEvent::EntityProgress {
                        phase: Phase::Load,
                        entity: entity.to_string(),
                        processed: written,
                    });
                }
                Err(err) => {
                    write_error = Some(err);
                    break;
                }
            }
        }
        // Closing the receiver unblocks a reader still waiting to send.
        drop(rx);

        let read = reader
            .await
            .map_err(|err| LoadError::Task(err.to_string()))?;
        if let Some(err) = write_error {
            return Err(err.into());
        }

        Ok(LoadResult {
            source: SourceKind::Document,
            entity: entity.to_string(),
            record_count: read?,
            operation: LoadOperation::Upsert,
            loaded_at: Utc::now(),
        })
    }

    async fn stats(&self, entity: &str) -> Result<EntityStats, LoadError> {
        Ok(self.adapter().await?.collection_stats(entity).await?)
    }

    async fn disconnect(&self) {
        if let Some(adapter) = self.adapter.write().await.take() {
            adapter.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batches_documents_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.transformed.json");
        let records: Vec<_> = (0..5).map(|i| json!({"_id": i, "n": i})).collect();
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let read = stream_documents(&path, 2, tx).unwrap();
        assert_eq!(read, 5);

        let mut sizes = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, [2, 2, 1]);
    }

    #[test]
    fn rejects_non_object_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.transformed.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let (tx, _rx) = mpsc::channel(8);
        assert!(matches!(
            stream_documents(&path, 10, tx),
            Err(LoadError::File(FileError::Rejected(_)))
        ));
    }

    #[tokio::test]
    async fn loading_requires_connection() {
        let loader = DocumentLoader::new("mongodb://localhost:27017/replica", 100);
        let err = loader
            .load_file("users", Path::new("missing.json"), &engine_core::observer::NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Db(DbError::NotConnected(_))));
    }
}

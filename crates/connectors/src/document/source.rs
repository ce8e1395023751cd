use crate::{
    document::{adapter::MongoAdapter, convert::document_to_json},
    error::{ConnectorError, DbError},
    file::{commit_part, discard_part, json::ArrayFraming, part_path},
    source::{SourceConnector, SourceError},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use model::records::kind::SourceKind;
use mongodb::bson::doc;
use std::path::Path;
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    sync::RwLock,
};
use tracing::debug;

/// Document source: every collection of the URI's default database, exported as a
/// JSON array. Collections are always extracted in full.
pub struct MongoSource {
    uri: String,
    batch_size: usize,
    adapter: RwLock<Option<MongoAdapter>>,
}

impl MongoSource {
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
            .ok_or_else(|| DbError::NotConnected("document source".to_string()))
    }

    async fn write_documents(
        &self,
        adapter: &MongoAdapter,
        entity: &str,
        part: &Path,
    ) -> Result<u64, SourceError> {
        let mut cursor = adapter
            .collection(entity)
            .find(doc! {})
            .batch_size(u32::try_from(self.batch_size).unwrap_or(u32::MAX))
            .await
            .map_err(DbError::from)?;

        let mut writer = BufWriter::new(tokio::fs::File::create(part).await?);
        let mut framing = ArrayFraming::new();
        let mut buf = Vec::new();
        let mut pending = 0;

        while let Some(document) = cursor.try_next().await.map_err(DbError::from)? {
            framing.push_record(&mut buf, &document_to_json(document))?;
            pending += 1;

            if pending >= self.batch_size {
                writer.write_all(&buf).await?;
                buf.clear();
                pending = 0;
                debug!(collection = entity, documents = framing.count(), "Wrote batch");
            }
        }

        writer.write_all(&buf).await?;
        writer.write_all(framing.closing()).await?;
        writer.flush().await?;

        Ok(framing.count())
    }
}

#[async_trait]
impl SourceConnector for MongoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Document
    }

    async fn connect(&self) -> Result<(), ConnectorError> {
        let adapter = MongoAdapter::connect(&self.uri, "source document store").await?;
        *self.adapter.write().await = Some(adapter);
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<String>, DbError> {
        self.adapter().await?.list_collections().await
    }

    async fn extract_entity(
        &self,
        entity: &str,
        _since: Option<DateTime<Utc>>,
        out: &Path,
    ) -> Result<u64, SourceError> {
        let adapter = self.adapter().await?;

        match self.write_documents(&adapter, entity, &part_path(out)).await {
            Ok(written) => {
                commit_part(out).await?;
                Ok(written)
            }
            Err(err) => {
                discard_part(out).await;
                Err(err)
            }
        }
    }

    async fn disconnect(&self) {
        if let Some(adapter) = self.adapter.write().await.take() {
            adapter.shutdown().await;
        }
    }
}

use crate::{
    error::{ConnectorError, DbError},
    file::error::FileError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::records::kind::SourceKind;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown collection or table: {0}")]
    UnknownEntity(String),
}

/// A production store that can enumerate its collections/tables and stream them to disk.
///
/// Implementations hold their connection internally so `connect` can be retried
/// through a shared reference.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn connect(&self) -> Result<(), ConnectorError>;

    async fn list_entities(&self) -> Result<Vec<String>, DbError>;

    /// Writes every record of `entity` (changed after `since`, where supported) to `out`
    /// and returns the number of records written. `out` only appears once complete.
    async fn extract_entity(
        &self,
        entity: &str,
        since: Option<DateTime<Utc>>,
        out: &Path,
    ) -> Result<u64, SourceError>;

    /// Releases the connection. Calling it when not connected is a no-op.
    async fn disconnect(&self);
}

use connectors::{
    error::{ConnectorError, DbError},
    file::error::FileError,
    source::SourceError,
    storage::error::StorageError,
};
use engine_config::error::ConfigError;
use engine_core::error::WatermarkError;
use engine_processing::error::{LoadError, TransformError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The store could not be reached; aborts that store's sub-task.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    /// One collection or table failed; the others still run.
    #[error("Failed to extract '{entity}': {source}")]
    Entity {
        entity: String,
        #[source]
        source: SourceError,
    },
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Top-level errors of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Asset mirroring failed: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Connector setup failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Asset buckets are not configured")]
    AssetsNotConfigured,

    #[error("A pipeline run is already in progress")]
    AlreadyRunning,
}

use crate::error::WatermarkError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod file_store;
pub mod memory;

/// Persists the start time of the last fully successful extraction.
///
/// Absence is a valid state meaning "extract everything".
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_last(&self) -> Result<Option<DateTime<Utc>>, WatermarkError>;
    async fn save(&self, at: DateTime<Utc>) -> Result<(), WatermarkError>;
    async fn reset(&self) -> Result<(), WatermarkError>;
}

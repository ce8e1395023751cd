use crate::{error::WatermarkError, watermark::WatermarkStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Process-local watermark, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    pub fn new(initial: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get_last(&self) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        Ok(*self.value.lock().await)
    }

    async fn save(&self, at: DateTime<Utc>) -> Result<(), WatermarkError> {
        *self.value.lock().await = Some(at);
        Ok(())
    }

    async fn reset(&self) -> Result<(), WatermarkError> {
        *self.value.lock().await = None;
        Ok(())
    }
}

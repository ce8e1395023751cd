use crate::{error::WatermarkError, watermark::WatermarkStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkDocument {
    #[serde(rename = "last-extraction-time")]
    last_extraction_time: DateTime<Utc>,
}

/// Watermark kept in a small JSON file: `{ "last-extraction-time": "<ISO-8601>" }`.
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn get_last(&self) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        // Unreadable content counts as no watermark.
        match serde_json::from_str::<WatermarkDocument>(&content) {
            Ok(doc) => Ok(Some(doc.last_extraction_time)),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Ignoring unreadable watermark file, extracting everything"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, at: DateTime<Utc>) -> Result<(), WatermarkError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(&WatermarkDocument {
            last_extraction_time: at,
        })?;

        // Readers only ever see a complete file.
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), watermark = %at, "Saved watermark");
        Ok(())
    }

    async fn reset(&self) -> Result<(), WatermarkError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn missing_file_means_no_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("extraction-date.json"));
        assert_eq!(store.get_last().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("extraction-date.json");
        let store = FileWatermarkStore::new(&path);
        let at = Utc.with_ymd_and_hms(2025, 7, 16, 10, 30, 45).unwrap();

        store.save(at).await.unwrap();
        assert_eq!(store.get_last().await.unwrap(), Some(at));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("last-extraction-time").is_some());

        store.reset().await.unwrap();
        assert_eq!(store.get_last().await.unwrap(), None);
        store.reset().await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_file_falls_back_to_full_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extraction-date.json");
        let store = FileWatermarkStore::new(&path);

        for content in ["{\"last-extraction-time\": 12}", "{\"last-extraction-ti", "not json"] {
            std::fs::write(&path, content).unwrap();
            assert_eq!(store.get_last().await.unwrap(), None, "{content}");
        }

        // The next successful run overwrites the broken file.
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        store.save(at).await.unwrap();
        assert_eq!(store.get_last().await.unwrap(), Some(at));
    }
}

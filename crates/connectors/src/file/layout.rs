use crate::file::error::FileError;
use chrono::{DateTime, Utc};
use model::records::kind::SourceKind;
use std::path::{Path, PathBuf};

const EXTRACTED_DIR: &str = "extracted";
const TRANSFORMED_DIR: &str = "transformed";
const TRANSFORMED_MARKER: &str = ".transformed";

/// Directory scheme for intermediate files:
///
/// ```text
/// <root>/extracted/{document|relational}/<entity>_<timestamp>.<json|csv>
/// <root>/transformed/{document|relational}/<entity>_<timestamp>.transformed.<json|csv>
/// ```
#[derive(Debug, Clone)]
pub struct IntermediateLayout {
    root: PathBuf,
}

impl IntermediateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extracted_dir(&self, kind: SourceKind) -> PathBuf {
        self.root.join(EXTRACTED_DIR).join(kind.as_str())
    }

    pub fn transformed_dir(&self, kind: SourceKind) -> PathBuf {
        self.root.join(TRANSFORMED_DIR).join(kind.as_str())
    }

    pub fn extracted_path(&self, kind: SourceKind, entity: &str, at: DateTime<Utc>) -> PathBuf {
        self.extracted_dir(kind)
            .join(format!("{entity}_{}.{}", file_timestamp(at), kind.extension()))
    }

    /// Output path for the transformed counterpart of an extracted file.
    pub fn transformed_path(&self, kind: SourceKind, extracted: &Path) -> Result<PathBuf, FileError> {
        let stem = extracted
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(&format!(".{}", kind.extension())))
            .ok_or_else(|| FileError::InvalidName(extracted.display().to_string()))?;

        Ok(self
            .transformed_dir(kind)
            .join(format!("{stem}{TRANSFORMED_MARKER}.{}", kind.extension())))
    }

    pub async fn ensure_dirs(&self) -> Result<(), FileError> {
        for kind in SourceKind::ALL {
            tokio::fs::create_dir_all(self.extracted_dir(kind)).await?;
            tokio::fs::create_dir_all(self.transformed_dir(kind)).await?;
        }
        Ok(())
    }

    /// Extracted files of `kind`, sorted by name (entity, then timestamp).
    pub async fn list_extracted(&self, kind: SourceKind) -> Result<Vec<PathBuf>, FileError> {
        list_files(&self.extracted_dir(kind), kind, false).await
    }

    /// Transformed files of `kind`, sorted by name (entity, then timestamp).
    pub async fn list_transformed(&self, kind: SourceKind) -> Result<Vec<PathBuf>, FileError> {
        list_files(&self.transformed_dir(kind), kind, true).await
    }

    /// Deletes every extracted and transformed file.
    pub async fn clean(&self) -> Result<(), FileError> {
        for dir in [EXTRACTED_DIR, TRANSFORMED_DIR] {
            match tokio::fs::remove_dir_all(self.root.join(dir)).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

/// Timestamp fragment used in file names, e.g. `2025-07-16T10-30-45-123Z`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Recovers the collection/table name from an intermediate file name.
pub fn entity_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (stem, _ext) = name.rsplit_once('.')?;
    let stem = stem.strip_suffix(TRANSFORMED_MARKER).unwrap_or(stem);
    let (entity, _timestamp) = stem.rsplit_once('_')?;
    (!entity.is_empty()).then(|| entity.to_string())
}

async fn list_files(dir: &Path, kind: SourceKind, transformed: bool) -> Result<Vec<PathBuf>, FileError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let suffix = format!(".{}", kind.extension());
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_transformed = name.ends_with(&format!("{TRANSFORMED_MARKER}{suffix}"));
        if name.ends_with(&suffix) && is_transformed == transformed && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 16, 10, 30, 45).unwrap() + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn builds_extracted_and_transformed_names() {
        let layout = IntermediateLayout::new("/tmp/out");
        let extracted = layout.extracted_path(SourceKind::Relational, "order_items", at());
        assert_eq!(
            extracted,
            PathBuf::from("/tmp/out/extracted/relational/order_items_2025-07-16T10-30-45-123Z.csv")
        );

        let transformed = layout
            .transformed_path(SourceKind::Relational, &extracted)
            .unwrap();
        assert_eq!(
            transformed,
            PathBuf::from(
                "/tmp/out/transformed/relational/order_items_2025-07-16T10-30-45-123Z.transformed.csv"
            )
        );
    }

    #[test]
    fn entity_name_survives_underscores() {
        let path = PathBuf::from("order_items_2025-07-16T10-30-45-123Z.transformed.json");
        assert_eq!(entity_name(&path).as_deref(), Some("order_items"));
        assert_eq!(entity_name(Path::new("users_2025-07-16T10-30-45-123Z.csv")).as_deref(), Some("users"));
        assert_eq!(entity_name(Path::new("noseparator.csv")), None);
    }

    #[tokio::test]
    async fn lists_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = IntermediateLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();

        let extracted = layout.extracted_path(SourceKind::Document, "users", at());
        tokio::fs::write(&extracted, b"[]").await.unwrap();
        tokio::fs::write(crate::file::part_path(&extracted), b"[").await.unwrap();
        let transformed = layout.transformed_path(SourceKind::Document, &extracted).unwrap();
        tokio::fs::write(&transformed, b"[]").await.unwrap();

        assert_eq!(layout.list_extracted(SourceKind::Document).await.unwrap(), vec![extracted]);
        assert_eq!(layout.list_transformed(SourceKind::Document).await.unwrap(), vec![transformed]);
        assert!(layout.list_extracted(SourceKind::Relational).await.unwrap().is_empty());

        layout.clean().await.unwrap();
        assert!(layout.list_transformed(SourceKind::Document).await.unwrap().is_empty());
    }
}

pub mod csv;
pub mod error;
pub mod json;
pub mod layout;

use crate::file::error::FileError;
use std::path::{Path, PathBuf};

/// Path an output file is written to before it is committed under its final name.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Atomically moves a finished `.part` file to its final path.
pub async fn commit_part(path: &Path) -> Result<(), FileError> {
    tokio::fs::rename(part_path(path), path).await?;
    Ok(())
}

/// Removes a leftover `.part` file; a missing file is not an error.
pub async fn discard_part(path: &Path) {
    let _ = tokio::fs::remove_file(part_path(path)).await;
}

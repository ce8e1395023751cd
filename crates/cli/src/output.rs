use crate::error::CliError;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Prints `report` as pretty JSON, or writes it to `path` when given.
pub async fn emit<T: Serialize>(report: &T, path: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report).map_err(CliError::JsonSerialize)?;
    match path {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

use crate::records::kind::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// One extracted collection or table. Produced once per entity per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub source: SourceKind,
    pub entity: String,
    /// Number of records written to `file_path`.
    pub record_count: u64,
    pub file_path: PathBuf,
    pub extracted_at: DateTime<Utc>,
}

/// One anonymized intermediate file, paired with the extracted file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub source: SourceKind,
    pub original_file: PathBuf,
    pub transformed_file: PathBuf,
    /// Always equal to the record count of `original_file`.
    pub record_count: u64,
    pub transformed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOperation {
    Insert,
    Replace,
    Upsert,
}

impl fmt::Display for LoadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOperation::Insert => f.write_str("insert"),
            LoadOperation::Replace => f.write_str("replace"),
            LoadOperation::Upsert => f.write_str("upsert"),
        }
    }
}

/// One transformed file written into a destination collection or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub source: SourceKind,
    pub entity: String,
    pub record_count: u64,
    pub operation: LoadOperation,
    pub loaded_at: DateTime<Utc>,
}

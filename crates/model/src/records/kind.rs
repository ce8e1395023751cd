use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The two store families the pipeline moves data between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Document store (collections of JSON-like documents).
    Document,
    /// Relational store (tables of rows).
    Relational,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Document, SourceKind::Relational];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::Relational => "relational",
        }
    }

    /// File extension used for intermediate files of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Document => "json",
            SourceKind::Relational => "csv",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" | "mongo" | "mongodb" => Ok(SourceKind::Document),
            "relational" | "pg" | "postgres" | "postgresql" => Ok(SourceKind::Relational),
            other => Err(format!("Unknown source kind: {other}")),
        }
    }
}

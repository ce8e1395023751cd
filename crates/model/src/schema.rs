use serde::{Deserialize, Serialize};
use std::fmt;

/// Column types the schema inferencer can produce, in ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Decimal,
    Boolean,
    Timestamp,
    Text,
}

impl ColumnType {
    pub fn postgres_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.postgres_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

/// Relational schema derived from a sample record. Immutable once the table exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSchema {
    /// Columns in source order, excluding a synthesized key.
    pub columns: Vec<ColumnDef>,
    pub primary_key: String,
    /// True when the source had no identifier and a serial key must be created.
    pub synthesized_key: bool,
}

impl DestinationSchema {
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }
}

use connectors::{
    error::{ConnectorError, DbError},
    file::error::FileError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transform task failed: {0}")]
    Task(String),
}

/// The sample record cannot describe a usable table.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaInferenceError {
    #[error("Sample record has no fields")]
    EmptySample,

    #[error("Column {0} has an empty name")]
    EmptyColumnName(usize),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema inference failed for table '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: SchemaInferenceError,
    },

    #[error("No column of '{0}' matches the destination table")]
    NoMatchingColumns(String),

    #[error("Load task failed: {0}")]
    Task(String),
}

impl LoadError {
    /// Connection failures abort the whole sub-task instead of a single file.
    pub fn is_connection(&self) -> bool {
        matches!(self, LoadError::Connection(_))
    }
}

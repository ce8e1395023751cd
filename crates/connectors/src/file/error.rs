use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A file name that does not follow the intermediate naming scheme.
    #[error("Invalid intermediate file name: {0}")]
    InvalidName(String),

    /// Raised by a per-record callback to stop a stream early.
    #[error("Record rejected: {0}")]
    Rejected(String),
}

impl FileError {
    pub fn is_not_found(&self) -> bool {
        match self {
            FileError::NotFound(_) => true,
            FileError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

use thiserror::Error;

/// Errors happening while establishing a connection to a store.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection string: {0}")]
    InvalidUrl(String),

    #[error("Postgres connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("MongoDB connection failed: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The document store URI does not name a default database.
    #[error("No default database in connection string for {0}")]
    MissingDatabase(String),

    #[error("Object store setup failed: {0}")]
    ObjectStore(#[from] object_store::Error),
}

impl ConnectorError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            // Errors carrying a SQLSTATE come from the server (auth, unknown db) and won't heal.
            ConnectorError::Postgres(err) => err.code().is_none(),
            ConnectorError::Mongo(err) => matches!(
                *err.kind,
                mongodb::error::ErrorKind::Io(_) | mongodb::error::ErrorKind::ServerSelection { .. }
            ),
            ConnectorError::InvalidUrl(_)
            | ConnectorError::Tls(_)
            | ConnectorError::MissingDatabase(_)
            | ConnectorError::ObjectStore(_) => false,
        }
    }
}

/// All errors coming from the query layer of a connected store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sql(#[from] tokio_postgres::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Document conversion error: {0}")]
    Document(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not connected to {0}")]
    NotConnected(String),
}

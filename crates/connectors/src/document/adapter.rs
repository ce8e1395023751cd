use crate::error::{ConnectorError, DbError};
use model::records::stats::EntityStats;
use mongodb::{
    Client, Collection, Database,
    bson::{Bson, Document, doc},
};
use tracing::debug;

/// Connected MongoDB client bound to the database named in its URI.
#[derive(Clone)]
pub struct MongoAdapter {
    client: Client,
    db: Database,
}

impl MongoAdapter {
    /// Connects and pings. `label` names the store in errors so the URI (and its
    /// credentials) never ends up in logs.
    pub async fn connect(uri: &str, label: &str) -> Result<Self, ConnectorError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client
            .default_database()
            .ok_or_else(|| ConnectorError::MissingDatabase(label.to_string()))?;
        db.run_command(doc! { "ping": 1 }).await?;

        debug!(database = db.name(), "Connected to MongoDB");
        Ok(Self { client, db })
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    /// User collections, sorted. System collections are skipped.
    pub async fn list_collections(&self) -> Result<Vec<String>, DbError> {
        let mut names = self.db.list_collection_names().await?;
        names.retain(|name| !name.starts_with("system."));
        names.sort();
        Ok(names)
    }

    /// Replaces each document sharing its `_id`, inserting when absent. Documents
    /// without an `_id` are inserted.
    ///
    /// Writes go one round trip per document. The batch only bounds how many parsed
    /// documents are held in memory between the file reader and this writer.
    pub async fn upsert_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64, DbError> {
        let coll = self.collection(collection);
        let mut written = 0;

        for document in documents {
            match document.get("_id").cloned() {
                Some(id) => {
                    coll.replace_one(doc! { "_id": id }, document)
                        .upsert(true)
                        .await?;
                }
                None => {
                    coll.insert_one(document).await?;
                }
            }
            written += 1;
        }

        Ok(written)
    }

    pub async fn collection_stats(&self, collection: &str) -> Result<EntityStats, DbError> {
        let stats = self.db.run_command(doc! { "collStats": collection }).await?;
        Ok(EntityStats {
            count: bson_to_u64(stats.get("count")),
            size: bson_to_u64(stats.get("size")),
        })
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

fn bson_to_u64(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

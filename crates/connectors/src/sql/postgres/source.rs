use crate::{
    error::{ConnectorError, DbError},
    file::{commit_part, csv::encode_rows, csv::json_to_cell, discard_part, part_path},
    source::{SourceConnector, SourceError},
    sql::postgres::{adapter::PgAdapter, utils::quote_ident},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{TryStreamExt, pin_mut};
use model::records::kind::SourceKind;
use serde_json::{Map, Value};
use std::path::Path;
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    sync::RwLock,
};
use tracing::debug;

const UPDATED_COLUMNS: [&str; 2] = ["updatedAt", "updated_at"];
const CREATED_COLUMNS: [&str; 2] = ["createdAt", "created_at"];

/// Relational source: every table of the `public` schema, exported as CSV.
pub struct PgSource {
    url: String,
    batch_size: usize,
    adapter: RwLock<Option<PgAdapter>>,
}

impl PgSource {
    pub fn new(url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            url: url.into(),
            batch_size: batch_size.max(1),
            adapter: RwLock::new(None),
        }
    }

    async fn adapter(&self) -> Result<PgAdapter, DbError> {
        self.adapter
            .read()
            .await
            .clone()
            .ok_or_else(|| DbError::NotConnected("relational source".to_string()))
    }

    async fn write_rows(
        &self,
        adapter: &PgAdapter,
        entity: &str,
        columns: &[String],
        since: Option<DateTime<Utc>>,
        part: &Path,
    ) -> Result<u64, SourceError> {
        let mut sql = format!("SELECT row_to_json(t)::text FROM {} t", quote_ident(entity));
        let rows = match (since, watermark_expression(columns)) {
            (Some(since), Some(expr)) => {
                sql.push_str(&format!(" WHERE {expr} > $1::timestamptz"));
                adapter.query_stream(&sql, &[&since]).await?
            }
            _ => adapter.query_stream(&sql, &[]).await?,
        };
        pin_mut!(rows);

        let mut writer = BufWriter::new(tokio::fs::File::create(part).await?);
        writer.write_all(&encode_rows([columns])?).await?;

        let mut batch: Vec<Vec<String>> = Vec::with_capacity(self.batch_size);
        let mut written = 0u64;
        while let Some(row) = rows.try_next().await.map_err(DbError::from)? {
            let text: String = row.try_get(0).map_err(DbError::from)?;
            batch.push(row_cells(&text, columns)?);

            if batch.len() >= self.batch_size {
                writer.write_all(&encode_rows(&batch)?).await?;
                written += batch.len() as u64;
                batch.clear();
                debug!(table = entity, rows = written, "Wrote batch");
            }
        }

        if !batch.is_empty() {
            writer.write_all(&encode_rows(&batch)?).await?;
            written += batch.len() as u64;
        }
        writer.flush().await?;

        Ok(written)
    }
}

/// Splits one `row_to_json` record into CSV cells in `columns` order. Numbers keep
/// their exact digits, so NUMERIC values are not rounded through `f64`.
pub fn row_cells(text: &str, columns: &[String]) -> Result<Vec<String>, DbError> {
    let record: Map<String, Value> = serde_json::from_str(text)?;
    Ok(columns
        .iter()
        .map(|c| record.get(c).map(json_to_cell).unwrap_or_default())
        .collect())
}

/// SQL expression bounding incremental extraction, if the table has a suitable column.
pub fn watermark_expression(columns: &[String]) -> Option<String> {
    let pick = |candidates: &[&str]| {
        candidates
            .iter()
            .find(|c| columns.iter().any(|col| col.as_str() == **c))
            .map(|c| quote_ident(c))
    };

    match (pick(&UPDATED_COLUMNS), pick(&CREATED_COLUMNS)) {
        (Some(updated), Some(created)) => Some(format!("COALESCE({updated}, {created})")),
        (Some(column), None) | (None, Some(column)) => Some(column),
        (None, None) => None,
    }
}

#[async_trait]
impl SourceConnector for PgSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Relational
    }

    async fn connect(&self) -> Result<(), ConnectorError> {
        let adapter = PgAdapter::connect(&self.url).await?;
        *self.adapter.write().await = Some(adapter);
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<String>, DbError> {
        self.adapter().await?.list_tables().await
    }

    async fn extract_entity(
        &self,
        entity: &str,
        since: Option<DateTime<Utc>>,
        out: &Path,
    ) -> Result<u64, SourceError> {
        let adapter = self.adapter().await?;
        let columns = adapter.table_columns(entity).await?;
        if columns.is_empty() {
            return Err(SourceError::UnknownEntity(entity.to_string()));
        }

        match self
            .write_rows(&adapter, entity, &columns, since, &part_path(out))
            .await
        {
            Ok(written) => {
                commit_part(out).await?;
                Ok(written)
            }
            Err(err) => {
                discard_part(out).await;
                Err(err)
            }
        }
    }

    async fn disconnect(&self) {
        // Dropping the client closes the connection task.
        self.adapter.write().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prefers_updated_and_falls_back_to_created() {
        assert_eq!(
            watermark_expression(&cols(&["id", "updatedAt", "createdAt"])).as_deref(),
            Some("COALESCE(\"updatedAt\", \"createdAt\")")
        );
        assert_eq!(
            watermark_expression(&cols(&["id", "created_at"])).as_deref(),
            Some("\"created_at\"")
        );
        assert_eq!(
            watermark_expression(&cols(&["updated_at"])).as_deref(),
            Some("\"updated_at\"")
        );
        assert_eq!(watermark_expression(&cols(&["id", "name"])), None);
    }

    #[test]
    fn numeric_cells_keep_every_digit() {
        let text = r#"{"id":7,"balance":123456789012345678901234.56,"rate":0.10,"note":null}"#;
        let cells = row_cells(text, &cols(&["id", "balance", "rate", "note", "missing"])).unwrap();
        assert_eq!(cells, ["7", "123456789012345678901234.56", "0.10", "", ""]);
    }
}

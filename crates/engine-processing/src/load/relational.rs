use crate::{
    error::LoadError,
    load::EntityLoader,
    schema::{ID_COLUMN, create_table_sql, infer_schema_from_row},
};
use async_trait::async_trait;
use chrono::Utc;
use connectors::{
    error::{ConnectorError, DbError},
    file::{csv::cell_to_json, csv::open_reader, error::FileError},
    sql::postgres::{adapter::PgAdapter, utils::quote_ident},
};
use engine_core::observer::Observer;
use model::{
    events::{Phase, ProgressEvent},
    records::{
        kind::SourceKind,
        results::{LoadOperation, LoadResult},
        stats::EntityStats,
    },
};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// Loads transformed CSV files into the destination relational store, creating
/// missing tables from the first data row.
pub struct RelationalLoader {
    url: String,
    batch_size: usize,
    adapter: RwLock<Option<PgAdapter>>,
}

/// A batch of rows serialized as one JSON array, ready to bind as a single parameter.
#[derive(Debug)]
pub(crate) struct RowBatch {
    pub payload: String,
    pub rows: usize,
}

struct CsvHead {
    headers: Vec<String>,
    first_row: Option<Vec<String>>,
}

impl RelationalLoader {
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
            .ok_or_else(|| DbError::NotConnected("relational destination".to_string()))
    }

    fn result(entity: &str, record_count: u64, operation: LoadOperation) -> LoadResult {
        LoadResult {
            source: SourceKind::Relational,
            entity: entity.to_string(),
            record_count,
            operation,
            loaded_at: Utc::now(),
        }
    }
}

fn read_head(path: &Path) -> Result<CsvHead, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let first_row = reader
        .records()
        .next()
        .transpose()?
        .map(|row| row.iter().map(str::to_string).collect());
    Ok(CsvHead { headers, first_row })
}

/// Statement inserting every row of a `json_populate_recordset` payload bound as `$1`.
///
/// With `upsert`, rows whose `id` already exists update every other selected column.
pub fn insert_sql(table: &str, columns: &[String], upsert: bool) -> String {
    let table = quote_ident(table);
    let list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {table} ({list}) SELECT {list} FROM json_populate_recordset(NULL::{table}, $1::text::json)"
    );

    if upsert {
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| c.as_str() != ID_COLUMN)
            .map(|c| {
                let c = quote_ident(c);
                format!("{c} = EXCLUDED.{c}")
            })
            .collect();
        let key = quote_ident(ID_COLUMN);
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({key}) DO NOTHING"));
        } else {
            sql.push_str(&format!(" ON CONFLICT ({key}) DO UPDATE SET {}", updates.join(", ")));
        }
    }

    sql
}

/// Reads the CSV at `path`, keeping the cells at `selected` (named by `columns`),
/// and sends fixed-size batches to `tx`. With `key` set, rows sharing an id
/// within one batch collapse to the last one, since a single upsert statement
/// cannot touch the same row twice.
pub(crate) fn stream_rows(
    path: &Path,
    selected: &[usize],
    columns: &[String],
    key: Option<usize>,
    batch_size: usize,
    tx: mpsc::Sender<RowBatch>,
) -> Result<u64, LoadError> {
    let mut reader = open_reader(path)?;
    let mut batch: Vec<Map<String, Value>> = Vec::with_capacity(batch_size);
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut read = 0u64;

    for record in reader.records() {
        let record = record?;
        read += 1;

        let row: Map<String, Value> = selected
            .iter()
            .zip(columns)
            .map(|(&i, name)| (name.clone(), cell_to_json(record.get(i).unwrap_or(""))))
            .collect();

        let id = key
            .and_then(|k| record.get(selected[k]))
            .filter(|id| !id.is_empty());
        match id.and_then(|id| positions.get(id).copied()) {
            Some(position) => batch[position] = row,
            None => {
                if let Some(id) = id {
                    positions.insert(id.to_string(), batch.len());
                }
                batch.push(row);
            }
        }

        if batch.len() >= batch_size {
            send_batch(&tx, std::mem::take(&mut batch))?;
            positions.clear();
        }
    }

    if !batch.is_empty() {
        send_batch(&tx, batch)?;
    }
    Ok(read)
}

fn send_batch(tx: &mpsc::Sender<RowBatch>, batch: Vec<Map<String, Value>>) -> Result<(), LoadError> {
    let rows = batch.len();
    let payload = serde_json::to_string(&batch).map_err(FileError::from)?;
    tx.blocking_send(RowBatch { payload, rows })
        .map_err(|_| LoadError::Task("writer stopped".to_string()))
}

#[async_trait]
impl EntityLoader for RelationalLoader {
    fn kind(&self) -> SourceKind {
        SourceKind::Relational
    }

    async fn connect(&self) -> Result<(), ConnectorError> {
        let adapter = PgAdapter::connect(&self.url).await?;
        *self.adapter.write().await = Some(adapter);
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<String>, LoadError> {
        Ok(self.adapter().await?.list_tables().await?)
    }

    async fn load_file(
        &self,
        entity: &str,
        path: &Path,
        observer: &dyn Observer,
    ) -> Result<LoadResult, LoadError> {
        let adapter = self.adapter().await?;

        let head_path: PathBuf = path.to_path_buf();
        let head = tokio::task::spawn_blocking(move || read_head(&head_path))
            .await
            .map_err(|err| LoadError::Task(err.to_string()))??;

        if head.headers.is_empty() {
            debug!(table = entity, "Empty file, nothing to load");
            return Ok(Self::result(entity, 0, LoadOperation::Insert));
        }

        if !adapter.table_exists(entity).await? {
            // Column types come from the first row; without one there is nothing to infer from.
            let Some(first_row) = head.first_row.as_deref() else {
                info!(table = entity, "No rows and no destination table, skipping creation");
                return Ok(Self::result(entity, 0, LoadOperation::Insert));
            };

            let schema = infer_schema_from_row(&head.headers, first_row).map_err(|source| {
                LoadError::Schema {
                    table: entity.to_string(),
                    source,
                }
            })?;
            adapter.exec(&create_table_sql(entity, &schema)).await?;
            info!(
                table = entity,
                columns = schema.columns.len(),
                synthesized_key = schema.synthesized_key,
                "Created destination table"
            );
        }

        let table_columns = adapter.table_columns(entity).await?;
        let (selected, dropped): (Vec<usize>, Vec<usize>) = (0..head.headers.len())
            .partition(|&i| table_columns.contains(&head.headers[i]));
        if !dropped.is_empty() {
            let names: Vec<&str> = dropped.iter().map(|&i| head.headers[i].as_str()).collect();
            warn!(table = entity, columns = ?names, "Ignoring columns missing from destination table");
        }
        if selected.is_empty() {
            return Err(LoadError::NoMatchingColumns(entity.to_string()));
        }

        let columns: Vec<String> = selected.iter().map(|&i| head.headers[i].clone()).collect();
        let key = columns.iter().position(|c| c == ID_COLUMN);
        let unique_key = match key {
            Some(_) => adapter.is_unique_column(entity, ID_COLUMN).await?,
            None => false,
        };
        let operation = if unique_key {
            LoadOperation::Upsert
        } else {
            if key.is_some() {
                warn!(table = entity, "Id column is not unique, rows are inserted without conflict handling");
            }
            LoadOperation::Insert
        };
        let sql = insert_sql(entity, &columns, operation == LoadOperation::Upsert);

        let (tx, mut rx) = mpsc::channel::<RowBatch>(2);
        let input: PathBuf = path.to_path_buf();
        let batch_size = self.batch_size;
        let dedupe = if operation == LoadOperation::Upsert { key } else { None };
        let reader = tokio::task::spawn_blocking(move || {
            stream_rows(&input, &selected, &columns, dedupe, batch_size, tx)
        });

        let mut written = 0u64;
        let mut write_error = None;
        while let Some(batch) = rx.recv().await {
            match adapter.execute(&sql, &[&batch.payload]).await {
                Ok(_) => {
                    written += batch.rows as u64;
                    debug!(table = entity, written, "Wrote batch");
                    observer.on_event(&ProgressEvent::EntityProgress {
                        phase: Phase::Load,
                        entity: entity.to_string(),
                        processed: written,
                    });
                }
                Err(err) => {
                    write_error = Some(err);
                    break;
                }
            }
        }
        drop(rx);

        let read = reader
            .await
            .map_err(|err| LoadError::Task(err.to_string()))?;
        if let Some(err) = write_error {
            return Err(err.into());
        }

        Ok(Self::result(entity, read?, operation))
    }

    async fn stats(&self, entity: &str) -> Result<EntityStats, LoadError> {
        Ok(self.adapter().await?.table_stats(entity).await?)
    }

    async fn disconnect(&self) {
        self.adapter.write().await.take();
    }
}

use crate::{
    error::{ConnectorError, DbError},
    sql::postgres::utils::{connect_client, quote_ident, slice_iter},
};
use model::records::stats::EntityStats;
use std::sync::Arc;
use tokio_postgres::{Client, RowStream, types::ToSql};
use tracing::debug;

const QUERY_TABLE_EXISTS_SQL: &str = include_str!("sql/table_exists.sql");
const QUERY_LIST_TABLES_SQL: &str = include_str!("sql/list_tables.sql");
const QUERY_TABLE_COLUMNS_SQL: &str = include_str!("sql/table_columns.sql");
const QUERY_UNIQUE_COLUMN_SQL: &str = include_str!("sql/unique_column.sql");

/// Thin wrapper over a connected Postgres client, scoped to the `public` schema.
#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<Client>,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgAdapter {
            client: Arc::new(client),
        })
    }

    pub async fn exec(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql, "Executing statement");
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, DbError> {
        Ok(self.client.execute(sql, params).await?)
    }

    /// Runs a query whose rows are consumed as a stream instead of buffered.
    pub async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<RowStream, DbError> {
        debug!(sql, "Streaming query");
        Ok(self.client.query_raw(sql, slice_iter(params)).await?)
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let rows = self.client.query(QUERY_LIST_TABLES_SQL, &[]).await?;
        let tables = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let row = self
            .client
            .query_one(QUERY_TABLE_EXISTS_SQL, &[&table])
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Column names in ordinal order. Empty when the table does not exist.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        let rows = self.client.query(QUERY_TABLE_COLUMNS_SQL, &[&table]).await?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Whether `column` alone is covered by a unique index or primary key.
    pub async fn is_unique_column(&self, table: &str, column: &str) -> Result<bool, DbError> {
        let regclass = quote_ident(table);
        let row = self
            .client
            .query_one(QUERY_UNIQUE_COLUMN_SQL, &[&regclass, &column])
            .await?;
        Ok(row.try_get(0)?)
    }

    pub async fn table_stats(&self, table: &str) -> Result<EntityStats, DbError> {
        let ident = quote_ident(table);
        let sql = format!(
            "SELECT count(*)::bigint, pg_total_relation_size(to_regclass($1))::bigint FROM {ident}"
        );
        let row = self.client.query_one(&sql, &[&ident]).await?;
        let count: i64 = row.try_get(0)?;
        let size: Option<i64> = row.try_get(1)?;

        Ok(EntityStats {
            count: count.max(0) as u64,
            size: size.unwrap_or(0).max(0) as u64,
        })
    }
}

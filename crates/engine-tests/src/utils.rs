#![allow(dead_code)]

use crate::pg_client;
use chrono::{DateTime, Utc};
use connectors::file::{csv::open_reader, layout::IntermediateLayout};
use model::records::kind::SourceKind;
use std::path::{Path, PathBuf};

/// Source table with both watermark columns; `updated_at` is NULL for rows never edited.
pub const EVENTS_TABLE_DDL: &str = r#"
    CREATE TABLE events (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ
    );
"#;

/// Destination table without a unique `id`, forcing plain inserts.
pub const AUDIT_TABLE_DDL: &str = r#"
    CREATE TABLE audit (
        id BIGINT,
        action TEXT
    );
"#;

pub async fn execute(sql: &str) {
    pg_client()
        .await
        .batch_execute(sql)
        .await
        .unwrap_or_else(|e| panic!("failed to execute `{sql}`: {e}"));
}

pub async fn get_row_count(table: &str) -> i64 {
    pg_client()
        .await
        .query_one(&format!("SELECT COUNT(*) FROM \"{table}\""), &[])
        .await
        .expect("count rows")
        .get(0)
}

pub async fn assert_row_count(table: &str, expected: i64) {
    assert_eq!(
        get_row_count(table).await,
        expected,
        "row count mismatch for table '{table}'"
    );
}

pub async fn assert_table_exists(table: &str, should: bool) {
    let exists: bool = pg_client()
        .await
        .query_one(
            r#"
        SELECT EXISTS (
          SELECT 1
            FROM information_schema.tables
           WHERE table_schema='public'
             AND table_name=$1
        );
        "#,
            &[&table],
        )
        .await
        .expect("query information_schema")
        .get(0);
    assert_eq!(
        exists, should,
        "expected table '{table}' existence == {should}"
    );
}

/// `(column, data_type)` pairs in ordinal order.
pub async fn get_columns(table: &str) -> Vec<(String, String)> {
    pg_client()
        .await
        .query(
            r#"
        SELECT column_name::text, data_type::text
          FROM information_schema.columns
         WHERE table_schema='public'
           AND table_name=$1
         ORDER BY ordinal_position;
        "#,
            &[&table],
        )
        .await
        .expect("query columns")
        .iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect()
}

pub async fn get_cell_as_string(sql: &str) -> Option<String> {
    pg_client()
        .await
        .query_one(sql, &[])
        .await
        .expect("fetch cell")
        .get(0)
}

/// Data rows of a CSV file, header excluded.
pub fn csv_row_count(path: &Path) -> usize {
    open_reader(path)
        .expect("open csv")
        .records()
        .map(|r| r.expect("csv record"))
        .count()
}

pub fn csv_headers(path: &Path) -> Vec<String> {
    open_reader(path)
        .expect("open csv")
        .headers()
        .expect("csv headers")
        .iter()
        .map(str::to_string)
        .collect()
}

/// Values of one column of a CSV file, in row order.
pub fn csv_column(path: &Path, column: &str) -> Vec<String> {
    let mut reader = open_reader(path).expect("open csv");
    let index = reader
        .headers()
        .expect("csv headers")
        .iter()
        .position(|h| h == column)
        .expect("column present");
    reader
        .records()
        .map(|r| r.expect("csv record")[index].to_string())
        .collect()
}

/// Writes `content` as a transformed file of `entity` inside `layout`.
pub async fn write_transformed(
    layout: &IntermediateLayout,
    kind: SourceKind,
    entity: &str,
    at: DateTime<Utc>,
    content: &str,
) -> PathBuf {
    layout.ensure_dirs().await.expect("create layout dirs");
    let extracted = layout.extracted_path(kind, entity, at);
    let path = layout
        .transformed_path(kind, &extracted)
        .expect("transformed path");
    tokio::fs::write(&path, content)
        .await
        .expect("write transformed file");
    path
}

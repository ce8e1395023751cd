//! Destination schema inference for relational tables created on first load.
//!
//! Types come from a ranked rule list applied to a single sample record:
//! integer, decimal, boolean, ISO date, then text.

use crate::error::SchemaInferenceError;
use chrono::NaiveDate;
use connectors::sql::postgres::utils::quote_ident;
use model::schema::{ColumnDef, ColumnType, DestinationSchema};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Column used as the primary key when the source provides it.
pub const ID_COLUMN: &str = "id";

pub fn infer_type(value: &Value) -> ColumnType {
    match value {
        Value::Bool(_) => ColumnType::Boolean,
        Value::Number(n) if n.is_i64() => ColumnType::Integer,
        Value::Number(_) => ColumnType::Decimal,
        Value::String(s) => infer_text_type(s),
        Value::Null | Value::Array(_) | Value::Object(_) => ColumnType::Text,
    }
}

fn infer_text_type(s: &str) -> ColumnType {
    if is_integer(s) {
        return if s.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else {
            ColumnType::Decimal
        };
    }
    if is_decimal(s) {
        return ColumnType::Decimal;
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }
    if is_iso_date(s) {
        return ColumnType::Timestamp;
    }
    ColumnType::Text
}

// Leading zeros mark codes (postal, account) rather than numbers.
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

fn is_decimal(s: &str) -> bool {
    let Some((whole, fraction)) = s.split_once('.') else {
        return false;
    };
    (is_integer(whole) || whole == "-0")
        && !fraction.is_empty()
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn is_iso_date(s: &str) -> bool {
    let Some(day) = s.get(..10) else {
        return false;
    };
    NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok()
        && s[10..].chars().next().is_none_or(|c| c == 'T' || c == ' ')
}

/// Derives a table schema from one sample record. Without an `id` field the
/// schema asks for a synthesized serial key.
pub fn infer_schema(sample: &Map<String, Value>) -> Result<DestinationSchema, SchemaInferenceError> {
    if sample.is_empty() {
        return Err(SchemaInferenceError::EmptySample);
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(sample.len());
    for (position, (name, value)) in sample.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(SchemaInferenceError::EmptyColumnName(position));
        }
        if !seen.insert(name.as_str()) {
            return Err(SchemaInferenceError::DuplicateColumn(name.clone()));
        }
        columns.push(ColumnDef {
            name: name.clone(),
            column_type: infer_type(value),
        });
    }

    let synthesized_key = !sample.contains_key(ID_COLUMN);
    Ok(DestinationSchema {
        columns,
        primary_key: ID_COLUMN.to_string(),
        synthesized_key,
    })
}

/// Builds a schema from a CSV header and its first data row. Cells missing from a
/// short row infer as text.
pub fn infer_schema_from_row(
    headers: &[String],
    first_row: &[String],
) -> Result<DestinationSchema, SchemaInferenceError> {
    if headers.is_empty() {
        return Err(SchemaInferenceError::EmptySample);
    }

    let mut seen = HashSet::new();
    for (position, name) in headers.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(SchemaInferenceError::EmptyColumnName(position));
        }
        if !seen.insert(name.as_str()) {
            return Err(SchemaInferenceError::DuplicateColumn(name.clone()));
        }
    }

    let sample: Map<String, Value> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cell = first_row.get(i).map(String::as_str).unwrap_or("");
            (name.clone(), connectors::file::csv::cell_to_json(cell))
        })
        .collect();

    infer_schema(&sample)
}

pub fn create_table_sql(table: &str, schema: &DestinationSchema) -> String {
    let mut columns = Vec::with_capacity(schema.columns.len() + 1);
    if schema.synthesized_key {
        columns.push(format!("{} BIGSERIAL PRIMARY KEY", quote_ident(&schema.primary_key)));
    }
    for column in &schema.columns {
        let key = if !schema.synthesized_key && column.name == schema.primary_key {
            " PRIMARY KEY"
        } else {
            ""
        };
        columns.push(format!(
            "{} {}{key}",
            quote_ident(&column.name),
            column.column_type.postgres_name()
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

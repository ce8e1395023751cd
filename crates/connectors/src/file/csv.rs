use crate::file::error::FileError;
use serde_json::Value;
use std::{fs::File, path::Path};

/// Opens a headered CSV file for reading.
pub fn open_reader(path: &Path) -> Result<csv::Reader<File>, FileError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
        _ => FileError::Io(err),
    })?;
    Ok(csv::ReaderBuilder::new().has_headers(true).from_reader(file))
}

/// Encodes rows (header included, if wanted) into CSV bytes.
pub fn encode_rows<I, R>(rows: I) -> Result<Vec<u8>, FileError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| FileError::Io(err.into_error()))
}

/// Renders a JSON value as a CSV cell. Null becomes the empty cell; nested values keep
/// their JSON text.
pub fn json_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Inverse of [`json_to_cell`] for loading: empty cells are null and cells that hold JSON
/// objects or arrays are parsed back. Everything else stays text.
pub fn cell_to_json(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }

    let trimmed = cell.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(parsed) = serde_json::from_str::<Value>(cell)
    {
        return parsed;
    }

    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_round_trip_nested_values() {
        let nested = json!({"street": "Main", "no": 4});
        assert_eq!(cell_to_json(&json_to_cell(&nested)), nested);
        assert_eq!(cell_to_json(&json_to_cell(&Value::Null)), Value::Null);
    }

    #[test]
    fn scalars_load_as_text() {
        assert_eq!(cell_to_json("42"), json!("42"));
        assert_eq!(cell_to_json("[not json"), json!("[not json"));
    }

    #[test]
    fn encodes_quoted_fields() {
        let bytes = encode_rows(vec![vec!["id", "note"], vec!["1", "a, \"b\""]]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "id,note\n1,\"a, \"\"b\"\"\"\n");
    }
}

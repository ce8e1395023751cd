//! Incremental codec for JSON-array intermediate files.
//!
//! Files hold a single top-level array of records. Reading never materializes
//! the whole array: each element is handed to a callback as soon as it is parsed.

use crate::file::error::FileError;
use serde::{
    Deserializer as _,
    de::{self, SeqAccess, Visitor},
};
use serde_json::Value;
use std::{
    fmt,
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

/// Calls `on_record` for every element of the top-level array in `reader`.
/// Returns the number of elements seen.
pub fn for_each_record<R, F>(reader: R, mut on_record: F) -> Result<u64, FileError>
where
    R: Read,
    F: FnMut(Value) -> Result<(), FileError>,
{
    let mut failure = None;
    let mut de = serde_json::Deserializer::from_reader(reader);
    let result = de.deserialize_seq(RecordVisitor {
        on_record: &mut on_record,
        failure: &mut failure,
    });

    if let Some(err) = failure {
        return Err(err);
    }

    let count = result?;
    de.end()?;
    Ok(count)
}

/// Streams a JSON-array file. A zero-byte file is treated as an empty array.
pub fn read_json_file<F>(path: &Path, on_record: F) -> Result<u64, FileError>
where
    F: FnMut(Value) -> Result<(), FileError>,
{
    let file = File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
        _ => FileError::Io(err),
    })?;

    if file.metadata()?.len() == 0 {
        return Ok(0);
    }

    for_each_record(BufReader::new(file), on_record)
}

struct RecordVisitor<'a, F> {
    on_record: &'a mut F,
    failure: &'a mut Option<FileError>,
}

impl<'de, F> Visitor<'de> for RecordVisitor<'_, F>
where
    F: FnMut(Value) -> Result<(), FileError>,
{
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON array of records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<u64, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut count = 0;
        while let Some(record) = seq.next_element::<Value>()? {
            if let Err(err) = (self.on_record)(record) {
                *self.failure = Some(err);
                return Err(de::Error::custom("record callback failed"));
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Tracks the separators needed to emit a JSON array one element at a time.
#[derive(Debug, Default)]
pub struct ArrayFraming {
    written: u64,
}

impl ArrayFraming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next element, with its leading separator, to `buf`.
    pub fn push_record(&mut self, buf: &mut Vec<u8>, record: &Value) -> Result<(), FileError> {
        let prefix: &[u8] = if self.written == 0 { b"[\n" } else { b",\n" };
        buf.extend_from_slice(prefix);
        serde_json::to_writer(&mut *buf, record)?;
        self.written += 1;
        Ok(())
    }

    /// Bytes that terminate the array.
    pub fn closing(&self) -> &'static [u8] {
        if self.written == 0 { b"[]\n" } else { b"\n]\n" }
    }

    pub fn count(&self) -> u64 {
        self.written
    }
}

/// Blocking writer producing a JSON array element by element.
pub struct JsonArrayWriter<W: Write> {
    inner: W,
    framing: ArrayFraming,
    buf: Vec<u8>,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            framing: ArrayFraming::new(),
            buf: Vec::with_capacity(1024),
        }
    }

    pub fn write_record(&mut self, record: &Value) -> Result<(), FileError> {
        self.buf.clear();
        self.framing.push_record(&mut self.buf, record)?;
        self.inner.write_all(&self.buf)?;
        Ok(())
    }

    /// Closes the array and flushes. Returns the number of records written.
    pub fn finish(mut self) -> Result<u64, FileError> {
        self.inner.write_all(self.framing.closing())?;
        self.inner.flush()?;
        Ok(self.framing.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn collect(input: &str) -> Result<Vec<Value>, FileError> {
        let mut seen = Vec::new();
        for_each_record(Cursor::new(input), |record| {
            seen.push(record);
            Ok(())
        })?;
        Ok(seen)
    }

    #[test]
    fn streams_elements_in_order() {
        let records = collect(r#"[{"a":1},{"a":2},{"a":3}]"#).unwrap();
        let values: Vec<_> = records.iter().map(|r| r["a"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_non_array_documents() {
        assert!(matches!(collect(r#"{"a":1}"#), Err(FileError::Json(_))));
        assert!(matches!(collect(r#"[{"a":1},"#), Err(FileError::Json(_))));
    }

    #[test]
    fn callback_error_stops_the_stream() {
        let mut calls = 0;
        let result = for_each_record(Cursor::new("[1,2,3]"), |_| {
            calls += 1;
            Err(FileError::Rejected("stop".into()))
        });
        assert!(matches!(result, Err(FileError::Rejected(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_byte_file_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, b"").unwrap();

        let count = read_json_file(&path, |_| Ok(())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json_file(&dir.path().join("absent.json"), |_| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn writer_output_reads_back() {
        let mut out = Vec::new();
        let mut writer = JsonArrayWriter::new(&mut out);
        writer.write_record(&json!({"name": "a"})).unwrap();
        writer.write_record(&json!({"name": "b"})).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["name"], "b");
    }

    #[test]
    fn writer_without_records_emits_empty_array() {
        let mut out = Vec::new();
        let writer = JsonArrayWriter::new(&mut out);
        assert_eq!(writer.finish().unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }
}

//! Blocking per-file anonymization. Output goes to a `.part` sibling that is
//! renamed into place only after the last record is written.

use crate::{
    anonymize::{Anonymizer, Classification},
    error::TransformError,
};
use connectors::file::{
    csv::open_reader,
    json::{JsonArrayWriter, read_json_file},
    part_path,
};
use rand::Rng;
use std::{fs::File, io::BufWriter, path::Path};

/// Records between two progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 10_000;

pub fn anonymize_json_file<R: Rng>(
    anonymizer: &mut Anonymizer<R>,
    input: &Path,
    output: &Path,
    on_progress: impl FnMut(u64),
) -> Result<u64, TransformError> {
    commit(output, write_json(anonymizer, input, output, on_progress))
}

pub fn anonymize_csv_file<R: Rng>(
    anonymizer: &mut Anonymizer<R>,
    input: &Path,
    output: &Path,
    on_progress: impl FnMut(u64),
) -> Result<u64, TransformError> {
    commit(output, write_csv(anonymizer, input, output, on_progress))
}

fn write_json<R: Rng>(
    anonymizer: &mut Anonymizer<R>,
    input: &Path,
    output: &Path,
    mut on_progress: impl FnMut(u64),
) -> Result<u64, TransformError> {
    let mut writer = JsonArrayWriter::new(BufWriter::new(File::create(part_path(output))?));
    let mut seen = 0u64;

    read_json_file(input, |record| {
        writer.write_record(&anonymizer.anonymize_record(record))?;
        seen += 1;
        if seen % PROGRESS_INTERVAL == 0 {
            on_progress(seen);
        }
        Ok(())
    })?;

    Ok(writer.finish()?)
}

fn write_csv<R: Rng>(
    anonymizer: &mut Anonymizer<R>,
    input: &Path,
    output: &Path,
    mut on_progress: impl FnMut(u64),
) -> Result<u64, TransformError> {
    let mut reader = open_reader(input)?;
    let headers = reader.headers()?.clone();
    let mut writer = csv::Writer::from_path(part_path(output))?;

    if headers.is_empty() {
        writer.flush()?;
        return Ok(0);
    }

    // Columns are classified once; every row reuses the header decisions.
    let classes: Vec<Classification> = headers
        .iter()
        .map(|header| anonymizer.classifier().classify(header))
        .collect();
    writer.write_record(&headers)?;

    let mut seen = 0u64;
    for row in reader.records() {
        let row = row?;
        let cells: Vec<String> = row
            .iter()
            .zip(&classes)
            .map(|(cell, class)| anonymizer.anonymize_cell(cell, *class))
            .collect();
        writer.write_record(&cells)?;

        seen += 1;
        if seen % PROGRESS_INTERVAL == 0 {
            on_progress(seen);
        }
    }

    writer.flush()?;
    Ok(seen)
}

fn commit(output: &Path, written: Result<u64, TransformError>) -> Result<u64, TransformError> {
    let part = part_path(output);
    match written {
        Ok(count) => {
            std::fs::rename(&part, output)?;
            Ok(count)
        }
        Err(err) => {
            let _ = std::fs::remove_file(&part);
            Err(err)
        }
    }
}

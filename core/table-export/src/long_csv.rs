//! FILENAME: core/table-export/src/long_csv.rs
//! Long-format CSV loading.
//!
//! The first row names the fields; every following row is one record. Field
//! types are inferred per cell: empty is Null, then integer, float, ISO date,
//! and anything else is text.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use records::{parse_date, RecordError, RecordSet, Scalar};

use crate::error::ExportError;

/// Reads a long-format CSV (header row required) into a record set.
pub fn read_long_csv<R: Read>(reader: R) -> Result<RecordSet, ExportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        // Headers are handled here so a missing header is a typed error.
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = csv_reader.records();
    let header = match rows.next() {
        Some(header) => header?,
        None => return Err(ExportError::EmptyInput),
    };
    let fields: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let mut set = RecordSet::with_fields(fields.iter().cloned());
    for (row, result) in rows.enumerate() {
        let record = result?;
        if record.len() > fields.len() {
            return Err(RecordError::InvalidRecord {
                row: row as u32,
                reason: format!(
                    "{} fields but the header names {}",
                    record.len(),
                    fields.len()
                ),
            }
            .into());
        }
        set.push(
            fields
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.as_str(), infer_scalar(cell))),
        );
    }

    log::debug!(
        target: "EXPORT",
        "read {} long-format records with {} fields",
        set.len(),
        fields.len()
    );
    Ok(set)
}

/// Opens and reads a long-format CSV file.
pub fn read_long_csv_file(path: impl AsRef<Path>) -> Result<RecordSet, ExportError> {
    let file = File::open(path.as_ref())?;
    let set = read_long_csv(BufReader::new(file))?;
    log::info!(
        target: "EXPORT",
        "loaded {} records from {}",
        set.len(),
        path.as_ref().display()
    );
    Ok(set)
}

/// Infers the scalar a CSV cell denotes.
pub fn infer_scalar(cell: &str) -> Scalar {
    let text = cell.trim();
    if text.is_empty() {
        return Scalar::Null;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Scalar::Integer(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        // "nan" / "inf" spellings stay text
        if f.is_finite() {
            return Scalar::number(f);
        }
    }
    if let Some(date) = parse_date(text) {
        return Scalar::Date(date);
    }
    Scalar::text(cell)
}

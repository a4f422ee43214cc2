//! FILENAME: core/table-export/src/wide_csv.rs
//! Wide Table CSV - Multi-level header layout.
//!
//! With column or metadata fields the header is stacked:
//! 1. the value level, preceded by one empty cell per row-label column
//! 2. one row per column field, then per metadata field, its name first
//! 3. the row-field names, followed by empty cells
//!
//! Without them, or when the table has no columns at all, a single header
//! row carries the row-field names and the value-level names. Absent cells
//! and nulls are written as empty fields; a line holding one empty field
//! (a null single-field row key with no columns) comes out as `""`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pivot_engine::WideTable;
use records::Scalar;

use crate::error::ExportError;

/// Writes `table` as CSV with `\n` line endings.
pub fn write_wide_csv<W: Write>(table: &WideTable, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let label_width = table.row_fields().len().max(1);
    let columns = table.column_count();
    let stacked =
        columns > 0 && (!table.column_fields().is_empty() || !table.metadata_fields().is_empty());

    let mut line: Vec<String> = Vec::with_capacity(label_width + columns);
    let mut header_rows = 1;

    if stacked {
        let levels = table.header_levels();
        header_rows += levels.len();
        for level in levels {
            line.clear();
            match &level.name {
                Some(name) => line.push(name.clone()),
                None => line.push(String::new()),
            }
            line.resize(label_width, String::new());
            line.extend(level.labels.iter().map(render));
            csv_writer.write_record(&line)?;
        }

        line.clear();
        line.extend(table.row_fields().iter().cloned());
        line.resize(label_width + columns, String::new());
        csv_writer.write_record(&line)?;
    } else {
        line.clear();
        line.extend(table.row_fields().iter().cloned());
        line.resize(label_width, String::new());
        line.extend(table.column_keys().iter().map(|c| c.value_field.clone()));
        csv_writer.write_record(&line)?;
    }

    for (row, key) in table.row_keys().iter().enumerate() {
        line.clear();
        line.extend(key.parts().iter().map(render));
        line.resize(label_width, String::new());
        line.extend(table.row(row).map(|cell| cell.map(render).unwrap_or_default()));
        csv_writer.write_record(&line)?;
    }

    csv_writer.flush()?;
    log::debug!(
        target: "EXPORT",
        "wrote CSV: {} header rows, {} data rows, {} columns",
        header_rows,
        table.row_count(),
        label_width + columns
    );
    Ok(())
}

/// Renders `table` to an in-memory CSV string.
pub fn wide_to_csv_string(table: &WideTable) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_wide_csv(table, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Writes `table` to a CSV file at `path`.
pub fn write_wide_csv_file(table: &WideTable, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let file = File::create(path.as_ref())?;
    write_wide_csv(table, BufWriter::new(file))?;
    log::info!(target: "EXPORT", "saved wide table to {}", path.as_ref().display());
    Ok(())
}

fn render(value: &Scalar) -> String {
    value.to_string()
}

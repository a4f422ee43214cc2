//! FILENAME: core/table-export/src/lib.rs
//! PURPOSE: Text serializations around the reshape engine.
//! CONTEXT: Renders wide tables as multi-level-header CSV, unstacked series
//! datasets as JSON, and loads long-format CSV into a `RecordSet`.

pub mod error;
pub mod json;
pub mod long_csv;
pub mod wide_csv;

pub use error::ExportError;
pub use json::{datasets_to_json, write_datasets_json};
pub use long_csv::{infer_scalar, read_long_csv, read_long_csv_file};
pub use wide_csv::{wide_to_csv_string, write_wide_csv, write_wide_csv_file};

//! FILENAME: core/table-export/src/error.rs

use thiserror::Error;

use records::RecordError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record error: {0}")]
    Records(#[from] RecordError),

    #[error("CSV input has no header row")]
    EmptyInput,

    #[error("Output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

//! FILENAME: core/records/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid record at row {row}: {reason}")]
    InvalidRecord { row: u32, reason: String },
}

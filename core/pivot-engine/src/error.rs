//! FILENAME: core/pivot-engine/src/error.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use records::{CompositeKey, RecordError, Scalar};

use crate::view::ColumnKey;

/// The role a configured field plays in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRole {
    Row,
    Column,
    Value,
    Metadata,
    ValueLabel,
    Series,
    Time,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldRole::Row => "row",
            FieldRole::Column => "column",
            FieldRole::Value => "value",
            FieldRole::Metadata => "metadata",
            FieldRole::ValueLabel => "value label",
            FieldRole::Series => "series",
            FieldRole::Time => "time",
        })
    }
}

/// Fatal failures of a pivot or aggregate request.
#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error(
        "Duplicate key: row {row_key} column {column_key} is supplied by records \
         {first_record} ({first_value:?}) and {second_record} ({second_value:?})"
    )]
    DuplicateKey {
        row_key: CompositeKey,
        column_key: ColumnKey,
        first_record: u32,
        second_record: u32,
        first_value: Scalar,
        second_value: Scalar,
    },

    #[error(
        "Metadata conflict: column {column_key} has {fields:?} = {first} (record {first_record}) \
         and {second} (record {second_record})"
    )]
    MetadataConflict {
        column_key: String,
        fields: Vec<String>,
        first: CompositeKey,
        second: CompositeKey,
        first_record: u32,
        second_record: u32,
    },

    #[error("Invalid field: {role} field '{field}' does not exist on any record")]
    InvalidField { role: FieldRole, field: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Oversized result: {rows} rows x {columns} columns = {cells} cells exceeds the limit of {limit}"
    )]
    OversizedResult {
        rows: usize,
        columns: usize,
        cells: u128,
        limit: usize,
    },

    #[error("Record error: {0}")]
    Records(#[from] RecordError),
}

impl ReshapeError {
    /// Both kinds of conflicting-input errors.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            ReshapeError::DuplicateKey { .. } | ReshapeError::MetadataConflict { .. }
        )
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Why a record was left out of (part of) an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The time field is missing or cannot be read as a date.
    UnparseableTime { field: String },
    /// The value field is null for this record.
    NullValue { field: String },
    /// The value field holds something that is not a number.
    NonNumericValue { field: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnparseableTime { field } => {
                write!(f, "time field '{}' is missing or not a date", field)
            }
            SkipReason::NullValue { field } => write!(f, "value field '{}' is null", field),
            SkipReason::NonNumericValue { field } => {
                write!(f, "value field '{}' is not numeric", field)
            }
        }
    }
}

/// Non-fatal: a record excluded from a grouping, returned for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub source_row: u32,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} skipped: {}", self.source_row, self.reason)
    }
}

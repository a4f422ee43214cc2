//! FILENAME: core/pivot-engine/src/lib.rs
//! Reshape subsystem: long-to-wide pivots and grouped boxplot aggregation.
//!
//! This crate turns a `records::RecordSet` (one observation per record) into
//! a wide table or a set of per-group statistics. It knows nothing about file
//! formats; serializers live in `table-export`.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the request IS)
//! - `engine`: Pivot calculation (HOW long records become wide rows)
//! - `aggregate`: Grouped boxplot statistics (HOW groups are summarised)
//! - `stats`: Quartile and whisker arithmetic
//! - `view`: The wide table handed to serializers (WHAT we output)
//! - `error`: Fatal errors and non-fatal skip warnings

pub mod aggregate;
pub mod definition;
pub mod engine;
pub mod error;
mod parallel;
pub mod stats;
pub mod view;

pub use aggregate::{aggregate, AggregateCalculator, AggregateResult, FieldStats, GroupSummary};
pub use definition::*;
pub use engine::{calculate_pivot, PivotCalculator};
pub use error::{FieldRole, ReshapeError, SkipReason, SkippedRecord};
pub use stats::{quantile_sorted, BoxplotStat, BoxplotStats, WHISKER_IQR_FACTOR};
pub use view::*;

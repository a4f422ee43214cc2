//! FILENAME: core/records/src/lib.rs
//! PURPOSE: Long-format record model shared by the pivot and aggregation engines.
//! CONTEXT: Re-exports the scalar, record set and key types.

pub mod date;
pub mod error;
pub mod key;
pub mod record;
pub mod scalar;

pub use date::{parse_date, scalar_to_date};
pub use error::RecordError;
pub use key::{extract, CompositeKey, KeyExtractor, KeyParts};
pub use record::{FieldIndex, Record, RecordSet};
pub use scalar::{format_number, OrderedFloat, Scalar};

//! FILENAME: core/records/src/key.rs
//! Composite keys and the extractor that derives them from records.
//!
//! A `CompositeKey` is the ordered tuple of a record's values for a fixed list
//! of fields. Keys compare by value (never by hash or display text), field by
//! field in declared order, so they serve both as map keys and as sort keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::RecordError;
use crate::record::{FieldIndex, Record, RecordSet};
use crate::scalar::Scalar;

/// Most row/column keys have a handful of parts; keep those inline.
pub type KeyParts = SmallVec<[Scalar; 4]>;

// ============================================================================
// COMPOSITE KEY
// ============================================================================

/// An ordered tuple of scalar values, one per key field.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey {
    parts: KeyParts,
}

impl CompositeKey {
    pub fn new(parts: KeyParts) -> Self {
        CompositeKey { parts }
    }

    /// The zero-field key (used when no key fields are configured).
    pub fn empty() -> Self {
        CompositeKey::default()
    }

    pub fn parts(&self) -> &[Scalar] {
        &self.parts
    }

    pub fn get(&self, position: usize) -> Option<&Scalar> {
        self.parts.get(position)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Appends the parts of `other` after this key's parts.
    pub fn concat(&self, other: &CompositeKey) -> CompositeKey {
        let mut parts = self.parts.clone();
        parts.extend(other.parts.iter().cloned());
        CompositeKey { parts }
    }
}

impl FromIterator<Scalar> for CompositeKey {
    fn from_iter<T: IntoIterator<Item = Scalar>>(iter: T) -> Self {
        CompositeKey {
            parts: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match part {
                Scalar::Null => f.write_str("null")?,
                Scalar::Text(s) => write!(f, "{:?}", s)?,
                other => write!(f, "{}", other)?,
            }
        }
        f.write_str(")")
    }
}

// ============================================================================
// KEY EXTRACTOR
// ============================================================================

/// Derives composite keys for a fixed list of fields.
///
/// Field names are resolved against the record set schema once; extraction is
/// then a positional read per field.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    names: Vec<String>,
    indices: SmallVec<[Option<FieldIndex>; 4]>,
}

impl KeyExtractor {
    /// Resolves `fields` against the schema. Fields missing from the schema
    /// are an error.
    pub fn new<S: AsRef<str>>(set: &RecordSet, fields: &[S]) -> Result<Self, RecordError> {
        let mut indices = SmallVec::with_capacity(fields.len());
        for name in fields {
            indices.push(Some(set.require_field(name.as_ref())?));
        }
        Ok(KeyExtractor {
            names: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            indices,
        })
    }

    /// Resolves `fields` against the schema; unknown fields always read Null.
    pub fn lenient<S: AsRef<str>>(set: &RecordSet, fields: &[S]) -> Self {
        KeyExtractor {
            names: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            indices: fields
                .iter()
                .map(|name| set.field_index(name.as_ref()))
                .collect(),
        }
    }

    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Reads the key fields of `record` in declared order (Null when absent).
    pub fn extract(&self, record: &Record) -> CompositeKey {
        self.indices
            .iter()
            .map(|index| match index {
                Some(i) => record.get(*i).clone(),
                None => Scalar::Null,
            })
            .collect()
    }
}

/// One-shot extraction by field names. Unknown fields read as Null.
pub fn extract<S: AsRef<str>>(set: &RecordSet, record: &Record, fields: &[S]) -> CompositeKey {
    fields
        .iter()
        .map(|name| set.value(record, name.as_ref()).clone())
        .collect()
}

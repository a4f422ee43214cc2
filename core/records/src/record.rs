//! FILENAME: core/records/src/record.rs
//! Record Set - The long-format input model.
//!
//! Field names are interned into a shared schema once, and each record stores
//! its values positionally against that schema. Records created before a new
//! field first appeared simply have a shorter value vector; reads past the end
//! yield `Scalar::Null`, so the schema is the union of all fields seen.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::RecordError;
use crate::scalar::Scalar;

/// Index into the record set schema (0-based).
pub type FieldIndex = usize;

static NULL: Scalar = Scalar::Null;

// ============================================================================
// RECORD
// ============================================================================

/// A single long-format observation, stored positionally against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Position of the record in its record set (used in diagnostics).
    pub source_row: u32,

    values: Vec<Scalar>,
}

impl Record {
    /// Value of the field at `index`, or Null when the record does not carry it.
    pub fn get(&self, index: FieldIndex) -> &Scalar {
        self.values.get(index).unwrap_or(&NULL)
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

/// Ordered, read-only (once built) collection of long-format records.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    fields: Vec<String>,
    field_lookup: FxHashMap<String, FieldIndex>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record set with a declared schema.
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in fields {
            set.intern_field(name.into());
        }
        set
    }

    /// Reserves capacity for expected record count.
    pub fn reserve(&mut self, record_count: usize) {
        self.records.reserve(record_count);
    }

    /// Appends a record given as (field name, value) pairs and returns its row id.
    /// A later pair for the same field overwrites an earlier one.
    pub fn push<I, K, V>(&mut self, pairs: I) -> u32
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Scalar>,
    {
        let mut values: Vec<Scalar> = Vec::with_capacity(self.fields.len());
        for (name, value) in pairs {
            let index = self.intern_field(name.as_ref().to_string());
            if values.len() <= index {
                values.resize(index + 1, Scalar::Null);
            }
            values[index] = value.into();
        }

        let source_row = self.records.len() as u32;
        self.records.push(Record { source_row, values });
        source_row
    }

    /// Loads a JSON array of flat objects, one object per record.
    pub fn from_json_str(json: &str) -> Result<Self, RecordError> {
        let rows: Vec<BTreeMap<String, Scalar>> = serde_json::from_str(json)?;
        let mut set = Self::new();
        set.reserve(rows.len());
        for row in rows {
            set.push(row);
        }
        Ok(set)
    }

    fn intern_field(&mut self, name: String) -> FieldIndex {
        if let Some(&index) = self.field_lookup.get(&name) {
            return index;
        }
        let index = self.fields.len();
        self.fields.push(name.clone());
        self.field_lookup.insert(name, index);
        index
    }

    /// Looks up a field by name.
    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.field_lookup.get(name).copied()
    }

    /// Looks up a field by name, failing with `UnknownField`.
    pub fn require_field(&self, name: &str) -> Result<FieldIndex, RecordError> {
        self.field_index(name)
            .ok_or_else(|| RecordError::UnknownField(name.to_string()))
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn has_schema(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Value of a named field on a record; Null if the field is unknown.
    pub fn value<'a>(&self, record: &'a Record, field: &str) -> &'a Scalar {
        match self.field_index(field) {
            Some(index) => record.get(index),
            None => &NULL,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! FILENAME: core/pivot-engine/src/view.rs
//! Wide Table - The abstract output handed to a serializer.
//!
//! A wide table is a sparse matrix keyed by (row key, column key):
//! - Row keys are the sorted, distinct row-field tuples present in the input
//! - Column keys are (value-level name, column-field tuple) pairs, sorted with
//!   the value-level name outermost
//! - Cells hold the source scalar, or nothing when no record supplied the
//!   combination (absent is never confused with a numeric zero)
//!
//! Key vectors are the arena; cells are addressed by their positions in it.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use records::{CompositeKey, Scalar};

// ============================================================================
// COLUMN KEY
// ============================================================================

/// Identity of a wide column: value-level name over a column-field tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    /// Primary sort level. Zero for every column under sorted value order;
    /// the declaration rank of the value field under declared order.
    #[serde(default)]
    rank: u32,

    /// Value-level name (the value field, possibly prefixed with label values).
    pub value_field: String,

    /// Values of the column fields, in declared order.
    pub key: CompositeKey,
}

impl ColumnKey {
    pub fn new(value_field: impl Into<String>, key: CompositeKey) -> Self {
        ColumnKey {
            rank: 0,
            value_field: value_field.into(),
            key,
        }
    }

    pub(crate) fn ranked(rank: u32, value_field: String, key: CompositeKey) -> Self {
        ColumnKey {
            rank,
            value_field,
            key,
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value_field, self.key)
    }
}

// ============================================================================
// HEADER LEVELS / DATASETS
// ============================================================================

/// One row of the column header, outermost first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderLevel {
    /// Field name labelling the level; `None` for the value level.
    pub name: Option<String>,

    /// One label per column.
    pub labels: Vec<Scalar>,
}

/// One column key's worth of data, unstacked back into records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDataset {
    /// Column-field and metadata-field values identifying the series.
    pub attributes: BTreeMap<String, Scalar>,

    /// Row-field values plus every value-level name that has a cell.
    pub data: Vec<BTreeMap<String, Scalar>>,
}

// ============================================================================
// WIDE TABLE
// ============================================================================

/// The pivoted table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    row_fields: Vec<String>,
    column_fields: Vec<String>,
    metadata_fields: Vec<String>,
    row_keys: Vec<CompositeKey>,
    column_keys: Vec<ColumnKey>,
    /// Parallel to `column_keys`; empty keys when no metadata fields.
    column_metadata: Vec<CompositeKey>,
    cells: FxHashMap<(u32, u32), Scalar>,
}

impl WideTable {
    /// Assembles a table from sorted, distinct keys and position-addressed cells.
    pub(crate) fn from_parts(
        row_fields: Vec<String>,
        column_fields: Vec<String>,
        metadata_fields: Vec<String>,
        row_keys: Vec<CompositeKey>,
        column_keys: Vec<ColumnKey>,
        column_metadata: Vec<CompositeKey>,
        cells: FxHashMap<(u32, u32), Scalar>,
    ) -> Self {
        debug_assert!(row_keys.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(column_keys.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(column_keys.len(), column_metadata.len());
        WideTable {
            row_fields,
            column_fields,
            metadata_fields,
            row_keys,
            column_keys,
            column_metadata,
            cells,
        }
    }

    pub fn row_fields(&self) -> &[String] {
        &self.row_fields
    }

    pub fn column_fields(&self) -> &[String] {
        &self.column_fields
    }

    pub fn metadata_fields(&self) -> &[String] {
        &self.metadata_fields
    }

    pub fn row_keys(&self) -> &[CompositeKey] {
        &self.row_keys
    }

    pub fn column_keys(&self) -> &[ColumnKey] {
        &self.column_keys
    }

    /// Metadata values for the column at `col`.
    pub fn column_metadata(&self, col: usize) -> Option<&CompositeKey> {
        self.column_metadata.get(col)
    }

    pub fn row_count(&self) -> usize {
        self.row_keys.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_keys.len()
    }

    /// Number of cells that hold a value.
    pub fn filled_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty() && self.column_keys.is_empty()
    }

    /// The cell at a (row, column) position; `None` means absent.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Scalar> {
        self.cells.get(&(row as u32, col as u32))
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = Option<&Scalar>> + '_ {
        (0..self.column_keys.len()).map(move |col| self.cell(row, col))
    }

    pub fn row_position(&self, key: &CompositeKey) -> Option<usize> {
        self.row_keys.binary_search(key).ok()
    }

    pub fn column_position(&self, value_field: &str, key: &CompositeKey) -> Option<usize> {
        self.column_keys
            .iter()
            .position(|c| c.value_field == value_field && &c.key == key)
    }

    /// Cell lookup by keys instead of positions.
    pub fn lookup(
        &self,
        row_key: &CompositeKey,
        value_field: &str,
        column_key: &CompositeKey,
    ) -> Option<&Scalar> {
        let row = self.row_position(row_key)?;
        let col = self.column_position(value_field, column_key)?;
        self.cell(row, col)
    }

    /// Column header rows: the value level, then one level per column field,
    /// then one per metadata field.
    pub fn header_levels(&self) -> Vec<HeaderLevel> {
        let mut levels = Vec::with_capacity(
            1 + self.column_fields.len() + self.metadata_fields.len(),
        );
        levels.push(HeaderLevel {
            name: None,
            labels: self
                .column_keys
                .iter()
                .map(|c| Scalar::text(c.value_field.clone()))
                .collect(),
        });
        for (i, name) in self.column_fields.iter().enumerate() {
            levels.push(HeaderLevel {
                name: Some(name.clone()),
                labels: self
                    .column_keys
                    .iter()
                    .map(|c| c.key.get(i).cloned().unwrap_or_default())
                    .collect(),
            });
        }
        for (i, name) in self.metadata_fields.iter().enumerate() {
            levels.push(HeaderLevel {
                name: Some(name.clone()),
                labels: self
                    .column_metadata
                    .iter()
                    .map(|m| m.get(i).cloned().unwrap_or_default())
                    .collect(),
            });
        }
        levels
    }

    /// Removes every row that has an absent cell in any column.
    pub fn drop_incomplete_rows(self) -> Self {
        let columns = self.column_keys.len();
        let complete: Vec<bool> = (0..self.row_keys.len())
            .map(|row| (0..columns).all(|col| self.cell(row, col).is_some()))
            .collect();

        let mut remap: Vec<Option<u32>> = Vec::with_capacity(complete.len());
        let mut next = 0u32;
        for &keep in &complete {
            if keep {
                remap.push(Some(next));
                next += 1;
            } else {
                remap.push(None);
            }
        }

        let row_keys = self
            .row_keys
            .into_iter()
            .zip(&complete)
            .filter_map(|(key, &keep)| keep.then_some(key))
            .collect();
        let cells = self
            .cells
            .into_iter()
            .filter_map(|((row, col), value)| {
                remap[row as usize].map(|new_row| ((new_row, col), value))
            })
            .collect();

        WideTable {
            row_keys,
            cells,
            ..self
        }
    }

    /// Unstacks the table into one dataset per distinct column-field tuple.
    /// Data rows without any cell for that tuple are omitted.
    pub fn series_datasets(&self) -> Vec<SeriesDataset> {
        let mut by_series: BTreeMap<&CompositeKey, Vec<usize>> = BTreeMap::new();
        for (col, column) in self.column_keys.iter().enumerate() {
            by_series.entry(&column.key).or_default().push(col);
        }

        by_series
            .into_iter()
            .map(|(series, cols)| {
                let mut attributes = BTreeMap::new();
                for (name, value) in self.column_fields.iter().zip(series.parts()) {
                    attributes.insert(name.clone(), value.clone());
                }
                if let Some(metadata) = self.column_metadata.get(cols[0]) {
                    for (name, value) in self.metadata_fields.iter().zip(metadata.parts()) {
                        attributes.insert(name.clone(), value.clone());
                    }
                }

                let mut data = Vec::new();
                for (row, row_key) in self.row_keys.iter().enumerate() {
                    let mut entry: BTreeMap<String, Scalar> = BTreeMap::new();
                    for &col in &cols {
                        if let Some(value) = self.cell(row, col) {
                            entry.insert(self.column_keys[col].value_field.clone(), value.clone());
                        }
                    }
                    if entry.is_empty() {
                        continue;
                    }
                    for (name, value) in self.row_fields.iter().zip(row_key.parts()) {
                        entry.insert(name.clone(), value.clone());
                    }
                    data.push(entry);
                }

                SeriesDataset { attributes, data }
            })
            .collect()
    }
}

//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - Reshapes long-format records into a wide table.
//!
//! This module takes a PivotDefinition (configuration) and a RecordSet (data)
//! and produces a WideTable (sparse matrix ready for serialization).
//!
//! Algorithm:
//! 1. Validate the definition and resolve every field against the schema
//! 2. Derive row key, column keys and cells per record (partitioned for large
//!    inputs), rejecting conflicting cells and inconsistent column metadata
//! 3. Sort the distinct row and column keys and check the cell bound
//! 4. Address cells by key position and assemble the WideTable
//! 5. Optionally drop rows that are not fully populated

use rustc_hash::{FxHashMap, FxHashSet};

use records::{CompositeKey, FieldIndex, KeyExtractor, Record, RecordSet, Scalar};

use crate::definition::{EngineConfig, PivotDefinition, ValueOrder};
use crate::error::{FieldRole, ReshapeError};
use crate::parallel::{partitioned, Mergeable};
use crate::view::{ColumnKey, WideTable};

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// A cell value together with the record that supplied it.
#[derive(Debug, Clone)]
struct CellSlot {
    value: Scalar,
    source_row: u32,
}

/// Column metadata together with the record it was first observed on.
#[derive(Debug, Clone)]
struct MetadataSlot {
    values: CompositeKey,
    source_row: u32,
}

/// Keys and cells collected from one partition of the input.
#[derive(Debug, Default)]
struct PivotAccumulator {
    row_keys: FxHashSet<CompositeKey>,
    cells: FxHashMap<(CompositeKey, ColumnKey), CellSlot>,
    metadata: FxHashMap<ColumnKey, MetadataSlot>,
}

impl PivotAccumulator {
    fn insert_cell(
        &mut self,
        row_key: CompositeKey,
        column_key: ColumnKey,
        slot: CellSlot,
    ) -> Result<(), ReshapeError> {
        use std::collections::hash_map::Entry;

        match self.cells.entry((row_key, column_key)) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
                Ok(())
            }
            Entry::Occupied(entry) => {
                let existing = entry.get();
                // Identical values from two records are the same observation.
                if existing.value == slot.value {
                    return Ok(());
                }
                let ((row_key, column_key), existing) = entry.remove_entry();
                let (first, second) = ordered(existing, slot, |s| s.source_row);
                Err(ReshapeError::DuplicateKey {
                    row_key,
                    column_key,
                    first_record: first.source_row,
                    second_record: second.source_row,
                    first_value: first.value,
                    second_value: second.value,
                })
            }
        }
    }

    fn insert_metadata(
        &mut self,
        fields: &[String],
        column_key: ColumnKey,
        slot: MetadataSlot,
    ) -> Result<(), ReshapeError> {
        use std::collections::hash_map::Entry;

        match self.metadata.entry(column_key) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
                Ok(())
            }
            Entry::Occupied(entry) => {
                if entry.get().values == slot.values {
                    return Ok(());
                }
                let (column_key, existing) = entry.remove_entry();
                let (first, second) = ordered(existing, slot, |s| s.source_row);
                Err(ReshapeError::MetadataConflict {
                    column_key: column_key.to_string(),
                    fields: fields.to_vec(),
                    first: first.values,
                    second: second.values,
                    first_record: first.source_row,
                    second_record: second.source_row,
                })
            }
        }
    }
}

/// Orders two conflicting slots by source record for stable diagnostics.
fn ordered<S>(a: S, b: S, row: impl Fn(&S) -> u32) -> (S, S) {
    if row(&a) <= row(&b) {
        (a, b)
    } else {
        (b, a)
    }
}

/// Partials are merged under the same conflict rules as single insertions,
/// so a collision spanning two partitions is still reported.
struct PivotPartial {
    accumulator: PivotAccumulator,
    metadata_fields: Vec<String>,
}

impl Mergeable for PivotPartial {
    type Error = ReshapeError;

    fn merge(mut self, other: Self) -> Result<Self, Self::Error> {
        // Fold the smaller partial into the larger one.
        let (mut into, from) = if self.accumulator.cells.len() >= other.accumulator.cells.len() {
            (self.accumulator, other.accumulator)
        } else {
            (other.accumulator, self.accumulator)
        };

        into.row_keys.extend(from.row_keys);
        for (column_key, slot) in from.metadata {
            into.insert_metadata(&self.metadata_fields, column_key, slot)?;
        }
        for ((row_key, column_key), slot) in from.cells {
            into.insert_cell(row_key, column_key, slot)?;
        }

        self.accumulator = into;
        Ok(self)
    }
}

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// A value field resolved against the schema.
#[derive(Debug, Clone)]
struct ValueColumn {
    name: String,
    index: FieldIndex,
    rank: u32,
}

/// The main calculation engine for pivots.
pub struct PivotCalculator<'a> {
    definition: &'a PivotDefinition,
    config: &'a EngineConfig,
    records: &'a RecordSet,

    row_extractor: KeyExtractor,
    column_extractor: KeyExtractor,
    label_extractor: KeyExtractor,
    metadata_extractor: KeyExtractor,
    value_columns: Vec<ValueColumn>,
}

impl<'a> PivotCalculator<'a> {
    /// Validates the definition and resolves its fields.
    /// Nothing is computed until `calculate`.
    pub fn new(
        definition: &'a PivotDefinition,
        records: &'a RecordSet,
        config: &'a EngineConfig,
    ) -> Result<Self, ReshapeError> {
        definition.validate()?;

        if records.has_schema() {
            check_schema(records, definition.fields_by_role())?;
        }

        // Schema is either empty (no records, no declared fields) or verified
        // above, so lenient resolution only ever reads Null for empty input.
        let value_columns = definition
            .value_fields
            .iter()
            .enumerate()
            .filter_map(|(rank, name)| {
                records.field_index(name).map(|index| ValueColumn {
                    name: name.clone(),
                    index,
                    rank: match definition.value_order {
                        ValueOrder::Sorted => 0,
                        ValueOrder::Declared => rank as u32,
                    },
                })
            })
            .collect();

        Ok(PivotCalculator {
            definition,
            config,
            records,
            row_extractor: KeyExtractor::lenient(records, &definition.row_fields),
            column_extractor: KeyExtractor::lenient(records, &definition.column_fields),
            label_extractor: KeyExtractor::lenient(records, &definition.value_label_fields),
            metadata_extractor: KeyExtractor::lenient(records, &definition.metadata_fields),
            value_columns,
        })
    }

    /// Executes the full calculation and returns the wide table.
    pub fn calculate(&self) -> Result<WideTable, ReshapeError> {
        log::debug!(
            target: "PIVOT",
            "pivot rows={:?} columns={:?} values={:?} over {} records",
            self.definition.row_fields,
            self.definition.column_fields,
            self.definition.value_fields,
            self.records.len()
        );

        // Step 1: Derive keys and cells, partitioned for large inputs
        let partial = partitioned(
            self.records.records(),
            self.config.parallel_threshold,
            |chunk| self.accumulate(chunk),
        )?;

        // Step 2: Sort keys, bound the result and address cells by position
        let table = self.finalize(partial.accumulator)?;

        // Step 3: Scatter-style layouts keep only fully populated rows
        let table = if self.definition.drop_incomplete_rows {
            table.drop_incomplete_rows()
        } else {
            table
        };

        log::info!(
            target: "PIVOT",
            "pivot produced {} rows x {} columns ({} filled cells)",
            table.row_count(),
            table.column_count(),
            table.filled_cells()
        );
        Ok(table)
    }

    fn accumulate(&self, chunk: &[Record]) -> Result<PivotPartial, ReshapeError> {
        let mut accumulator = PivotAccumulator::default();
        for record in chunk {
            self.add_record(&mut accumulator, record)?;
        }
        Ok(PivotPartial {
            accumulator,
            metadata_fields: self.definition.metadata_fields.clone(),
        })
    }

    /// Adds one record's row key, column keys, cells and column metadata.
    fn add_record(
        &self,
        accumulator: &mut PivotAccumulator,
        record: &Record,
    ) -> Result<(), ReshapeError> {
        let row_key = self.row_extractor.extract(record);
        if !accumulator.row_keys.contains(&row_key) {
            accumulator.row_keys.insert(row_key.clone());
        }

        let column_tuple = self.column_extractor.extract(record);
        let label_prefix = self.label_prefix(record);
        let metadata = if self.definition.metadata_fields.is_empty() {
            None
        } else {
            Some(self.metadata_extractor.extract(record))
        };

        for column in &self.value_columns {
            let value = record.get(column.index);
            if value.is_null() {
                continue;
            }

            let value_name = match &label_prefix {
                Some(prefix) => format!("{}{}", prefix, column.name),
                None => column.name.clone(),
            };
            let column_key = ColumnKey::ranked(column.rank, value_name, column_tuple.clone());

            if let Some(values) = &metadata {
                accumulator.insert_metadata(
                    &self.definition.metadata_fields,
                    column_key.clone(),
                    MetadataSlot {
                        values: values.clone(),
                        source_row: record.source_row,
                    },
                )?;
            }

            accumulator.insert_cell(
                row_key.clone(),
                column_key,
                CellSlot {
                    value: value.clone(),
                    source_row: record.source_row,
                },
            )?;
        }

        Ok(())
    }

    /// `"<label1>-<label2>-"` for the value-label fields, if any.
    fn label_prefix(&self, record: &Record) -> Option<String> {
        if self.definition.value_label_fields.is_empty() {
            return None;
        }
        let labels = self.label_extractor.extract(record);
        let mut prefix = String::new();
        for part in labels.parts() {
            prefix.push_str(&part.to_string());
            prefix.push('-');
        }
        Some(prefix)
    }

    /// Sorts keys, enforces the cell bound and builds the positional table.
    fn finalize(&self, accumulator: PivotAccumulator) -> Result<WideTable, ReshapeError> {
        let PivotAccumulator {
            row_keys,
            cells,
            mut metadata,
        } = accumulator;

        let mut row_keys: Vec<CompositeKey> = row_keys.into_iter().collect();
        row_keys.sort_unstable();

        let column_set: FxHashSet<&ColumnKey> = cells.keys().map(|(_, c)| c).collect();
        let mut column_keys: Vec<ColumnKey> = column_set.into_iter().cloned().collect();
        column_keys.sort_unstable();

        let total = row_keys.len() as u128 * column_keys.len() as u128;
        log::debug!(
            target: "PIVOT",
            "distinct keys: {} rows x {} columns",
            row_keys.len(),
            column_keys.len()
        );
        if total > self.config.max_cells as u128 {
            return Err(ReshapeError::OversizedResult {
                rows: row_keys.len(),
                columns: column_keys.len(),
                cells: total,
                limit: self.config.max_cells,
            });
        }

        let row_positions: FxHashMap<&CompositeKey, u32> = row_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k, i as u32))
            .collect();
        let column_positions: FxHashMap<&ColumnKey, u32> = column_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k, i as u32))
            .collect();

        let mut positioned: FxHashMap<(u32, u32), Scalar> = FxHashMap::default();
        positioned.reserve(cells.len());
        for ((row_key, column_key), slot) in cells {
            // Every cell key was collected above.
            if let (Some(&row), Some(&col)) =
                (row_positions.get(&row_key), column_positions.get(&column_key))
            {
                positioned.insert((row, col), slot.value);
            }
        }

        let metadata_arity = self.definition.metadata_fields.len();
        let column_metadata = column_keys
            .iter()
            .map(|c| match metadata.remove(c) {
                Some(slot) => slot.values,
                None => std::iter::repeat(Scalar::Null).take(metadata_arity).collect(),
            })
            .collect();

        Ok(WideTable::from_parts(
            self.definition.row_fields.clone(),
            self.definition.column_fields.clone(),
            self.definition.metadata_fields.clone(),
            row_keys,
            column_keys,
            column_metadata,
            positioned,
        ))
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Pivots `records` according to `definition`.
/// This is the main entry point for the pivot engine.
pub fn calculate_pivot(
    records: &RecordSet,
    definition: &PivotDefinition,
    config: &EngineConfig,
) -> Result<WideTable, ReshapeError> {
    PivotCalculator::new(definition, records, config)?.calculate()
}

/// Fails with `InvalidField` for the first field the schema does not know.
pub(crate) fn check_schema<'d>(
    records: &RecordSet,
    mut fields: impl Iterator<Item = (FieldRole, &'d str)>,
) -> Result<(), ReshapeError> {
    match fields.find(|(_, field)| records.field_index(field).is_none()) {
        Some((role, field)) => Err(ReshapeError::InvalidField {
            role,
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

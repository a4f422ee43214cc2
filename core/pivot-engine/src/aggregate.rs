//! FILENAME: core/pivot-engine/src/aggregate.rs
//! Grouped Aggregation - Boxplot summaries per series and time bucket.
//!
//! Records are grouped by their series key (the series-field tuple) extended
//! with zero, one or two time-bucket components derived from the time field.
//! Each group collects the numeric values of every value field and reduces them
//! to `BoxplotStats`. Records that cannot contribute are reported as warnings
//! rather than failing the request.

use std::collections::BTreeSet;

use chrono::Datelike;
use rustc_hash::FxHashMap;
use serde::Serialize;

use records::{scalar_to_date, CompositeKey, FieldIndex, KeyExtractor, Record, RecordSet, Scalar};

use crate::definition::{AggregateDefinition, EngineConfig, MonthBucket, TimeBucket};
use crate::engine::check_schema;
use crate::error::{ReshapeError, SkipReason, SkippedRecord};
use crate::parallel::{partitioned, Mergeable};
use crate::stats::{BoxplotStat, BoxplotStats};
use crate::view::{ColumnKey, WideTable};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Statistics of one value field within a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub value_field: String,
    pub stats: BoxplotStats,
}

/// One group: its identity, carried metadata and per-field statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Series key followed by bucket key.
    pub key: CompositeKey,
    pub series_key: CompositeKey,
    pub bucket_key: CompositeKey,
    /// Metadata of the group's series (empty when not grouped by series).
    pub metadata: CompositeKey,
    /// Only value fields with at least one numeric value appear.
    pub stats: Vec<FieldStats>,
}

impl GroupSummary {
    pub fn field(&self, value_field: &str) -> Option<&BoxplotStats> {
        self.stats
            .iter()
            .find(|s| s.value_field == value_field)
            .map(|s| &s.stats)
    }
}

/// All groups of an aggregation, in ascending group-key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub series_fields: Vec<String>,
    pub bucket_fields: Vec<String>,
    pub metadata_fields: Vec<String>,
    pub value_fields: Vec<String>,
    pub groups: Vec<GroupSummary>,
    /// Records left out of a group, ordered by source row.
    pub warnings: Vec<SkippedRecord>,
}

impl AggregateResult {
    pub fn group(&self, series_key: &CompositeKey, bucket_key: &CompositeKey) -> Option<&GroupSummary> {
        self.groups
            .iter()
            .find(|g| &g.series_key == series_key && &g.bucket_key == bucket_key)
    }

    /// Lays the statistics out as a wide table.
    ///
    /// Rows are the bucket keys (a single empty-key row when not bucketed).
    /// Columns are `<value field>-<stat>` over the series key, in value field
    /// then statistic order; series metadata becomes column metadata.
    pub fn to_wide_table(&self) -> WideTable {
        let stat_count = BoxplotStat::ALL.len() as u32;

        let row_keys: Vec<CompositeKey> = self
            .groups
            .iter()
            .map(|g| g.bucket_key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns: FxHashMap<ColumnKey, CompositeKey> = FxHashMap::default();
        let mut placed: Vec<(usize, ColumnKey, Scalar)> = Vec::new();
        for group in &self.groups {
            let row = row_keys.binary_search(&group.bucket_key).unwrap_or_default();
            for field_stats in &group.stats {
                let field_rank = self
                    .value_fields
                    .iter()
                    .position(|f| *f == field_stats.value_field)
                    .unwrap_or_default() as u32;
                for (stat_rank, stat) in BoxplotStat::ALL.iter().enumerate() {
                    let column = ColumnKey::ranked(
                        field_rank * stat_count + stat_rank as u32,
                        format!("{}-{}", field_stats.value_field, stat.label()),
                        group.series_key.clone(),
                    );
                    columns
                        .entry(column.clone())
                        .or_insert_with(|| group.metadata.clone());
                    placed.push((row, column, field_stats.stats.scalar(*stat)));
                }
            }
        }

        let mut column_keys: Vec<ColumnKey> = columns.keys().cloned().collect();
        column_keys.sort_unstable();
        let column_positions: FxHashMap<&ColumnKey, u32> = column_keys
            .iter()
            .enumerate()
            .map(|(i, c)| (c, i as u32))
            .collect();

        let mut cells = FxHashMap::default();
        for (row, column, value) in placed {
            if let Some(&col) = column_positions.get(&column) {
                cells.insert((row as u32, col), value);
            }
        }

        let column_metadata = column_keys
            .iter()
            .map(|c| columns.get(c).cloned().unwrap_or_default())
            .collect();

        WideTable::from_parts(
            self.bucket_fields.clone(),
            self.series_fields.clone(),
            self.metadata_fields.clone(),
            row_keys,
            column_keys,
            column_metadata,
            cells,
        )
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Values collected for one group, one vector per value field.
#[derive(Debug, Default)]
struct GroupValues {
    per_field: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
struct SeriesMetadata {
    values: CompositeKey,
    source_row: u32,
}

struct AggregatePartial {
    groups: FxHashMap<(CompositeKey, CompositeKey), GroupValues>,
    metadata: FxHashMap<CompositeKey, SeriesMetadata>,
    warnings: Vec<SkippedRecord>,
    metadata_fields: Vec<String>,
}

impl AggregatePartial {
    fn new(metadata_fields: &[String]) -> Self {
        AggregatePartial {
            groups: FxHashMap::default(),
            metadata: FxHashMap::default(),
            warnings: Vec::new(),
            metadata_fields: metadata_fields.to_vec(),
        }
    }

    fn record_metadata(
        &mut self,
        series_key: CompositeKey,
        incoming: SeriesMetadata,
    ) -> Result<(), ReshapeError> {
        use std::collections::hash_map::Entry;

        match self.metadata.entry(series_key) {
            Entry::Vacant(entry) => {
                entry.insert(incoming);
                Ok(())
            }
            Entry::Occupied(entry) => {
                if entry.get().values == incoming.values {
                    return Ok(());
                }
                let (series_key, existing) = entry.remove_entry();
                let (first, second) = if existing.source_row <= incoming.source_row {
                    (existing, incoming)
                } else {
                    (incoming, existing)
                };
                Err(ReshapeError::MetadataConflict {
                    column_key: series_key.to_string(),
                    fields: self.metadata_fields.clone(),
                    first: first.values,
                    second: second.values,
                    first_record: first.source_row,
                    second_record: second.source_row,
                })
            }
        }
    }
}

impl Mergeable for AggregatePartial {
    type Error = ReshapeError;

    fn merge(mut self, other: Self) -> Result<Self, Self::Error> {
        for (series_key, incoming) in other.metadata {
            self.record_metadata(series_key, incoming)?;
        }
        for (key, values) in other.groups {
            let target = self.groups.entry(key).or_default();
            if target.per_field.len() < values.per_field.len() {
                target.per_field.resize_with(values.per_field.len(), Vec::new);
            }
            for (into, from) in target.per_field.iter_mut().zip(values.per_field) {
                into.extend(from);
            }
        }
        self.warnings.extend(other.warnings);
        Ok(self)
    }
}

// ============================================================================
// AGGREGATE CALCULATOR
// ============================================================================

/// Computes grouped boxplot statistics.
pub struct AggregateCalculator<'a> {
    definition: &'a AggregateDefinition,
    config: &'a EngineConfig,
    records: &'a RecordSet,

    series_extractor: KeyExtractor,
    metadata_extractor: KeyExtractor,
    time_index: Option<FieldIndex>,
    value_indices: Vec<Option<FieldIndex>>,
}

impl<'a> AggregateCalculator<'a> {
    pub fn new(
        definition: &'a AggregateDefinition,
        records: &'a RecordSet,
        config: &'a EngineConfig,
    ) -> Result<Self, ReshapeError> {
        definition.validate()?;
        if records.has_schema() {
            check_schema(records, definition.fields_by_role())?;
        }

        let time_index = match definition.group.time_bucket() {
            TimeBucket::None => None,
            _ => definition
                .time_field
                .as_deref()
                .and_then(|f| records.field_index(f)),
        };

        Ok(AggregateCalculator {
            definition,
            config,
            records,
            series_extractor: KeyExtractor::lenient(records, definition.effective_series_fields()),
            metadata_extractor: KeyExtractor::lenient(
                records,
                definition.effective_metadata_fields(),
            ),
            time_index,
            value_indices: definition
                .value_fields
                .iter()
                .map(|f| records.field_index(f))
                .collect(),
        })
    }

    pub fn calculate(&self) -> Result<AggregateResult, ReshapeError> {
        log::debug!(
            target: "AGGREGATE",
            "aggregate series={:?} values={:?} group={} over {} records",
            self.definition.effective_series_fields(),
            self.definition.value_fields,
            self.definition.group,
            self.records.len()
        );

        let partial = partitioned(
            self.records.records(),
            self.config.parallel_threshold,
            |chunk: &[Record]| -> Result<AggregatePartial, ReshapeError> {
                let mut partial =
                    AggregatePartial::new(self.definition.effective_metadata_fields());
                for record in chunk {
                    self.add_record(&mut partial, record)?;
                }
                Ok(partial)
            },
        )?;

        let result = self.finalize(partial);

        for warning in &result.warnings {
            log::warn!(target: "AGGREGATE", "{}", warning);
        }
        log::info!(
            target: "AGGREGATE",
            "aggregate produced {} groups ({} records skipped)",
            result.groups.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    fn add_record(
        &self,
        partial: &mut AggregatePartial,
        record: &Record,
    ) -> Result<(), ReshapeError> {
        let bucket_key = match self.bucket_key(record) {
            Some(key) => key,
            None => {
                partial.warnings.push(SkippedRecord {
                    source_row: record.source_row,
                    reason: SkipReason::UnparseableTime {
                        field: self.definition.time_field.clone().unwrap_or_default(),
                    },
                });
                return Ok(());
            }
        };

        let series_key = self.series_extractor.extract(record);
        if !self.definition.effective_metadata_fields().is_empty() {
            partial.record_metadata(
                series_key.clone(),
                SeriesMetadata {
                    values: self.metadata_extractor.extract(record),
                    source_row: record.source_row,
                },
            )?;
        }

        let field_count = self.value_indices.len();
        for (position, index) in self.value_indices.iter().enumerate() {
            let field = &self.definition.value_fields[position];
            let value = match index {
                Some(i) => record.get(*i),
                None => &Scalar::Null,
            };
            let reason = match value {
                Scalar::Null => SkipReason::NullValue {
                    field: field.clone(),
                },
                Scalar::Number(n) if n.0.is_nan() => SkipReason::NullValue {
                    field: field.clone(),
                },
                Scalar::Integer(_) | Scalar::Number(_) => {
                    if let Some(number) = value.as_f64() {
                        let group = partial
                            .groups
                            .entry((series_key.clone(), bucket_key.clone()))
                            .or_default();
                        if group.per_field.len() < field_count {
                            group.per_field.resize_with(field_count, Vec::new);
                        }
                        group.per_field[position].push(number);
                    }
                    continue;
                }
                Scalar::Text(_) | Scalar::Date(_) => SkipReason::NonNumericValue {
                    field: field.clone(),
                },
            };
            partial.warnings.push(SkippedRecord {
                source_row: record.source_row,
                reason,
            });
        }

        Ok(())
    }

    /// Time-bucket components of a record; `None` when the date is unreadable.
    fn bucket_key(&self, record: &Record) -> Option<CompositeKey> {
        let bucket = self.definition.group.time_bucket();
        if bucket == TimeBucket::None {
            return Some(CompositeKey::empty());
        }

        let date = scalar_to_date(record.get(self.time_index?))?;
        let year = Scalar::Integer(date.year() as i64);
        let month = Scalar::Integer(date.month() as i64);
        Some(match (bucket, self.definition.month_bucket) {
            (TimeBucket::Month, MonthBucket::CalendarMonth) => [month].into_iter().collect(),
            (TimeBucket::Month, MonthBucket::YearMonth) => [year, month].into_iter().collect(),
            _ => [year].into_iter().collect(),
        })
    }

    fn finalize(&self, partial: AggregatePartial) -> AggregateResult {
        let AggregatePartial {
            groups,
            metadata,
            mut warnings,
            ..
        } = partial;

        let metadata_arity = self.definition.effective_metadata_fields().len();
        let mut keyed: Vec<((CompositeKey, CompositeKey), GroupValues)> =
            groups.into_iter().collect();
        keyed.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let groups = keyed
            .into_iter()
            .filter_map(|((series_key, bucket_key), values)| {
                let stats: Vec<FieldStats> = self
                    .definition
                    .value_fields
                    .iter()
                    .zip(values.per_field.iter())
                    .filter_map(|(field, values)| {
                        BoxplotStats::from_values(values).map(|stats| FieldStats {
                            value_field: field.clone(),
                            stats,
                        })
                    })
                    .collect();
                if stats.is_empty() {
                    return None;
                }
                let metadata = match metadata.get(&series_key) {
                    Some(m) => m.values.clone(),
                    None => std::iter::repeat(Scalar::Null).take(metadata_arity).collect(),
                };
                Some(GroupSummary {
                    key: series_key.concat(&bucket_key),
                    series_key,
                    bucket_key,
                    metadata,
                    stats,
                })
            })
            .collect();

        // Stable: a record's warnings keep their value-field order.
        warnings.sort_by_key(|w| w.source_row);

        AggregateResult {
            series_fields: self.definition.effective_series_fields().to_vec(),
            bucket_fields: self
                .definition
                .bucket_field_names()
                .into_iter()
                .map(String::from)
                .collect(),
            metadata_fields: self.definition.effective_metadata_fields().to_vec(),
            value_fields: self.definition.value_fields.clone(),
            groups,
            warnings,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Groups `records` and summarises each group's values.
pub fn aggregate(
    records: &RecordSet,
    definition: &AggregateDefinition,
    config: &EngineConfig,
) -> Result<AggregateResult, ReshapeError> {
    AggregateCalculator::new(definition, records, config)?.calculate()
}

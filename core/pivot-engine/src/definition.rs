//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot / Aggregate Definitions - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a reshape request.
//! These structures are designed to be:
//! - Serializable (so a request layer can build them from JSON or query strings)
//! - Validated once, before any record is touched
//! - Immutable snapshots of caller intent

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FieldRole, ReshapeError};

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Resource bounds and execution tuning shared by all requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest allowed `row_keys x column_keys` cross product for a pivot.
    pub max_cells: usize,

    /// Record count at which pivot/aggregate switch to partitioned execution.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_cells: 10_000_000,
            parallel_threshold: 50_000,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config object; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ReshapeError> {
        serde_json::from_str(json).map_err(|e| ReshapeError::InvalidConfig(e.to_string()))
    }
}

// ============================================================================
// PIVOT DEFINITION
// ============================================================================

/// How value-level column names are ordered in the wide header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueOrder {
    /// Lexicographic by value-level name.
    #[default]
    Sorted,
    /// In `value_fields` declaration order.
    Declared,
}

/// Describes a long-to-wide pivot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotDefinition {
    /// Fields whose value tuple identifies a wide row (required, non-empty).
    pub row_fields: Vec<String>,

    /// Fields nested under the value level of the column header (may be empty).
    pub column_fields: Vec<String>,

    /// Fields whose values fill the cells (required, non-empty).
    pub value_fields: Vec<String>,

    /// Auxiliary per-column attributes; must be consistent within a column.
    pub metadata_fields: Vec<String>,

    /// Fields folded into the value-level name, joined with `-` ahead of the
    /// value field name (e.g. `flow-cfs-value`).
    pub value_label_fields: Vec<String>,

    pub value_order: ValueOrder,

    /// Remove every row that has at least one absent cell.
    pub drop_incomplete_rows: bool,
}

impl PivotDefinition {
    pub fn new<R, C, V>(row_fields: R, column_fields: C, value_fields: V) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        PivotDefinition {
            row_fields: row_fields.into_iter().map(Into::into).collect(),
            column_fields: column_fields.into_iter().map(Into::into).collect(),
            value_fields: value_fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_metadata<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.metadata_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value_labels<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.value_label_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value_order(mut self, order: ValueOrder) -> Self {
        self.value_order = order;
        self
    }

    pub fn dropping_incomplete_rows(mut self) -> Self {
        self.drop_incomplete_rows = true;
        self
    }

    /// Checks the request shape (no record access).
    pub fn validate(&self) -> Result<(), ReshapeError> {
        if self.row_fields.is_empty() {
            return Err(ReshapeError::InvalidConfig(
                "at least one row field is required".to_string(),
            ));
        }
        if self.value_fields.is_empty() {
            return Err(ReshapeError::InvalidConfig(
                "at least one value field is required".to_string(),
            ));
        }
        check_disjoint(&[
            (FieldRole::Row, &self.row_fields),
            (FieldRole::Column, &self.column_fields),
            (FieldRole::Value, &self.value_fields),
            (FieldRole::Metadata, &self.metadata_fields),
            (FieldRole::ValueLabel, &self.value_label_fields),
        ])
    }

    /// Every configured field paired with its role, for schema validation.
    pub fn fields_by_role(&self) -> impl Iterator<Item = (FieldRole, &str)> {
        tag(FieldRole::Row, &self.row_fields)
            .chain(tag(FieldRole::Column, &self.column_fields))
            .chain(tag(FieldRole::Value, &self.value_fields))
            .chain(tag(FieldRole::Metadata, &self.metadata_fields))
            .chain(tag(FieldRole::ValueLabel, &self.value_label_fields))
    }
}

// ============================================================================
// AGGREGATE DEFINITION
// ============================================================================

/// Time bucket added to the series key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBucket {
    None,
    Year,
    Month,
}

/// Grouping granularity, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// One group per series.
    Series,
    /// One group per series and calendar year.
    #[default]
    SeriesYear,
    /// One group per series and month bucket.
    SeriesMonth,
    /// One group per calendar year, series collapsed.
    Year,
}

impl GroupBy {
    pub fn includes_series(self) -> bool {
        !matches!(self, GroupBy::Year)
    }

    pub fn time_bucket(self) -> TimeBucket {
        match self {
            GroupBy::Series => TimeBucket::None,
            GroupBy::SeriesYear | GroupBy::Year => TimeBucket::Year,
            GroupBy::SeriesMonth => TimeBucket::Month,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupBy::Series => "series",
            GroupBy::SeriesYear => "series-year",
            GroupBy::SeriesMonth => "series-month",
            GroupBy::Year => "year",
        }
    }
}

impl FromStr for GroupBy {
    type Err = ReshapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "series" => Ok(GroupBy::Series),
            "series-year" => Ok(GroupBy::SeriesYear),
            "series-month" => Ok(GroupBy::SeriesMonth),
            "year" => Ok(GroupBy::Year),
            other => Err(ReshapeError::InvalidConfig(format!(
                "unknown group '{}' (expected series, series-year, series-month or year)",
                other
            ))),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a month bucket means when data spans several years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthBucket {
    /// Calendar month 1-12; the same month of different years shares a group.
    #[default]
    CalendarMonth,
    /// (year, month); each month of each year is its own group.
    YearMonth,
}

/// Describes a grouped boxplot aggregation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateDefinition {
    /// Fields identifying a series (e.g. site, parameter).
    pub series_fields: Vec<String>,

    /// Numeric fields summarised per group (required, non-empty).
    pub value_fields: Vec<String>,

    /// Per-series attributes carried through unchanged (e.g. units).
    pub metadata_fields: Vec<String>,

    /// Date field used for time buckets.
    pub time_field: Option<String>,

    pub group: GroupBy,

    pub month_bucket: MonthBucket,
}

impl AggregateDefinition {
    pub fn new<S, V>(series_fields: S, value_fields: V) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        AggregateDefinition {
            series_fields: series_fields.into_iter().map(Into::into).collect(),
            value_fields: value_fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_metadata<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.metadata_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = Some(field.into());
        self
    }

    pub fn grouped_by(mut self, group: GroupBy) -> Self {
        self.group = group;
        self
    }

    pub fn with_month_bucket(mut self, bucket: MonthBucket) -> Self {
        self.month_bucket = bucket;
        self
    }

    /// Names of the bucket fields appended to the series key.
    pub fn bucket_field_names(&self) -> Vec<&'static str> {
        match (self.group.time_bucket(), self.month_bucket) {
            (TimeBucket::None, _) => Vec::new(),
            (TimeBucket::Year, _) => vec!["year"],
            (TimeBucket::Month, MonthBucket::CalendarMonth) => vec!["month"],
            (TimeBucket::Month, MonthBucket::YearMonth) => vec!["year", "month"],
        }
    }

    /// Series fields that take part in the group key.
    pub fn effective_series_fields(&self) -> &[String] {
        if self.group.includes_series() {
            &self.series_fields
        } else {
            &[]
        }
    }

    /// Metadata is only meaningful while the series identifies the group.
    pub fn effective_metadata_fields(&self) -> &[String] {
        if self.group.includes_series() {
            &self.metadata_fields
        } else {
            &[]
        }
    }

    /// Checks the request shape (no record access).
    pub fn validate(&self) -> Result<(), ReshapeError> {
        if self.value_fields.is_empty() {
            return Err(ReshapeError::InvalidConfig(
                "at least one value field is required".to_string(),
            ));
        }
        if self.group.time_bucket() != TimeBucket::None && self.time_field.is_none() {
            return Err(ReshapeError::InvalidConfig(format!(
                "group '{}' requires a time field",
                self.group
            )));
        }
        let time: Vec<String> = self.time_field.iter().cloned().collect();
        check_disjoint(&[
            (FieldRole::Series, &self.series_fields),
            (FieldRole::Value, &self.value_fields),
            (FieldRole::Metadata, &self.metadata_fields),
            (FieldRole::Time, &time),
        ])
    }

    /// Every field the request reads, paired with its role.
    pub fn fields_by_role(&self) -> impl Iterator<Item = (FieldRole, &str)> {
        let time_role = if self.group.time_bucket() == TimeBucket::None {
            &[][..]
        } else {
            self.time_field.as_slice()
        };
        tag(FieldRole::Series, self.effective_series_fields())
            .chain(tag(FieldRole::Value, &self.value_fields))
            .chain(tag(FieldRole::Metadata, self.effective_metadata_fields()))
            .chain(tag(FieldRole::Time, time_role))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn tag(role: FieldRole, fields: &[String]) -> impl Iterator<Item = (FieldRole, &str)> {
    fields.iter().map(move |f| (role, f.as_str()))
}

/// A field may appear in only one role, and only once within it.
fn check_disjoint(roles: &[(FieldRole, &Vec<String>)]) -> Result<(), ReshapeError> {
    let mut seen: Vec<(&str, FieldRole)> = Vec::new();
    for (role, fields) in roles {
        for field in fields.iter() {
            if let Some((_, first)) = seen.iter().find(|(name, _)| *name == field.as_str()) {
                return Err(ReshapeError::InvalidConfig(format!(
                    "field '{}' is used as both {} and {} field",
                    field, first, role
                )));
            }
            seen.push((field.as_str(), *role));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_parses_wire_names() {
        assert_eq!("series".parse::<GroupBy>().unwrap(), GroupBy::Series);
        assert_eq!("series-year".parse::<GroupBy>().unwrap(), GroupBy::SeriesYear);
        assert_eq!("series-month".parse::<GroupBy>().unwrap(), GroupBy::SeriesMonth);
        assert_eq!("year".parse::<GroupBy>().unwrap(), GroupBy::Year);
        assert!("weekly".parse::<GroupBy>().is_err());
        assert_eq!(GroupBy::default(), GroupBy::SeriesYear);
    }

    #[test]
    fn aggregate_definition_from_json() {
        let def: AggregateDefinition = serde_json::from_str(
            r#"{"series_fields": ["site"], "value_fields": ["value"],
                "time_field": "date", "group": "series-month", "month_bucket": "year-month"}"#,
        )
        .unwrap();
        assert_eq!(def.group, GroupBy::SeriesMonth);
        assert_eq!(def.bucket_field_names(), vec!["year", "month"]);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn engine_config_defaults_missing_keys() {
        let config = EngineConfig::from_json_str(r#"{"max_cells": 100}"#).unwrap();
        assert_eq!(config.max_cells, 100);
        assert_eq!(config.parallel_threshold, EngineConfig::default().parallel_threshold);
        assert!(EngineConfig::from_json_str(r#"{"max_cells": "lots"}"#).is_err());
    }

    #[test]
    fn pivot_definition_requires_rows_and_values() {
        let no_rows = PivotDefinition::new(Vec::<String>::new(), ["site"], ["value"]);
        assert!(matches!(no_rows.validate(), Err(ReshapeError::InvalidConfig(_))));

        let no_values = PivotDefinition::new(["date"], ["site"], Vec::<String>::new());
        assert!(matches!(no_values.validate(), Err(ReshapeError::InvalidConfig(_))));

        let ok = PivotDefinition::new(["date"], Vec::<String>::new(), ["value"]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn field_roles_must_not_overlap() {
        let def = PivotDefinition::new(["date", "site"], ["site"], ["value"]);
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("site"));
    }

    #[test]
    fn bucketed_grouping_needs_time_field() {
        let def = AggregateDefinition::new(["site"], ["value"]).grouped_by(GroupBy::Year);
        assert!(def.validate().is_err());
        assert!(def.effective_series_fields().is_empty());
        let def = def.with_time_field("date");
        assert!(def.validate().is_ok());
        assert_eq!(def.bucket_field_names(), vec!["year"]);
    }
}

//! FILENAME: tests/common/mod.rs
//! Fixtures and helpers for pivot-engine integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use pivot_engine::{AggregateDefinition, PivotDefinition, SeriesDataset};
use records::{CompositeKey, RecordSet, Scalar};

// ============================================================================
// FIXTURES
// ============================================================================

/// Three short daily series: site1 height, site1 flow and site2 flow.
pub struct ComplexFixture;

impl ComplexFixture {
    pub fn data() -> Vec<(
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        f64,
        Option<&'static str>,
    )> {
        vec![
            ("site1", "height", "ft", "2015-01-01", "routine", 0.5, None),
            ("site1", "height", "ft", "2015-01-02", "routine", 0.4, None),
            ("site1", "height", "ft", "2015-01-03", "routine", 0.6, None),
            ("site1", "height", "ft", "2015-01-04", "special", 0.2, None),
            ("site1", "height", "ft", "2015-01-05", "routine", 0.1, None),
            ("site1", "flow", "cfs", "2015-01-01", "special", 0.7, None),
            ("site1", "flow", "cfs", "2015-01-02", "routine", 0.8, None),
            ("site1", "flow", "cfs", "2015-01-03", "routine", 0.0, Some("Q")),
            ("site1", "flow", "cfs", "2015-01-04", "routine", 0.9, None),
            ("site1", "flow", "cfs", "2015-01-05", "routine", 0.3, None),
            ("site2", "flow", "cfs", "2015-01-01", "routine", 0.0, None),
            ("site2", "flow", "cfs", "2015-01-02", "routine", 0.7, None),
            ("site2", "flow", "cfs", "2015-01-03", "routine", 0.2, None),
            ("site2", "flow", "cfs", "2015-01-04", "routine", 0.3, None),
            ("site2", "flow", "cfs", "2015-01-05", "routine", 0.8, None),
        ]
    }

    pub fn records() -> RecordSet {
        Self::records_from(Self::data())
    }

    pub fn records_from(
        data: Vec<(&str, &str, &str, &str, &str, f64, Option<&str>)>,
    ) -> RecordSet {
        let mut set = RecordSet::new();
        for (site, parameter, units, date, kind, value, flag) in data {
            set.push([
                ("site", Scalar::text(site)),
                ("parameter", Scalar::text(parameter)),
                ("units", Scalar::text(units)),
                ("date", Scalar::Date(parse(date))),
                ("type", Scalar::text(kind)),
                ("value", Scalar::number(value)),
                ("flag", flag.map(Scalar::text).unwrap_or_default()),
            ]);
        }
        set
    }

    /// Rows (date, type); columns (units, parameter, site); values and flags.
    pub fn series_definition() -> PivotDefinition {
        PivotDefinition::new(
            ["date", "type"],
            ["units", "parameter", "site"],
            ["value", "flag"],
        )
    }

    /// One column per site and parameter/units label, complete rows only.
    pub fn scatter_definition() -> PivotDefinition {
        PivotDefinition::new(["date", "type"], ["site"], ["value"])
            .with_value_labels(["parameter", "units"])
            .dropping_incomplete_rows()
    }

    pub fn boxplot_definition() -> AggregateDefinition {
        AggregateDefinition::new(["site", "parameter"], ["value"])
            .with_metadata(["units"])
            .with_time_field("date")
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn parse(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
}

pub fn text_key(parts: &[&str]) -> CompositeKey {
    parts.iter().map(|p| Scalar::text(*p)).collect()
}

/// Finds the dataset whose attributes match every (name, text) pair.
pub fn find_dataset<'a>(datasets: &'a [SeriesDataset], attrs: &[(&str, &str)]) -> &'a SeriesDataset {
    datasets
        .iter()
        .find(|d| {
            attrs
                .iter()
                .all(|(name, value)| d.attributes.get(*name) == Some(&Scalar::text(*value)))
        })
        .unwrap_or_else(|| panic!("no dataset with {:?}", attrs))
}

/// Assert that a scalar is a number close to `expected`.
pub fn assert_number(value: Option<&Scalar>, expected: f64) {
    match value.and_then(|v| v.as_f64()) {
        Some(actual) => assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        ),
        None => panic!("expected number {}, got {:?}", expected, value),
    }
}

//! FILENAME: tests/test_contracts.rs
//! Byte-level CSV and JSON layouts for the series, scatter and boxplot views.

mod common;

use common::{boxplot_definition, complex_records, scatter_definition, series_definition};
use pivot_engine::{aggregate, calculate_pivot, EngineConfig, GroupBy};
use serde_json::json;
use table_export::{
    datasets_to_json, read_long_csv_file, wide_to_csv_string, write_datasets_json,
    write_wide_csv_file,
};

// ============================================================================
// SERIES / SCATTER
// ============================================================================

#[test]
fn test_series_csv_layout() {
    let table = calculate_pivot(&complex_records(), &series_definition(), &EngineConfig::default())
        .unwrap();
    assert_eq!(
        wide_to_csv_string(&table).unwrap(),
        "\
,,flag,value,value,value
units,,cfs,cfs,cfs,ft
parameter,,flow,flow,flow,height
site,,site1,site1,site2,site1
date,type,,,,
2015-01-01,routine,,,0.0,0.5
2015-01-01,special,,0.7,,
2015-01-02,routine,,0.8,0.7,0.4
2015-01-03,routine,Q,0.0,0.2,0.6
2015-01-04,routine,,0.9,0.3,
2015-01-04,special,,,,0.2
2015-01-05,routine,,0.3,0.8,0.1
"
    );
}

#[test]
fn test_scatter_csv_layout() {
    let table = calculate_pivot(&complex_records(), &scatter_definition(), &EngineConfig::default())
        .unwrap();
    assert_eq!(
        wide_to_csv_string(&table).unwrap(),
        "\
,,flow-cfs-value,flow-cfs-value,height-ft-value
site,,site1,site2,site1
date,type,,,
2015-01-02,routine,0.8,0.7,0.4
2015-01-03,routine,0.0,0.2,0.6
2015-01-05,routine,0.3,0.8,0.1
"
    );
}

#[test]
fn test_scatter_datasets_json() {
    let table = calculate_pivot(&complex_records(), &scatter_definition(), &EngineConfig::default())
        .unwrap();
    assert_eq!(
        datasets_to_json(&table.series_datasets()).unwrap(),
        json!([
            {"site": "site1", "data": [
                {"date": "2015-01-02", "type": "routine",
                 "flow-cfs-value": 0.8, "height-ft-value": 0.4},
                {"date": "2015-01-03", "type": "routine",
                 "flow-cfs-value": 0.0, "height-ft-value": 0.6},
                {"date": "2015-01-05", "type": "routine",
                 "flow-cfs-value": 0.3, "height-ft-value": 0.1},
            ]},
            {"site": "site2", "data": [
                {"date": "2015-01-02", "type": "routine", "flow-cfs-value": 0.7},
                {"date": "2015-01-03", "type": "routine", "flow-cfs-value": 0.2},
                {"date": "2015-01-05", "type": "routine", "flow-cfs-value": 0.8},
            ]},
        ])
    );
}

#[test]
fn test_series_datasets_json_carry_flags() {
    let table = calculate_pivot(&complex_records(), &series_definition(), &EngineConfig::default())
        .unwrap();
    let mut buffer = Vec::new();
    write_datasets_json(&table.series_datasets(), &mut buffer).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    let datasets = value.as_array().unwrap();
    assert_eq!(datasets.len(), 3);
    let s1flow = datasets
        .iter()
        .find(|d| d["site"] == "site1" && d["parameter"] == "flow")
        .unwrap();
    assert_eq!(s1flow["units"], "cfs");
    assert_eq!(
        s1flow["data"][2],
        json!({"date": "2015-01-03", "type": "routine", "value": 0.0, "flag": "Q"})
    );
}

// ============================================================================
// BOXPLOT
// ============================================================================

#[test]
fn test_boxplot_series_year_csv() {
    let result = aggregate(&complex_records(), &boxplot_definition(), &EngineConfig::default())
        .unwrap();
    let csv = wide_to_csv_string(&result.to_wide_table()).unwrap();
    let lines: Vec<Vec<&str>> = csv.lines().map(|l| l.split(',').collect()).collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(&lines[0][..5], &["", "value-count", "value-count", "value-count", "value-mean"]);
    assert_eq!(&lines[1][..4], &["site", "site1", "site1", "site2"]);
    assert_eq!(&lines[2][..4], &["parameter", "flow", "height", "flow"]);
    assert_eq!(&lines[3][..4], &["units", "cfs", "ft", "cfs"]);
    assert_eq!(lines[4][0], "year");
    assert!(lines[4][1..].iter().all(|cell| cell.is_empty()));

    let data = &lines[5];
    assert_eq!(data.len(), 1 + 21);
    assert_eq!(&data[..4], &["2015", "5", "5", "5"]);
    assert_eq!(&data[16..19], &["0.0", "0.1", "0.0"]);
    assert_eq!(&data[19..22], &["0.9", "0.6", "0.8"]);
}

#[test]
fn test_boxplot_year_csv_has_single_header() {
    let definition = boxplot_definition().grouped_by(GroupBy::Year);
    let result = aggregate(&complex_records(), &definition, &EngineConfig::default()).unwrap();
    let csv = wide_to_csv_string(&result.to_wide_table()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "year,value-count,value-mean,value-med,value-q1,value-q3,value-whislo,value-whishi"
    );
    let cells: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(cells[0], "2015");
    assert_eq!(cells[1], "15");
    assert!((cells[2].parse::<f64>().unwrap() - 0.43333).abs() < 1e-5);
    assert_eq!(cells[3], "0.4");
    assert_eq!(&cells[6..], &["0.0", "0.9"]);
}

// ============================================================================
// FILES
// ============================================================================

#[test]
fn test_file_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("complex.csv");
    std::fs::write(&input, common::COMPLEX_CSV).unwrap();

    let records = read_long_csv_file(&input).unwrap();
    assert_eq!(records.len(), 15);

    let table = calculate_pivot(&records, &scatter_definition(), &EngineConfig::default()).unwrap();
    let output = dir.path().join("scatter.csv");
    write_wide_csv_file(&table, &output).unwrap();

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        wide_to_csv_string(&table).unwrap()
    );
}

//! FILENAME: tests/common/mod.rs
//! Fixture for table-export integration tests: the long-format CSV of three
//! short daily series (site1 height, site1 flow, site2 flow).

#![allow(dead_code)]

use pivot_engine::{AggregateDefinition, PivotDefinition};
use records::RecordSet;
use table_export::read_long_csv;

pub const COMPLEX_CSV: &str = "\
site,parameter,units,date,type,value,flag
site1,height,ft,2015-01-01,routine,0.5,
site1,height,ft,2015-01-02,routine,0.4,
site1,height,ft,2015-01-03,routine,0.6,
site1,height,ft,2015-01-04,special,0.2,
site1,height,ft,2015-01-05,routine,0.1,
site1,flow,cfs,2015-01-01,special,0.7,
site1,flow,cfs,2015-01-02,routine,0.8,
site1,flow,cfs,2015-01-03,routine,0.0,Q
site1,flow,cfs,2015-01-04,routine,0.9,
site1,flow,cfs,2015-01-05,routine,0.3,
site2,flow,cfs,2015-01-01,routine,0.0,
site2,flow,cfs,2015-01-02,routine,0.7,
site2,flow,cfs,2015-01-03,routine,0.2,
site2,flow,cfs,2015-01-04,routine,0.3,
site2,flow,cfs,2015-01-05,routine,0.8,
";

pub fn complex_records() -> RecordSet {
    read_long_csv(COMPLEX_CSV.as_bytes()).unwrap()
}

pub fn series_definition() -> PivotDefinition {
    PivotDefinition::new(
        ["date", "type"],
        ["units", "parameter", "site"],
        ["value", "flag"],
    )
}

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

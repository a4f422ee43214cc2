//! FILENAME: core/table-export/src/json.rs
//! JSON rendering of unstacked series datasets.
//!
//! Each dataset becomes one object: its attributes as top-level keys plus a
//! `data` array of row objects, e.g.
//! `{"site": "site1", "data": [{"date": "2015-01-02", "value": 0.8}]}`.

use std::io::Write;

use serde_json::{Map, Value};

use pivot_engine::SeriesDataset;

use crate::error::ExportError;

/// Converts datasets to a JSON array.
pub fn datasets_to_json(datasets: &[SeriesDataset]) -> Result<Value, ExportError> {
    let mut out = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let mut object = Map::new();
        for (name, value) in &dataset.attributes {
            object.insert(name.clone(), serde_json::to_value(value)?);
        }

        let mut rows = Vec::with_capacity(dataset.data.len());
        for row in &dataset.data {
            let mut entry = Map::new();
            for (name, value) in row {
                entry.insert(name.clone(), serde_json::to_value(value)?);
            }
            rows.push(Value::Object(entry));
        }
        object.insert("data".to_string(), Value::Array(rows));

        out.push(Value::Object(object));
    }
    Ok(Value::Array(out))
}

/// Writes datasets as a JSON array to `writer`.
pub fn write_datasets_json<W: Write>(
    datasets: &[SeriesDataset],
    writer: W,
) -> Result<(), ExportError> {
    let value = datasets_to_json(datasets)?;
    serde_json::to_writer(writer, &value)?;
    log::debug!(target: "EXPORT", "wrote {} datasets as JSON", datasets.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use records::Scalar;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn attributes_are_flattened_beside_data() {
        let mut attributes = BTreeMap::new();
        attributes.insert("site".to_string(), Scalar::text("site1"));
        let mut row = BTreeMap::new();
        row.insert("day".to_string(), Scalar::Integer(2));
        row.insert("value".to_string(), Scalar::number(0.0));
        let datasets = vec![SeriesDataset {
            attributes,
            data: vec![row],
        }];

        assert_eq!(
            datasets_to_json(&datasets).unwrap(),
            json!([{"site": "site1", "data": [{"day": 2, "value": 0.0}]}])
        );
    }
}

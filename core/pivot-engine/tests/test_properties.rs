//! FILENAME: tests/test_properties.rs
//! Property tests: pivot results depend only on the set of observations.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use pivot_engine::{calculate_pivot, BoxplotStats, EngineConfig, PivotDefinition, ReshapeError};
use records::{CompositeKey, RecordSet, Scalar};

const CASES: u32 = 64;

type Observation = ((u8, u8), i64);

fn build(observations: &[Observation]) -> RecordSet {
    let mut set = RecordSet::with_fields(["row", "col", "value"]);
    for &((row, col), value) in observations {
        set.push([
            ("row", Scalar::Integer(row as i64)),
            ("col", Scalar::text(format!("c{}", col))),
            ("value", Scalar::Integer(value)),
        ]);
    }
    set
}

fn definition() -> PivotDefinition {
    PivotDefinition::new(["row"], ["col"], ["value"])
}

/// Observations with distinct (row, col) keys.
fn observations() -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::btree_map((0u8..8, 0u8..5), -50i64..50, 0..30)
        .prop_map(|m: BTreeMap<(u8, u8), i64>| m.into_iter().collect())
}

fn observations_and_shuffle() -> impl Strategy<Value = (Vec<Observation>, Vec<Observation>)> {
    observations().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn record_order_does_not_matter((observed, shuffled) in observations_and_shuffle()) {
        let config = EngineConfig::default();
        let a = calculate_pivot(&build(&observed), &definition(), &config).unwrap();
        let b = calculate_pivot(&build(&shuffled), &definition(), &config).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn repeated_records_are_idempotent(
        (observed, shuffled) in observations_and_shuffle(),
        repeat in 0usize..10,
    ) {
        let mut doubled = observed.clone();
        doubled.extend(shuffled.iter().take(repeat).copied());

        let config = EngineConfig::default();
        let a = calculate_pivot(&build(&observed), &definition(), &config).unwrap();
        let b = calculate_pivot(&build(&doubled), &definition(), &config).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_observation_lands_in_its_cell(observed in observations()) {
        let table = calculate_pivot(&build(&observed), &definition(), &EngineConfig::default())
            .unwrap();

        let rows: BTreeSet<u8> = observed.iter().map(|((r, _), _)| *r).collect();
        let cols: BTreeSet<u8> = observed.iter().map(|((_, c), _)| *c).collect();
        prop_assert_eq!(table.row_count(), rows.len());
        prop_assert_eq!(table.column_count(), cols.len());
        prop_assert_eq!(table.filled_cells(), observed.len());

        for &((row, col), value) in &observed {
            let row_key: CompositeKey = [Scalar::Integer(row as i64)].into_iter().collect();
            let col_key: CompositeKey = [Scalar::text(format!("c{}", col))].into_iter().collect();
            prop_assert_eq!(
                table.lookup(&row_key, "value", &col_key),
                Some(&Scalar::Integer(value))
            );
        }
    }

    #[test]
    fn conflicting_value_is_always_reported(
        observed in observations().prop_filter("need one observation", |v| !v.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let picked = pick.index(observed.len());
        let ((row, col), value) = observed[picked];
        let mut conflicting = observed.clone();
        conflicting.push(((row, col), value + 1000));
        let records = build(&conflicting);

        // Threshold 1 splits even tiny inputs, so the pair may meet in a merge.
        for config in [
            EngineConfig::default(),
            EngineConfig { parallel_threshold: 1, ..EngineConfig::default() },
        ] {
            match calculate_pivot(&records, &definition(), &config).unwrap_err() {
                ReshapeError::DuplicateKey { first_record, second_record, .. } => {
                    prop_assert_eq!(first_record as usize, picked);
                    prop_assert_eq!(second_record as usize, observed.len());
                }
                other => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn partitioned_run_matches_serial(observed in observations()) {
        let serial = calculate_pivot(&build(&observed), &definition(), &EngineConfig::default())
            .unwrap();
        let partitioned_config = EngineConfig {
            parallel_threshold: 2,
            ..EngineConfig::default()
        };
        let partitioned = calculate_pivot(&build(&observed), &definition(), &partitioned_config)
            .unwrap();
        prop_assert_eq!(serial, partitioned);
    }

    #[test]
    fn cell_bound_is_enforced(
        observed in observations().prop_filter("need one observation", |v| !v.is_empty()),
    ) {
        let rows: BTreeSet<u8> = observed.iter().map(|((r, _), _)| *r).collect();
        let cols: BTreeSet<u8> = observed.iter().map(|((_, c), _)| *c).collect();
        let cells = rows.len() * cols.len();

        let exact = EngineConfig { max_cells: cells, ..EngineConfig::default() };
        prop_assert!(calculate_pivot(&build(&observed), &definition(), &exact).is_ok());

        let tight = EngineConfig { max_cells: cells - 1, ..EngineConfig::default() };
        let is_oversized = matches!(
            calculate_pivot(&build(&observed), &definition(), &tight),
            Err(ReshapeError::OversizedResult { .. })
        );
        prop_assert!(is_oversized);
    }

    #[test]
    fn boxplot_stats_are_ordered(
        values in prop::collection::vec((-1000i32..1000).prop_map(f64::from), 1..40),
    ) {
        let stats = BoxplotStats::from_values(&values).unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        prop_assert_eq!(stats.count, values.len());
        prop_assert!(min <= stats.whisker_low);
        prop_assert!(stats.whisker_low <= stats.q1);
        prop_assert!(stats.q1 <= stats.median);
        prop_assert!(stats.median <= stats.q3);
        prop_assert!(stats.q3 <= stats.whisker_high);
        prop_assert!(stats.whisker_high <= max);
        prop_assert!(values.contains(&stats.whisker_low) || stats.whisker_low == stats.q1);
        prop_assert!(values.contains(&stats.whisker_high) || stats.whisker_high == stats.q3);
    }
}

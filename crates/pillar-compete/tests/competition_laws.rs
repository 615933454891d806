//! Integration tests: bounds and mass preservation of signal competition.

use pillar_compete::{
    CompeteOptions, Competition, MethodKeys, apply_competition, compete, renormalize_scale,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

const METHODS: [&str; 4] = ["strength", "pattern", "season", "balance"];

fn signal_map(values: &[f64]) -> BTreeMap<String, f64> {
    METHODS
        .iter()
        .zip(values)
        .map(|(m, v)| (m.to_string(), *v))
        .collect()
}

#[test]
fn reference_cases() {
    let out = compete(
        &["a", "b"],
        &BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 0.0)]),
        CompeteOptions::default().with_power(2.0).with_min_keep(0.2),
    );
    assert_eq!(out.share("a"), 1.0);
    assert_eq!(out.share("b"), 0.0);
    assert_eq!(out.multiplier("a"), 1.0);
    assert_eq!(out.multiplier("b"), 0.2);

    let out = compete(
        &["a", "b"],
        &BTreeMap::from([("a".to_string(), 0.0), ("b".to_string(), 0.0)]),
        CompeteOptions::default(),
    );
    assert_eq!(out.share("a"), 0.5);
    assert_eq!(out.share("b"), 0.5);

    assert_eq!(renormalize_scale(10.0, 5.0), 2.0);
    assert_eq!(renormalize_scale(10.0, 0.0), 1.0);
    assert_eq!(renormalize_scale(-1.0, 5.0), 1.0);
}

#[test]
fn output_serializes_with_camel_case_fields() {
    let out = compete(
        &["a"],
        &BTreeMap::from([("a".to_string(), 0.5)]),
        CompeteOptions::default(),
    );
    let value = serde_json::to_value(&out).expect("serialize");
    assert_eq!(value["minKeep"], json!(0.2));
    assert_eq!(value["shares"], json!({"a": 1.0}));

    let back: Competition = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, out);
}

proptest! {
    #[test]
    fn shares_sum_to_one_and_multipliers_stay_in_bounds(
        values in prop::collection::vec(-0.5f64..1.5, METHODS.len()),
        power in -1.0f64..6.0,
        min_keep in -0.5f64..1.5,
    ) {
        let out = compete(
            &METHODS,
            &signal_map(&values),
            CompeteOptions::default().with_power(power).with_min_keep(min_keep),
        );

        let total: f64 = out.shares.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        for m in METHODS {
            let multiplier = out.multiplier(m);
            prop_assert!(multiplier.is_finite());
            prop_assert!(multiplier >= out.min_keep - 1e-12);
            prop_assert!(multiplier <= 1.0 + 1e-12);
            prop_assert!((0.0..=1.0).contains(&out.signals[m]));
        }
    }

    #[test]
    fn applying_competition_preserves_positive_mass(
        values in prop::collection::vec(0.0f64..1.0, METHODS.len()),
        scores in prop::collection::vec(0.1f64..50.0, METHODS.len()),
    ) {
        let competition = compete(&METHODS, &signal_map(&values), CompeteOptions::default());
        let method_keys: MethodKeys = METHODS
            .iter()
            .map(|m| (m.to_string(), vec![format!("{m}.score")]))
            .collect();
        let before: BTreeMap<String, f64> = METHODS
            .iter()
            .zip(&scores)
            .map(|(m, s)| (format!("{m}.score"), *s))
            .collect();

        let after = apply_competition(&before, &method_keys, &competition);

        let total_before: f64 = before.values().sum();
        let total_after: f64 = after.values().sum();
        prop_assert!((total_before - total_after).abs() < 1e-9 * total_before.max(1.0));
    }

    #[test]
    fn competition_is_deterministic(values in prop::collection::vec(0.0f64..1.0, METHODS.len())) {
        let signals = signal_map(&values);
        let first = compete(&METHODS, &signals, CompeteOptions::default());
        let second = compete(&METHODS, &signals, CompeteOptions::default());
        prop_assert_eq!(first, second);
    }
}

use std::collections::BTreeMap;

use mudbot_core::{interpolate, PopulationCurve};

fn points(pairs: &[(u32, f64)]) -> BTreeMap<u32, f64> {
    pairs.iter().copied().collect()
}

#[test]
fn empty_curve_is_zero() {
    assert_eq!(interpolate(0, &BTreeMap::new()), 0.0);
    assert_eq!(interpolate(42, &BTreeMap::new()), 0.0);
}

#[test]
fn interpolates_between_breakpoints() {
    let p = points(&[(1, 100.0), (10, 0.0)]);
    let w = interpolate(5, &p);
    assert!((w - 100.0 * (1.0 - 4.0 / 9.0)).abs() < 1e-9, "got {w}");
    assert!((w - 55.555).abs() < 0.01);
}

#[test]
fn clamps_outside_breakpoints() {
    let p = points(&[(2, 20.0), (80, 100.0)]);
    assert_eq!(interpolate(0, &p), 20.0);
    assert_eq!(interpolate(2, &p), 20.0);
    assert_eq!(interpolate(80, &p), 100.0);
    assert_eq!(interpolate(500, &p), 100.0);
}

#[test]
fn exact_at_every_breakpoint_and_monotonic_between() {
    let p = points(&[(1, 100.0), (2, 20.0), (3, 5.0), (10, 1.0), (20, 5.0), (80, 100.0)]);

    for (&count, &weight) in &p {
        assert_eq!(interpolate(count, &p), weight);
    }

    let keys: Vec<u32> = p.keys().copied().collect();
    for pair in keys.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let rising = p[&hi] >= p[&lo];
        let mut prev = interpolate(lo, &p);
        for c in lo + 1..=hi {
            let w = interpolate(c, &p);
            if rising {
                assert!(w >= prev, "not rising between {lo} and {hi} at {c}");
            } else {
                assert!(w <= prev, "not falling between {lo} and {hi} at {c}");
            }
            prev = w;
        }
    }
}

#[test]
fn curve_deserializes_from_config_map() {
    let curve: PopulationCurve = serde_json::from_str(r#"{"1": 0, "2": 20, "3": 40}"#).unwrap();
    assert_eq!(curve.weight_at(1), 0.0);
    assert_eq!(curve.weight_at(2), 20.0);
    assert_eq!(curve.weight_at(7), 40.0);
    assert!(!curve.is_empty());
}

//! Property tests for the transform invariants.
//!
//! Uses proptest to verify:
//! 1. Rebasing identity: value_in_pivot(X) == pivot_rate / rate(X)
//! 2. Pivot self-record is exactly 1.0 and appears once
//! 3. Normalization keeps exactly the positive finite rates
//! 4. The pipeline is deterministic

use fxlayer_core::data::{normalize, rebase, RawSnapshot};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_code() -> impl Strategy<Value = String> {
    "[A-Z]{3}"
}

fn arb_rate() -> impl Strategy<Value = f64> {
    (1e-4..1e5_f64).prop_map(|r| (r * 1e4).round() / 1e4 + 1e-4)
}

/// A raw rate entry that may or may not survive the quality filter.
fn arb_entry() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => arb_rate().prop_map(|r| json!(r)),
        1 => Just(Value::Null),
        1 => Just(json!(0)),
        1 => (-1e3..0.0_f64).prop_map(|r| json!(r)),
        1 => Just(json!("n/a")),
        1 => Just(json!(true)),
    ]
}

fn snapshot_with(rates: Map<String, Value>) -> RawSnapshot {
    RawSnapshot::from_payload(&json!({
        "base_code": "USD",
        "time_last_update_unix": 1_704_153_601i64,
        "conversion_rates": rates,
    }))
    .unwrap()
}

fn is_kept(value: &Value) -> bool {
    value.as_f64().is_some_and(|r| r.is_finite() && r > 0.0)
}

// ── 1 & 2. Rebasing ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn rebase_divides_pivot_rate_by_rate(
        rates in prop::collection::btree_map(arb_code(), arb_rate(), 1..30),
        pivot_rate in arb_rate(),
    ) {
        let mut map = Map::new();
        map.insert("BRL".into(), json!(pivot_rate));
        for (code, rate) in &rates {
            if code != "BRL" {
                map.insert(code.clone(), json!(rate));
            }
        }
        let silver = normalize(&snapshot_with(map)).unwrap().records;
        let gold = rebase(&silver, "BRL").unwrap();

        prop_assert_eq!(gold.len(), silver.len());
        for (g, s) in gold.iter().zip(&silver) {
            prop_assert_eq!(&g.currency, &s.target_currency);
            if g.currency == "BRL" {
                prop_assert_eq!(g.value_in_pivot, 1.0);
            } else {
                prop_assert_eq!(g.value_in_pivot, pivot_rate / s.rate);
                prop_assert!(g.value_in_pivot > 0.0);
            }
        }
        prop_assert_eq!(gold.iter().filter(|g| g.currency == "BRL").count(), 1);
    }

    #[test]
    fn rebase_without_pivot_fails(
        rates in prop::collection::btree_map("[A-Z]{3}".prop_filter("not pivot", |c| c != "BRL"), arb_rate(), 0..20),
    ) {
        let map: Map<String, Value> = rates.into_iter().map(|(c, r)| (c, json!(r))).collect();
        let silver = normalize(&snapshot_with(map)).unwrap().records;
        prop_assert!(rebase(&silver, "BRL").is_err());
    }
}

// ── 3 & 4. Normalization ─────────────────────────────────────────────

proptest! {
    #[test]
    fn normalize_keeps_exactly_positive_finite(
        entries in prop::collection::btree_map(arb_code(), arb_entry(), 0..40),
    ) {
        let map: Map<String, Value> = entries.clone().into_iter().collect();
        let out = normalize(&snapshot_with(map)).unwrap();

        let expected: Vec<&String> = entries
            .iter()
            .filter(|(_, v)| is_kept(v))
            .map(|(c, _)| c)
            .collect();
        let kept: Vec<&String> = out.records.iter().map(|r| &r.target_currency).collect();
        prop_assert_eq!(kept, expected);
        prop_assert_eq!(out.records.len() + out.dropped_count(), entries.len());
        prop_assert!(out.records.iter().all(|r| r.rate > 0.0 && r.rate.is_finite()));
    }

    #[test]
    fn pipeline_is_deterministic(
        rates in prop::collection::btree_map(arb_code(), arb_rate(), 0..20),
        pivot_rate in arb_rate(),
    ) {
        let mut map: Map<String, Value> = rates.into_iter().map(|(c, r)| (c, json!(r))).collect();
        map.insert("BRL".into(), json!(pivot_rate));
        let raw = snapshot_with(map);

        let first = rebase(&normalize(&raw).unwrap().records, "BRL").unwrap();
        let second = rebase(&normalize(&raw).unwrap().records, "BRL").unwrap();
        prop_assert_eq!(first, second);
    }
}

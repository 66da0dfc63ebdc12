//! Integration tests for reports over persisted layers.

use chrono::NaiveDate;
use fxlayer_core::config::PipelineConfig;
use fxlayer_core::data::{ArtifactKind, ArtifactStore, NormalizedRecord, RebasedRecord};
use fxlayer_core::summary::DailySummary;
use fxlayer_runner::reporting::{
    compare_rows, currency_history, day_summary, render_comparison, render_summary, render_view,
    select_rows, store_status, write_layer_csv, PctChange,
};
use fxlayer_runner::{load_layer, Layer, LayerRow, StageError};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn setup() -> (TempDir, ArtifactStore) {
    let tmp = TempDir::new().unwrap();
    let config = PipelineConfig {
        data_root: tmp.path().to_path_buf(),
        ..PipelineConfig::default()
    };
    let store = config.store();
    (tmp, store)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn seed_gold(store: &ArtifactStore, d: NaiveDate, rows: &[(&str, f64)]) {
    let records: Vec<RebasedRecord> = rows
        .iter()
        .map(|(c, v)| RebasedRecord {
            currency: c.to_string(),
            value_in_pivot: *v,
            last_update_utc: format!("{d} 00:00:01"),
        })
        .collect();
    store.write_gold(d, &records).unwrap();
}

fn seed_silver(store: &ArtifactStore, d: NaiveDate, rows: &[(&str, f64)]) {
    let records: Vec<NormalizedRecord> = rows
        .iter()
        .map(|(c, v)| NormalizedRecord {
            base_currency: "USD".into(),
            target_currency: c.to_string(),
            rate: *v,
            last_update_utc: format!("{d} 00:00:01"),
        })
        .collect();
    store.write_silver(d, &records).unwrap();
}

#[test]
fn view_defaults_to_latest_gold() {
    let (_tmp, store) = setup();
    seed_gold(&store, day(1), &[("USD", 4.9), ("BRL", 1.0)]);
    seed_gold(&store, day(3), &[("USD", 5.0), ("BRL", 1.0), ("EUR", 5.4)]);

    let table = load_layer(&store, Layer::Gold, None).unwrap();
    assert_eq!(table.date, day(3));
    assert_eq!(table.value_column, "rate_brl_base");

    let wanted = vec!["usd".to_string(), "gbp".to_string()];
    let view = select_rows(&table.rows, Some(wanted.as_slice()), None);
    assert_eq!(view.missing, vec!["GBP"]);
    let text = render_view(&table, &view);
    assert!(text.contains("GBP"));
    assert!(text.contains("5,000000"));
    assert!(view.rows.iter().all(|r| r.currency == "USD"));
}

#[test]
fn missing_date_is_a_lookup_miss() {
    let (_tmp, store) = setup();
    seed_gold(&store, day(1), &[("BRL", 1.0)]);

    let err = load_layer(&store, Layer::Gold, Some(day(2))).unwrap_err();
    assert!(err.is_missing_artifact());
    let err = load_layer(&store, Layer::Silver, None).unwrap_err();
    assert!(matches!(
        err,
        StageError::MissingArtifact {
            kind: ArtifactKind::Silver,
            date: None
        }
    ));
}

#[test]
fn silver_view_reads_fetch_base() {
    let (_tmp, store) = setup();
    seed_silver(&store, day(2), &[("BRL", 4.89), ("EUR", 0.91)]);

    let table = load_layer(&store, Layer::Silver, Some(day(2))).unwrap();
    assert_eq!(table.base, "USD");
    let text = render_view(&table, &select_rows(&table.rows, None, Some(1)));
    assert!(text.contains("[SILVER/base=USD]"));
    assert!(text.contains("4,890000"));
    assert!(!text.contains("0,910000"));
}

#[test]
fn compare_two_gold_days() {
    let (_tmp, store) = setup();
    seed_gold(&store, day(1), &[("USD", 5.0), ("EUR", 5.4), ("ARS", 0.006)]);
    seed_gold(&store, day(2), &[("USD", 5.5), ("EUR", 5.4), ("JPY", 0.034)]);

    let first = load_layer(&store, Layer::Gold, Some(day(1))).unwrap();
    let second = load_layer(&store, Layer::Gold, Some(day(2))).unwrap();
    let cmp = compare_rows(&first.rows, &second.rows, None, Some(10));

    let names: Vec<&str> = cmp.rows.iter().map(|r| r.currency.as_str()).collect();
    assert_eq!(names, vec!["USD", "EUR"]);

    let text = render_comparison(&first, &second, &cmp);
    assert!(text.contains("value_2024-01-01"));
    assert!(text.contains("+10,00%"));
    assert!(text.contains("+0,00%"));
}

#[test]
fn history_tracks_the_last_n_days() {
    let (_tmp, store) = setup();
    seed_gold(&store, day(1), &[("USD", 4.0)]);
    seed_gold(&store, day(2), &[("USD", 5.0)]);
    seed_gold(&store, day(3), &[("EUR", 5.4)]);
    seed_gold(&store, day(4), &[("USD", 5.5)]);

    let points = currency_history(&store, Layer::Gold, "usd", 3).unwrap();
    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![day(2), day(4)]);
    assert_eq!(points[0].change, None);
    assert_eq!(points[1].change, Some(PctChange::Defined(10.0)));
}

#[test]
fn export_writes_selected_rows() {
    let (tmp, store) = setup();
    seed_gold(&store, day(1), &[("USD", 5.0), ("EUR", 5.4), ("BRL", 1.0)]);

    let table = load_layer(&store, Layer::Gold, None).unwrap();
    let wanted = vec!["EUR".to_string()];
    let view = select_rows(&table.rows, Some(wanted.as_slice()), None);
    let out = tmp.path().join("exports/eur.csv");
    write_layer_csv(&out, &table, &view.rows).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        text,
        "currency,rate_brl_base,last_update_utc\nEUR,5.4,2024-01-01 00:00:01\n"
    );
}

#[test]
fn status_lists_dates_per_kind() {
    let (_tmp, store) = setup();
    seed_gold(&store, day(1), &[("BRL", 1.0)]);
    seed_gold(&store, day(2), &[("BRL", 1.0)]);
    store.write_summary_markdown(day(2), "x").unwrap();

    let status = store_status(&store);
    let count = |kind: ArtifactKind| {
        status
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.dates.len())
            .unwrap()
    };
    assert_eq!(count(ArtifactKind::Raw), 0);
    assert_eq!(count(ArtifactKind::Gold), 2);
    assert_eq!(count(ArtifactKind::Summary), 1);
}

#[test]
fn summary_prefers_json_then_markdown_then_notice() {
    let (_tmp, store) = setup();
    store.write_summary_markdown(day(2), "Sem JSON\u{200b}:  R $ 4, 89").unwrap();
    store.write_summary_markdown(day(3), "superseded").unwrap();
    store
        .write_summary_json(
            day(3),
            &DailySummary {
                title: "Resumo Cambial - 03/01/2024".into(),
                paragraphs: vec!["Dólar estável.".into()],
            },
        )
        .unwrap();

    let latest = day_summary(&store, None).unwrap();
    assert_eq!(latest.date, day(3));
    let text = render_summary(&latest);
    assert!(text.contains("Resumo Cambial - 03/01/2024\n\nDólar estável."));
    assert!(!text.contains("superseded"));

    let md = render_summary(&day_summary(&store, Some(day(2))).unwrap());
    assert!(md.contains("Sem JSON: R$ 4,89"));

    let absent = day_summary(&store, Some(day(9))).unwrap();
    assert!(absent.attachment.is_none());
    assert_eq!(render_summary(&absent), "No summary available for 2024-01-09.\n");
}

#[test]
fn summary_without_any_artifact_is_a_lookup_miss() {
    let (_tmp, store) = setup();
    let err = day_summary(&store, None).unwrap_err();
    assert!(err.is_missing_artifact());
}

// ── Property: compare is an inner join ──────────────────────────────

fn arb_day() -> impl Strategy<Value = Vec<LayerRow>> {
    prop::collection::btree_map("[A-E]{2}", 0.0..100.0_f64, 0..12).prop_map(|m| {
        m.into_iter()
            .map(|(currency, value)| LayerRow {
                currency,
                value,
                last_update_utc: String::new(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn compare_rows_are_the_intersection(d1 in arb_day(), d2 in arb_day()) {
        let cmp = compare_rows(&d1, &d2, None, None);

        let a: BTreeSet<&str> = d1.iter().map(|r| r.currency.as_str()).collect();
        let b: BTreeSet<&str> = d2.iter().map(|r| r.currency.as_str()).collect();
        let expected: BTreeSet<&str> = a.intersection(&b).copied().collect();
        let got: BTreeSet<&str> = cmp.rows.iter().map(|r| r.currency.as_str()).collect();

        prop_assert_eq!(got, expected);
        prop_assert_eq!(cmp.rows.len(), a.intersection(&b).count());
        for row in &cmp.rows {
            prop_assert_eq!(row.delta, row.v2 - row.v1);
        }
    }

    #[test]
    fn compare_sorts_by_magnitude_with_undefined_last(d1 in arb_day(), d2 in arb_day()) {
        let cmp = compare_rows(&d1, &d2, None, None);
        for pair in cmp.rows.windows(2) {
            match (pair[0].pct.value(), pair[1].pct.value()) {
                (Some(x), Some(y)) => prop_assert!(x.abs() >= y.abs()),
                (None, Some(_)) => prop_assert!(false, "undefined before defined"),
                _ => {}
            }
        }
    }
}

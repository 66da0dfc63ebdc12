//! Silver layer: flatten a raw snapshot into quality-filtered rate records.

use super::snapshot::{RawSnapshot, SnapshotError, BASE_FIELD, TIMESTAMP_FIELD};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Timestamp format used by silver and gold records.
pub const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One silver row: `rate` units of `target_currency` per 1 `base_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub base_currency: String,
    pub target_currency: String,
    pub rate: f64,
    pub last_update_utc: String,
}

/// Why a raw rate was excluded from the silver set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Null,
    NonNumeric,
    NonFinite,
    NonPositive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRate {
    pub currency: String,
    pub reason: DropReason,
}

/// Output of [`normalize`]: the kept records plus what was filtered out.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<NormalizedRecord>,
    pub dropped: Vec<DroppedRate>,
}

impl Normalized {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Format a UNIX timestamp as a UTC string in [`UTC_FORMAT`].
pub fn format_unix_utc(unix: i64) -> Result<String, SnapshotError> {
    DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format(UTC_FORMAT).to_string())
        .ok_or_else(|| SnapshotError::InvalidField {
            field: TIMESTAMP_FIELD,
            reason: format!("{unix} is out of range"),
        })
}

/// Build the silver record set for one snapshot.
///
/// Every `(code, value)` pair becomes a record; records whose rate is null,
/// non-numeric, non-finite or `<= 0` are dropped. Numeric strings are
/// accepted. Output keeps the snapshot's key order.
pub fn normalize(raw: &RawSnapshot) -> Result<Normalized, SnapshotError> {
    if raw.base_currency.trim().is_empty() {
        return Err(SnapshotError::MissingField(BASE_FIELD));
    }
    let last_update_utc = format_unix_utc(raw.last_update_unix)?;

    let mut out = Normalized::default();
    for (code, value) in &raw.rates {
        match coerce_rate(value) {
            Ok(rate) => out.records.push(NormalizedRecord {
                base_currency: raw.base_currency.clone(),
                target_currency: code.clone(),
                rate,
                last_update_utc: last_update_utc.clone(),
            }),
            Err(reason) => out.dropped.push(DroppedRate {
                currency: code.clone(),
                reason,
            }),
        }
    }

    if !out.dropped.is_empty() {
        warn!(
            dropped = out.dropped_count(),
            kept = out.records.len(),
            base = %raw.base_currency,
            "records removed by quality filter (null/non-numeric/<=0)"
        );
    }
    Ok(out)
}

/// Strict adapter + normalize in one step, for payloads read back from disk.
pub fn normalize_payload(payload: &Value) -> Result<Normalized, SnapshotError> {
    normalize(&RawSnapshot::from_payload(payload)?)
}

fn coerce_rate(value: &Value) -> Result<f64, DropReason> {
    let rate = match value {
        Value::Null => return Err(DropReason::Null),
        Value::Number(n) => n.as_f64().ok_or(DropReason::NonNumeric)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| DropReason::NonNumeric)?,
        _ => return Err(DropReason::NonNumeric),
    };
    if !rate.is_finite() {
        Err(DropReason::NonFinite)
    } else if rate <= 0.0 {
        Err(DropReason::NonPositive)
    } else {
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(rates: Value) -> RawSnapshot {
        RawSnapshot::from_payload(&json!({
            "base_code": "USD",
            "time_last_update_unix": 4_102_444_800i64,
            "conversion_rates": rates,
        }))
        .unwrap()
    }

    #[test]
    fn quality_filter_drops_zero_and_negative() {
        let out = normalize(&snapshot(json!({"USD": 1.0, "BRL": 5.0, "EUR": 0.0, "ARS": -2})))
            .unwrap();
        let codes: Vec<_> = out.records.iter().map(|r| r.target_currency.as_str()).collect();
        assert_eq!(codes, vec!["USD", "BRL"]);
        assert_eq!(out.dropped_count(), 2);
        assert!(out.dropped.iter().all(|d| d.reason == DropReason::NonPositive));
    }

    #[test]
    fn null_and_garbage_are_dropped_not_fatal() {
        let out = normalize(&snapshot(json!({
            "JPY": null,
            "GBP": "abc",
            "CHF": [1],
            "MXN": "17.1",
            "CAD": true
        })))
        .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].target_currency, "MXN");
        assert_eq!(out.records[0].rate, 17.1);
        assert_eq!(out.dropped_count(), 4);
    }

    #[test]
    fn non_finite_strings_are_dropped() {
        let out = normalize(&snapshot(json!({"XAU": "inf", "XAG": "NaN"}))).unwrap();
        assert!(out.records.is_empty());
        assert!(out.dropped.iter().all(|d| d.reason != DropReason::NonPositive));
    }

    #[test]
    fn records_carry_base_and_utc_timestamp() {
        let out = normalize(&snapshot(json!({"BRL": 5.0}))).unwrap();
        let rec = &out.records[0];
        assert_eq!(rec.base_currency, "USD");
        assert_eq!(rec.last_update_utc, "2100-01-01 00:00:00");
    }

    #[test]
    fn empty_rates_yield_empty_set() {
        let out = normalize(&snapshot(json!({}))).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.dropped_count(), 0);
    }

    #[test]
    fn payload_without_rates_is_missing_field() {
        let err = normalize_payload(&json!({"base_code": "USD", "time_last_update_unix": 0}))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::MissingField(_)));
    }
}

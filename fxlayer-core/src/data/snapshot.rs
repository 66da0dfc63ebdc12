//! Raw snapshot: the as-fetched rate table for one base currency and one day.
//!
//! The upstream API has shipped two payload shapes: the v6 shape with
//! `conversion_rates` and the older/open shape with `rates`. Both are mapped
//! into one canonical [`RawSnapshot`]. Rate values stay as JSON values here;
//! the normalizer decides which ones are usable.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const BASE_FIELD: &str = "base_code";
pub const TIMESTAMP_FIELD: &str = "time_last_update_unix";

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("raw payload is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("raw payload field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Which upstream schema variant a payload used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadShape {
    /// `{"conversion_rates": {...}}` (v6 latest/history)
    ConversionRates,
    /// `{"rates": {...}}`
    Rates,
}

impl PayloadShape {
    pub fn field(self) -> &'static str {
        match self {
            PayloadShape::ConversionRates => "conversion_rates",
            PayloadShape::Rates => "rates",
        }
    }
}

/// Canonical raw snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub base_currency: String,
    pub rates: Map<String, Value>,
    pub last_update_unix: i64,
    pub shape: PayloadShape,
}

/// Defaults applied when a fetched payload omits optional fields.
#[derive(Debug, Clone, Copy, Default)]
struct Fallback<'a> {
    base: Option<&'a str>,
    day: Option<NaiveDate>,
}

impl RawSnapshot {
    /// Strict adapter: every field must be present in the payload.
    pub fn from_payload(payload: &Value) -> Result<Self, SnapshotError> {
        Self::adapt(payload, Fallback::default())
    }

    /// Adapter for a payload fetched for `base` on `day`.
    ///
    /// A missing base code defaults to the requested base, and a missing
    /// update timestamp is synthesized as midnight UTC of `day`.
    pub fn from_fetch(payload: &Value, base: &str, day: NaiveDate) -> Result<Self, SnapshotError> {
        Self::adapt(
            payload,
            Fallback {
                base: Some(base),
                day: Some(day),
            },
        )
    }

    fn adapt(payload: &Value, fallback: Fallback<'_>) -> Result<Self, SnapshotError> {
        let obj = payload.as_object().ok_or_else(|| SnapshotError::InvalidField {
            field: "payload",
            reason: "not a JSON object".into(),
        })?;

        let (shape, rates) = extract_rates(obj)?;

        let base_currency = match obj.get(BASE_FIELD) {
            Some(Value::String(code)) if !code.trim().is_empty() => code.trim().to_uppercase(),
            Some(Value::Null) | None => fallback
                .base
                .map(str::to_uppercase)
                .ok_or(SnapshotError::MissingField(BASE_FIELD))?,
            Some(other) => {
                return Err(SnapshotError::InvalidField {
                    field: BASE_FIELD,
                    reason: format!("expected a currency code, got {other}"),
                })
            }
        };

        let last_update_unix = match obj.get(TIMESTAMP_FIELD) {
            Some(Value::Null) | None => fallback
                .day
                .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp())
                .ok_or(SnapshotError::MissingField(TIMESTAMP_FIELD))?,
            Some(v) => unix_seconds(v).ok_or_else(|| SnapshotError::InvalidField {
                field: TIMESTAMP_FIELD,
                reason: format!("expected whole seconds, got {v}"),
            })?,
        };

        Ok(Self {
            base_currency,
            rates: rates.clone(),
            last_update_unix,
            shape,
        })
    }
}

/// Integer seconds, or a float with no fractional part (`1700000000.0`).
fn unix_seconds(v: &Value) -> Option<i64> {
    if let Some(secs) = v.as_i64() {
        return Some(secs);
    }
    let secs = v.as_f64()?;
    (secs.is_finite() && secs.fract() == 0.0 && secs.abs() < i64::MAX as f64).then_some(secs as i64)
}

fn extract_rates(obj: &Map<String, Value>) -> Result<(PayloadShape, &Map<String, Value>), SnapshotError> {
    for shape in [PayloadShape::ConversionRates, PayloadShape::Rates] {
        match obj.get(shape.field()) {
            Some(Value::Object(rates)) => return Ok((shape, rates)),
            Some(Value::Null) | None => continue,
            Some(other) => {
                return Err(SnapshotError::InvalidField {
                    field: shape.field(),
                    reason: format!("expected an object, got {other}"),
                })
            }
        }
    }
    Err(SnapshotError::MissingField(PayloadShape::ConversionRates.field()))
}

//! Gold layer: express every silver rate relative to a pivot currency.
//!
//! Silver rates are "units of X per 1 fetch-base unit". For a pivot P with
//! silver rate `p`, one unit of X is worth `p / rate_X` units of P.

use super::normalize::NormalizedRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One gold row: 1 unit of `currency` equals `value_in_pivot` pivot units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebasedRecord {
    pub currency: String,
    pub value_in_pivot: f64,
    pub last_update_utc: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum RebaseError {
    #[error("pivot currency '{pivot}' not found in silver records")]
    PivotNotFound { pivot: String },

    #[error("silver rate for '{currency}' is not a positive number: {rate}")]
    InvalidRate { currency: String, rate: f64 },
}

/// Rebase a silver record set onto `pivot`.
///
/// Returns one record per distinct target currency (first occurrence wins),
/// with the pivot's own entry pinned to exactly `1.0`. Fails without output
/// when the pivot is absent or any rate is unusable.
pub fn rebase(records: &[NormalizedRecord], pivot: &str) -> Result<Vec<RebasedRecord>, RebaseError> {
    let pivot = pivot.trim().to_uppercase();
    let pivot_rate = records
        .iter()
        .find(|r| r.target_currency.eq_ignore_ascii_case(&pivot))
        .map(|r| r.rate)
        .ok_or_else(|| RebaseError::PivotNotFound {
            pivot: pivot.clone(),
        })?;

    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len() + 1);

    for rec in records {
        if !(rec.rate.is_finite() && rec.rate > 0.0) {
            return Err(RebaseError::InvalidRate {
                currency: rec.target_currency.clone(),
                rate: rec.rate,
            });
        }
        if !seen.insert(rec.target_currency.to_uppercase()) {
            continue;
        }

        let value_in_pivot = if rec.target_currency.eq_ignore_ascii_case(&pivot) {
            1.0
        } else {
            pivot_rate / rec.rate
        };
        out.push(RebasedRecord {
            currency: rec.target_currency.clone(),
            value_in_pivot,
            last_update_utc: rec.last_update_utc.clone(),
        });
    }

    if !seen.contains(&pivot) {
        let last_update_utc = out
            .first()
            .map(|r| r.last_update_utc.clone())
            .unwrap_or_default();
        out.push(RebasedRecord {
            currency: pivot,
            value_in_pivot: 1.0,
            last_update_utc,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silver(rows: &[(&str, f64)]) -> Vec<NormalizedRecord> {
        rows.iter()
            .map(|(code, rate)| NormalizedRecord {
                base_currency: "USD".into(),
                target_currency: code.to_string(),
                rate: *rate,
                last_update_utc: "2099-01-01 00:00:00".into(),
            })
            .collect()
    }

    fn value(gold: &[RebasedRecord], code: &str) -> f64 {
        gold.iter().find(|r| r.currency == code).unwrap().value_in_pivot
    }

    #[test]
    fn brl_conversion_math() {
        let gold = rebase(&silver(&[("USD", 1.0), ("BRL", 5.0), ("EUR", 0.5)]), "BRL").unwrap();
        assert_eq!(gold.len(), 3);
        assert!((value(&gold, "USD") - 5.0).abs() < 1e-9);
        assert_eq!(value(&gold, "BRL"), 1.0);
        assert!((value(&gold, "EUR") - 10.0).abs() < 1e-9);
    }

    #[test]
    fn pivot_is_exactly_one_even_with_awkward_rate() {
        let gold = rebase(&silver(&[("USD", 1.0), ("BRL", 0.1 + 0.2)]), "brl").unwrap();
        assert_eq!(value(&gold, "BRL"), 1.0);
    }

    #[test]
    fn missing_pivot_fails() {
        let err = rebase(&silver(&[("USD", 1.0), ("EUR", 0.9)]), "BRL").unwrap_err();
        assert_eq!(
            err,
            RebaseError::PivotNotFound {
                pivot: "BRL".into()
            }
        );
    }

    #[test]
    fn empty_input_fails_with_pivot_not_found() {
        assert!(matches!(
            rebase(&[], "BRL"),
            Err(RebaseError::PivotNotFound { .. })
        ));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let gold = rebase(&silver(&[("BRL", 5.0), ("EUR", 0.5), ("EUR", 0.25)]), "BRL").unwrap();
        assert_eq!(gold.len(), 2);
        assert!((value(&gold, "EUR") - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unusable_rate_fails_whole_set() {
        let err = rebase(&silver(&[("BRL", 5.0), ("EUR", 0.0)]), "BRL").unwrap_err();
        assert!(matches!(err, RebaseError::InvalidRate { .. }));
    }

    #[test]
    fn rerun_is_bit_identical() {
        let input = silver(&[("USD", 1.0), ("BRL", 5.4321), ("JPY", 151.37), ("EUR", 0.9213)]);
        let a = rebase(&input, "BRL").unwrap();
        let b = rebase(&input, "BRL").unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.value_in_pivot.to_bits(), y.value_in_pivot.to_bits());
        }
    }
}
